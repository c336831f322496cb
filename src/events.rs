//! Notifications emitted by the registry and its devices.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::device::Device;
use crate::errors::Error;
use crate::message::{ScanData, StatusReport};
use crate::status::DeviceState;

/// Stream of [`Event`]s returned by [`crate::Registry::subscribe`].
///
/// The stream ends after [`Event::Destroyed`].
pub type Events = UnboundedReceiver<Event>;

/// Something that happened on the network or to a device record.
#[derive(Debug, Clone)]
pub enum Event {
    /// The transport is bound and listening.
    Ready,
    /// A scan reply introduced a previously unseen device.
    DeviceDiscovered(Device),
    /// A known device answered a scan from a new address.
    DeviceAddressChanged {
        id: String,
        old: Ipv4Addr,
        new: Ipv4Addr,
    },
    /// Any scan reply, for new and known devices alike.
    ScanObserved(ScanData),
    /// A status reply changed at least one field (or was the first one).
    DeviceStateChanged { id: String, state: DeviceState },
    /// A status reply was applied, whether or not anything changed.
    DeviceGotUpdate { id: String },
    /// A status reply came from an address no device is known at.
    UnknownDevice {
        addr: SocketAddr,
        status: StatusReport,
    },
    /// A datagram could not be decoded or had an unrecognized shape.
    UnknownMessage { addr: SocketAddr, raw: String },
    /// An asynchronous failure (receive error, heartbeat send failure, ...).
    Error(Arc<Error>),
    /// The registry was torn down.
    Destroyed,
}

impl Event {
    /// The device identity this event is about, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Event::DeviceDiscovered(device) => Some(device.id()),
            Event::DeviceAddressChanged { id, .. }
            | Event::DeviceStateChanged { id, .. }
            | Event::DeviceGotUpdate { id } => Some(id),
            Event::ScanObserved(scan) => Some(&scan.device),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Subscribers {
    senders: Vec<UnboundedSender<Event>>,
    closed: bool,
}

/// Fan-out of events to any number of subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Subscribers>,
}

impl EventBus {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        // Senders stay consistent even if a holder panicked
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> Events {
        let (tx, rx) = unbounded();
        let mut subscribers = self.lock();
        if !subscribers.closed {
            subscribers.senders.push(tx);
        }
        rx
    }

    pub(crate) fn emit(&self, event: Event) {
        let mut subscribers = self.lock();
        subscribers
            .senders
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    /// Emit a final event and end every stream.
    pub(crate) fn close(&self, last: Event) {
        let mut subscribers = self.lock();
        for tx in subscribers.senders.drain(..) {
            let _ = tx.unbounded_send(last.clone());
        }
        subscribers.closed = true;
    }

    pub(crate) fn error(&self, err: Error) {
        self.emit(Event::Error(Arc::new(err)));
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }
}
