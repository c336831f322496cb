//! Device registry: discovery, inbound routing and lifecycle.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::device::Device;
use crate::errors::Error;
use crate::events::{Event, EventBus, Events};
use crate::message::{Command, Inbound, ScanData, StatusReport};
use crate::runtime::{self, AsyncUdpSocket, TaskGuard, UdpSocket};
use crate::transport::{self, Transport};

type Result<T> = std::result::Result<T, Error>;

const RECEIVE_BUFFER_SIZE: usize = 4096;
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Registry configuration.
///
/// Durations are (de)serialized as integer milliseconds, and missing fields
/// take their default value.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use govee_lan_rs::RegistryOptions;
///
/// let options: RegistryOptions =
///     serde_json::from_str(r#"{"discover_interval": 10000, "auto_update": false}"#).unwrap();
/// assert_eq!(options.discover_interval, Duration::from_secs(10));
/// assert!(!options.auto_update);
/// assert!(options.discover);
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// Interface to listen on; all interfaces when unset.
    pub listen_to: Option<Ipv4Addr>,
    /// Run periodic discovery once started.
    pub discover: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub discover_interval: Duration,
    /// Start the status heartbeat on every new device.
    pub auto_update: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub update_interval: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        RegistryOptions {
            listen_to: None,
            discover: true,
            discover_interval: Duration::from_millis(300_000),
            auto_update: true,
            update_interval: Duration::from_millis(60_000),
        }
    }
}

struct RegistryInner {
    options: RegistryOptions,
    devices: Mutex<HashMap<String, Device>>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    events: Arc<EventBus>,
    ready: AtomicBool,
    destroyed: AtomicBool,
    discovery: Mutex<Option<TaskGuard>>,
    listener: Mutex<Option<TaskGuard>>,
}

/// The set of Govee devices known on the LAN.
///
/// Owns every [`Device`] record, runs periodic multicast discovery and
/// routes inbound datagrams: scan replies by device identity, status replies
/// by sender address. Clones share the same registry.
///
/// # Example
///
/// ```no_run
/// use govee_lan_rs::{Registry, RegistryOptions};
///
/// # async fn run() -> Result<(), govee_lan_rs::Error> {
/// let registry = Registry::new(RegistryOptions::default());
/// registry.start().await?;
///
/// let device = registry.get_device(None).await?;
/// device.turn_on().await?;
/// device.set_color("orange", Some(80)).await?;
///
/// registry.destroy();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryOptions::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.inner.options)
            .field("ready", &self.is_ready())
            .field("devices", &self.lock_devices().len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    /// Create a registry. Nothing touches the network until [`Registry::start`].
    pub fn new(options: RegistryOptions) -> Self {
        Registry {
            inner: Arc::new(RegistryInner {
                options,
                devices: Mutex::new(HashMap::new()),
                transport: Mutex::new(None),
                events: EventBus::new(),
                ready: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
                discovery: Mutex::new(None),
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.inner.options
    }

    fn lock_devices(&self) -> MutexGuard<'_, HashMap<String, Device>> {
        lock(&self.inner.devices)
    }

    /// Bind the reply socket, start listening and start discovery.
    ///
    /// Fails when the socket cannot be bound; the registry then never
    /// becomes ready.
    pub async fn start(&self) -> Result<()> {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        let socket = match transport::bind_listener(self.inner.options.listen_to).await {
            Ok(socket) => Arc::new(socket),
            Err(err) => {
                error!("failed to start: {err}");
                return Err(err);
            }
        };

        let listener = TaskGuard::spawn(listen(Arc::downgrade(&self.inner), Arc::clone(&socket)));
        *lock(&self.inner.listener) = Some(listener);

        self.start_with_transport(socket)
    }

    /// Mark the registry ready using an already set up transport.
    ///
    /// For hosts that own the socket: inbound datagrams must then be fed to
    /// [`Registry::handle_datagram`].
    pub fn start_with_transport(&self, transport: Arc<dyn Transport>) -> Result<()> {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        *lock(&self.inner.transport) = Some(transport);
        self.inner.ready.store(true, Ordering::SeqCst);
        info!("registry ready");
        self.inner.events.emit(Event::Ready);

        if self.inner.options.discover {
            self.start_discovery()?;
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        lock(&self.inner.transport).clone().ok_or(Error::NotReady)
    }

    /// Subscribe to registry and device events.
    pub fn subscribe(&self) -> Events {
        self.inner.events.subscribe()
    }

    /// All known devices, in no particular order.
    pub fn devices(&self) -> Vec<Device> {
        self.lock_devices().values().cloned().collect()
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.lock_devices().get(id).cloned()
    }

    /// Multicast a single scan request, waiting for the registry to be
    /// started first.
    pub async fn discover(&self) -> Result<()> {
        self.wait_for_ready().await?;
        let transport = self.transport()?;
        let bytes = Command::scan().encode()?;
        let addr = transport::discovery_addr();
        debug!("sending scan request to {addr}");
        transport
            .send_datagram(&bytes, addr)
            .await
            .map_err(|e| Error::socket("send", e))?;
        Ok(())
    }

    /// Scan now and then on every discovery interval.
    ///
    /// Before [`Registry::start`] the first scan waits for the registry to be
    /// ready. Does nothing if discovery is already running.
    pub fn start_discovery(&self) -> Result<()> {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        let mut discovery = lock(&self.inner.discovery);
        if discovery.is_some() {
            return Ok(());
        }

        let inner = Arc::downgrade(&self.inner);
        *discovery = Some(runtime::every(
            self.inner.options.discover_interval,
            move || {
                let inner = inner.clone();
                async move {
                    let Some(inner) = inner.upgrade() else {
                        return false;
                    };
                    let registry = Registry { inner };
                    if let Err(err) = registry.discover().await {
                        warn!("scan request failed: {err}");
                        registry.inner.events.error(err);
                    }
                    true
                }
            },
        ));
        debug!(
            "discovery started, every {:?}",
            self.inner.options.discover_interval
        );
        Ok(())
    }

    pub fn stop_discovery(&self) {
        if lock(&self.inner.discovery).take().is_some() {
            debug!("discovery stopped");
        }
    }

    pub fn is_discovering(&self) -> bool {
        lock(&self.inner.discovery).is_some()
    }

    /// Wait until the registry is started.
    ///
    /// Fails with [`Error::Destroyed`] once the registry is destroyed.
    pub async fn wait_for_ready(&self) -> Result<()> {
        let mut events = self.subscribe();
        if self.is_ready() {
            return Ok(());
        }
        while let Some(event) = events.next().await {
            if matches!(event, Event::Ready) {
                return Ok(());
            }
        }
        Err(Error::Destroyed)
    }

    /// Wait until at least one device is known.
    pub async fn wait_for_devices(&self) -> Result<()> {
        self.get_device(None).await.map(|_| ())
    }

    /// Get a device, waiting for it to be discovered if needed.
    ///
    /// With `None`, any known device is returned. There is no built-in
    /// timeout; see [`Registry::get_device_timeout`].
    pub async fn get_device(&self, id: Option<&str>) -> Result<Device> {
        let mut events = self.subscribe();
        let known = match id {
            Some(id) => self.device(id),
            None => self.lock_devices().values().next().cloned(),
        };
        if let Some(device) = known {
            return Ok(device);
        }

        while let Some(event) = events.next().await {
            if let Event::DeviceDiscovered(device) = event {
                if id.is_none_or(|id| id == device.id()) {
                    return Ok(device);
                }
            }
        }
        Err(Error::Destroyed)
    }

    /// Like [`Registry::get_device`], failing with [`Error::DeviceNotFound`]
    /// when the device does not appear within `budget`.
    pub async fn get_device_timeout(&self, id: Option<&str>, budget: Duration) -> Result<Device> {
        runtime::timeout(budget, self.get_device(id))
            .await
            .map_err(|_| Error::DeviceNotFound(id.unwrap_or("any").to_string()))?
    }

    /// Route an inbound datagram from `addr`.
    ///
    /// Called by the listener started with [`Registry::start`]; hosts using
    /// [`Registry::start_with_transport`] call it themselves.
    pub fn handle_datagram(&self, bytes: &[u8], addr: SocketAddr) {
        match Inbound::decode(bytes) {
            Ok(Inbound::Scan(scan)) => self.handle_scan(scan),
            Ok(Inbound::Status(status)) => self.handle_status(status, addr),
            Ok(Inbound::Unknown(raw)) => {
                debug!("unknown message from {addr}: {raw}");
                self.inner.events.emit(Event::UnknownMessage { addr, raw });
            }
            Err(err) => {
                debug!("undecodable message from {addr}: {err}");
                self.inner.events.emit(Event::UnknownMessage {
                    addr,
                    raw: String::from_utf8_lossy(bytes).into_owned(),
                });
            }
        }
    }

    fn handle_scan(&self, scan: ScanData) {
        let event = {
            let mut devices = self.lock_devices();
            match devices.get(&scan.device) {
                Some(device) => device.update_from_scan(&scan).map(|old| {
                    info!("device {} moved from {old} to {}", scan.device, scan.ip);
                    Event::DeviceAddressChanged {
                        id: scan.device.clone(),
                        old,
                        new: scan.ip,
                    }
                }),
                None => {
                    let Ok(transport) = self.transport() else {
                        debug!("ignoring scan reply from {}: not started", scan.device);
                        return;
                    };
                    let device = Device::new(
                        &scan,
                        transport,
                        Arc::clone(&self.inner.events),
                        self.inner.options.update_interval,
                    );
                    info!(
                        "discovered {} ({}, {}) at {}",
                        device.id(),
                        device.model(),
                        device.name(),
                        scan.ip
                    );
                    devices.insert(scan.device.clone(), device.clone());
                    Some(Event::DeviceDiscovered(device))
                }
            }
        };

        if let Some(event) = event {
            if let Event::DeviceDiscovered(device) = &event {
                if self.inner.options.auto_update {
                    device.set_auto_update(true);
                }
            }
            self.inner.events.emit(event);
        }
        self.inner.events.emit(Event::ScanObserved(scan));
    }

    fn handle_status(&self, status: StatusReport, addr: SocketAddr) {
        let device = match addr {
            SocketAddr::V4(v4) => self
                .lock_devices()
                .values()
                .find(|device| device.ip() == *v4.ip())
                .cloned(),
            SocketAddr::V6(_) => None,
        };

        match device {
            Some(device) => device.apply_status(&status),
            None => {
                warn!("status reply from unknown device at {addr}");
                self.inner
                    .events
                    .emit(Event::UnknownDevice { addr, status });
            }
        }
    }

    /// Stop discovery, destroy every device, release the transport and end
    /// every event stream.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_discovery();
        let devices: Vec<Device> = self.lock_devices().drain().map(|(_, d)| d).collect();
        for device in &devices {
            device.destroy();
        }
        lock(&self.inner.listener).take();
        lock(&self.inner.transport).take();
        self.inner.ready.store(false, Ordering::SeqCst);

        info!("registry destroyed");
        self.inner.events.close(Event::Destroyed);
    }
}

/// Receive loop; ends when the registry is dropped.
async fn listen(inner: Weak<RegistryInner>, socket: Arc<UdpSocket>) {
    let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
    loop {
        let received = socket.recv_from(&mut buffer).await;
        let failed = {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let registry = Registry { inner };
            match received {
                Ok((size, addr)) => {
                    registry.handle_datagram(&buffer[..size], addr);
                    false
                }
                Err(err) => {
                    error!("receive failed: {err}");
                    registry.inner.events.error(Error::socket("receive", err));
                    true
                }
            }
        };
        if failed {
            runtime::sleep(RECEIVE_ERROR_BACKOFF).await;
        }
    }
}
