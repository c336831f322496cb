//! UDP transport shared by the registry and every device.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use log::debug;

use crate::errors::Error;
use crate::runtime::{AsyncUdpSocket, BoxFuture, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// Multicast group devices listen on for scan requests.
pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
/// Port devices receive commands on.
pub const COMMAND_PORT: u16 = 4001;
/// Port devices send scan and status replies to.
pub const LISTEN_PORT: u16 = 4002;
pub const MULTICAST_TTL: u32 = 128;

/// Address commands for the device at `ip` are sent to.
pub fn command_addr(ip: Ipv4Addr) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(ip, COMMAND_PORT))
}

/// Address scan requests are multicast to.
pub fn discovery_addr() -> SocketAddr {
    command_addr(MULTICAST_ADDR)
}

/// Send side of the transport.
///
/// Delivery is best effort: a successful send only means the datagram was
/// handed to the network stack.
pub trait Transport: Send + Sync {
    fn send_datagram<'a>(&'a self, buf: &'a [u8], addr: SocketAddr)
    -> BoxFuture<'a, io::Result<usize>>;
}

impl Transport for UdpSocket {
    fn send_datagram<'a>(
        &'a self,
        buf: &'a [u8],
        addr: SocketAddr,
    ) -> BoxFuture<'a, io::Result<usize>> {
        Box::pin(AsyncUdpSocket::send_to(self, buf, addr))
    }
}

/// Bind the reply socket on `listen_to` (all interfaces when `None`) and join
/// the discovery multicast group.
pub async fn bind_listener(listen_to: Option<Ipv4Addr>) -> Result<UdpSocket> {
    let interface = listen_to.unwrap_or(Ipv4Addr::UNSPECIFIED);
    let addr = SocketAddr::V4(SocketAddrV4::new(interface, LISTEN_PORT));

    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|e| Error::socket("bind", e))?;
    socket
        .set_broadcast(true)
        .map_err(|e| Error::socket("set_broadcast", e))?;
    socket
        .set_multicast_ttl_v4(MULTICAST_TTL)
        .map_err(|e| Error::socket("set_multicast_ttl", e))?;
    socket
        .join_multicast_v4(MULTICAST_ADDR, interface)
        .map_err(|e| Error::socket("join_multicast", e))?;

    debug!("listening for device replies on {addr}");
    Ok(socket)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transports for tests.

    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use super::*;

    /// Swallows every datagram and remembers where it was sent.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    }

    impl RecordingTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn sent(&self) -> Vec<(SocketAddr, Value)> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(addr, bytes)| (*addr, serde_json::from_slice(bytes).unwrap()))
                .collect()
        }

        /// Commands sent so far, as `(address, cmd name)` pairs.
        pub(crate) fn commands(&self) -> Vec<(SocketAddr, String)> {
            self.sent()
                .into_iter()
                .map(|(addr, msg)| (addr, msg["msg"]["cmd"].as_str().unwrap().to_string()))
                .collect()
        }

        pub(crate) fn count(&self, cmd: &str) -> usize {
            self.commands().iter().filter(|(_, c)| c == cmd).count()
        }
    }

    impl Transport for RecordingTransport {
        fn send_datagram<'a>(
            &'a self,
            buf: &'a [u8],
            addr: SocketAddr,
        ) -> BoxFuture<'a, io::Result<usize>> {
            self.sent.lock().unwrap().push((addr, buf.to_vec()));
            Box::pin(async move { Ok(buf.len()) })
        }
    }

    /// Fails every send.
    pub(crate) struct FailingTransport;

    impl Transport for FailingTransport {
        fn send_datagram<'a>(
            &'a self,
            _buf: &'a [u8],
            _addr: SocketAddr,
        ) -> BoxFuture<'a, io::Result<usize>> {
            Box::pin(async {
                Err(io::Error::new(
                    io::ErrorKind::NetworkUnreachable,
                    "network unreachable",
                ))
            })
        }
    }
}
