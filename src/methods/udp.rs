//! Definition of the UDP method

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::{encode_record, Method, MethodError, WriteResult};
use crate::panel::PanelState;

/// UDP session data
#[derive(Debug)]
enum Session {
    Initialized,
    Bound {
        /// Address of the control loop
        remote_addr: SocketAddr,
        /// Socket the records are sent from
        socket: UdpSocket,
    },
}

/// Pick the address to send to, IPv4 first since the control loop listens on IPv4 only
fn preferred_address(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let mut fallback = None;

    for addr in addrs {
        if addr.is_ipv4() {
            return Some(addr);
        }

        fallback = fallback.or(Some(addr));
    }

    fallback
}

impl Session {
    /// Resolve the remote address and bind an UDP socket
    async fn resolve(address: &str) -> Result<(SocketAddr, UdpSocket), MethodError> {
        let remote_addr = preferred_address(tokio::net::lookup_host(address).await?)
            .ok_or_else(|| MethodError::Unresolved {
                address: address.to_owned(),
            })?;

        // Choose correct IP version for local addr
        let local_addr: SocketAddr = if remote_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local_addr).await?;
        debug!(%remote_addr, local_addr = ?socket.local_addr().ok(), "udp session bound");

        Ok((remote_addr, socket))
    }
}

/// Sends every panel state as one datagram
pub struct Udp {
    /// `host:port` of the control loop
    address: String,
    session: Session,
    buffer: Vec<u8>,
}

impl Udp {
    /// Create a new UDP method
    ///
    /// The address is only resolved on the first write, so the control loop doesn't have to be
    /// up when the daemon starts.
    pub fn new(address: String) -> Self {
        Self {
            address,
            session: Session::Initialized,
            buffer: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Method for Udp {
    async fn write(&mut self, state: &PanelState) -> WriteResult {
        encode_record(state, &mut self.buffer)?;

        // The session stays uninitialized unless the send succeeds
        let (remote_addr, socket) =
            match std::mem::replace(&mut self.session, Session::Initialized) {
                Session::Bound {
                    remote_addr,
                    socket,
                } => (remote_addr, socket),
                Session::Initialized => Session::resolve(&self.address).await?,
            };

        let written = socket.send_to(&self.buffer, remote_addr).await?;
        self.session = Session::Bound {
            remote_addr,
            socket,
        };

        if written == self.buffer.len() {
            Ok(())
        } else {
            Err(MethodError::ShortWrite {
                written,
                expected: self.buffer.len(),
            })
        }
    }
}
