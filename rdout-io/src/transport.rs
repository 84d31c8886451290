//! Datagram transport abstraction
//!
//! The ARQ core needs exactly two operations from the network: send a
//! datagram to an address, and wait a bounded time for the next datagram.

use crate::socket::SocketError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Unreliable datagram transport
///
/// Implementations must be usable from several threads at once: the data
/// path, the ack path and delayed deliveries share one handle.
pub trait Transport: Send + Sync + 'static {
    /// Send one datagram to `target`
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError>;

    /// Wait up to `timeout` for one datagram
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError>;

    /// Address this transport receives on
    fn local_addr(&self) -> Result<SocketAddr, SocketError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        (**self).send_to(buf, target)
    }

    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        (**self).recv_timeout(buf, timeout)
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        (**self).local_addr()
    }
}
