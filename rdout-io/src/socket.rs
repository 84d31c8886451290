//! UDP socket wrapper for RDoUT
//!
//! Provides a blocking UDP transport with a per-call receive timeout.

use crate::transport::Transport;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Shortest receive timeout handed to the OS (a zero timeout means "block forever")
const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

/// Transport errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid socket address")]
    InvalidAddress,

    #[error("Transport is closed")]
    Closed,

    #[error("Destination {0} is unreachable")]
    Unreachable(SocketAddr),
}

/// UDP transport
///
/// Wraps a blocking UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    inner: Socket,
}

impl UdpTransport {
    /// Create a new UDP transport bound to the given address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;

        Ok(UdpTransport { inner: socket })
    }
}

impl Transport for UdpTransport {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.inner.send_to(buf, &target.into())?)
    }

    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        self.inner
            .set_read_timeout(Some(timeout.max(MIN_RECV_TIMEOUT)))?;

        // socket2 reads into MaybeUninit; an initialised buffer is a valid one
        let uninit_buf = unsafe {
            std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len())
        };

        match self.inner.recv_from(uninit_buf) {
            Ok((n, addr)) => Ok(Some((n, addr.as_socket().ok_or(SocketError::InvalidAddress)?))),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.inner
            .local_addr()?
            .as_socket()
            .ok_or(SocketError::InvalidAddress)
    }
}
