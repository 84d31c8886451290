//! In-process datagram network
//!
//! [`MemoryNetwork`] routes datagrams between [`MemoryTransport`] endpoints
//! through `crossbeam` channels. It never loses, corrupts or reorders
//! anything by itself, which makes the fault-injecting channel the only
//! source of faults in tests.

use crate::socket::SocketError;
use crate::transport::Transport;
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

type Datagram = (Bytes, SocketAddr);

/// A set of connected in-memory endpoints
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    routes: Arc<RwLock<HashMap<SocketAddr, Sender<Datagram>>>>,
}

impl MemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        MemoryNetwork::default()
    }

    /// Attach an endpoint at `addr`
    pub fn bind(&self, addr: SocketAddr) -> Result<MemoryTransport, SocketError> {
        let mut routes = self.routes.write();
        if routes.contains_key(&addr) {
            return Err(SocketError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("{} already bound", addr),
            )));
        }

        let (tx, rx) = channel::unbounded();
        routes.insert(addr, tx);

        Ok(MemoryTransport {
            addr,
            inbox: rx,
            network: self.clone(),
        })
    }

    /// Attach an endpoint at `127.0.0.1:port`
    pub fn bind_port(&self, port: u16) -> Result<MemoryTransport, SocketError> {
        self.bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
    }

    fn route(&self, target: SocketAddr) -> Option<Sender<Datagram>> {
        self.routes.read().get(&target).cloned()
    }
}

/// An endpoint of a [`MemoryNetwork`]
#[derive(Debug)]
pub struct MemoryTransport {
    addr: SocketAddr,
    inbox: Receiver<Datagram>,
    network: MemoryNetwork,
}

impl MemoryTransport {
    /// Detach from the network; later sends to this address fail
    pub fn close(&self) {
        self.network.routes.write().remove(&self.addr);
    }

    /// `true` while other endpoints can reach this one
    pub fn is_open(&self) -> bool {
        self.network.routes.read().contains_key(&self.addr)
    }
}

impl Transport for MemoryTransport {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        if !self.is_open() {
            return Err(SocketError::Closed);
        }
        let route = self
            .network
            .route(target)
            .ok_or(SocketError::Unreachable(target))?;

        route
            .send((Bytes::copy_from_slice(buf), self.addr))
            .map_err(|_| SocketError::Unreachable(target))?;
        Ok(buf.len())
    }

    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        match self.inbox.recv_timeout(timeout) {
            Ok((datagram, from)) => {
                // Like UDP, excess bytes of an oversized datagram are lost
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(Some((n, from)))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SocketError::Closed),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.addr)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}
