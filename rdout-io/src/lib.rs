//! RDoUT I/O and Platform Abstraction
//!
//! This crate provides the datagram plumbing under the ARQ core: the
//! [`Transport`] boundary with UDP and in-memory implementations, the
//! fault-injecting channel that models a lossy link, and cancellable
//! retransmission timers.

pub mod channel;
pub mod memory;
pub mod socket;
pub mod timer;
pub mod transport;

pub use channel::{ChannelStats, FaultConfig, FaultyChannel};
pub use memory::{MemoryNetwork, MemoryTransport};
pub use socket::{SocketError, UdpTransport};
pub use timer::TimerHandle;
pub use transport::Transport;
