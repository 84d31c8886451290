//! RDoUT - Reliable Delivery over Unreliable Transport
//!
//! High-level API: a go-back-N [`Sender`] and an in-order [`Receiver`] that
//! run over any [`io::Transport`], with faults injected by
//! [`io::FaultyChannel`].
//!
//! ```no_run
//! use rdout::{ArqConfig, FaultConfig, Sender, UdpTransport};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), rdout::ArqError> {
//! let transport = Arc::new(UdpTransport::bind("127.0.0.1:0".parse().unwrap())?);
//! let sender = Sender::new(
//!     transport,
//!     "127.0.0.1:8888".parse().unwrap(),
//!     ArqConfig::default(),
//!     FaultConfig::lossy(),
//! )?;
//! let report = sender.send_all(["Hello", "UDP"])?;
//! println!("{} retransmissions", report.stats.packets_retransmitted);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod receiver;
pub mod sender;
pub mod stats;

pub use rdout_io as io;
pub use rdout_protocol as protocol;

pub use error::{ArqError, Result};
pub use receiver::{Delivery, Receiver};
pub use sender::Sender;
pub use stats::{ReceiverStats, SendReport, SenderStats};

// Re-export commonly used types
pub use io::{FaultConfig, MemoryNetwork, MemoryTransport, Transport, UdpTransport};
pub use protocol::{ArqConfig, Packet, SeqNumber};
