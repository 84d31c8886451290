//! RDoUT Protocol Core Implementation
//!
//! This crate implements the pure parts of the Reliable-Delivery-over-
//! Unreliable-Transport protocol: sequence numbers, the packet codec with its
//! CRC-32 integrity check, the go-back-N send window, in-order receive state,
//! and protocol configuration. It performs no I/O.

pub mod config;
pub mod packet;
pub mod receive;
pub mod sequence;
pub mod window;

pub use config::{ArqConfig, ConfigError};
pub use packet::{
    checksum, decode, encode, max_payload_size, Packet, PacketError, PacketHeader, HEADER_SIZE,
};
pub use receive::{ReceiveDecision, ReceiveState};
pub use sequence::SeqNumber;
pub use window::{AckOutcome, Admission, SendWindow};
