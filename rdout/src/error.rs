//! ARQ session errors

use rdout_io::SocketError;
use rdout_protocol::{ConfigError, PacketError, SeqNumber};
use thiserror::Error;

/// Errors surfaced by [`crate::Sender`] and [`crate::Receiver`]
///
/// Lost, corrupt and out-of-order datagrams are never errors; they are
/// repaired by retransmission.
#[derive(Error, Debug)]
pub enum ArqError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Gave up after {timeouts} timeouts with packet {base} unacknowledged")]
    RetriesExhausted { base: SeqNumber, timeouts: u32 },
}

pub type Result<T> = std::result::Result<T, ArqError>;
