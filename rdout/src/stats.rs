//! Session statistics

use std::time::Duration;

/// Sender-side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Payloads in the session
    pub packets_total: u64,
    /// First transmissions
    pub packets_sent: u64,
    /// Go-back-N retransmissions
    pub packets_retransmitted: u64,
    /// Retransmission timer expiries that resent the window
    pub timeouts: u64,
    /// Acks that advanced the window
    pub acks_accepted: u64,
    /// Valid acks below the window or for unsent packets
    pub acks_ignored: u64,
    /// Datagrams discarded as malformed, corrupt or not an ack
    pub datagrams_discarded: u64,
    /// Payload bytes in the session
    pub bytes_total: u64,
}

/// Outcome of a completed [`crate::Sender::send_all`]
#[derive(Debug, Clone, Default)]
pub struct SendReport {
    /// Counters at the end of the session
    pub stats: SenderStats,
    /// Time from the first admission to the last ack
    pub elapsed: Duration,
}

/// Receiver-side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Payloads handed to the application
    pub packets_delivered: u64,
    /// Payload bytes handed to the application
    pub bytes_delivered: u64,
    /// Valid data packets rejected as duplicate or early
    pub out_of_order: u64,
    /// Datagrams discarded as malformed or corrupt
    pub datagrams_discarded: u64,
    /// Acks handed to the channel
    pub acks_sent: u64,
}
