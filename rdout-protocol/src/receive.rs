//! Receive-side in-order acceptance
//!
//! The receiver only ever accepts the packet it expects next. Everything else
//! that is intact is answered with a repeat of the last cumulative ack, which
//! is what drives the sender's go-back-N retransmission.

use crate::packet::Packet;
use crate::sequence::SeqNumber;

/// What to do with a received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveDecision {
    /// In-order data: hand the payload to the application, then ack `ack`
    Deliver { ack: SeqNumber },
    /// Out-of-order or duplicate data: do not deliver, re-ack `ack`
    Reject { ack: SeqNumber },
    /// Corrupt, or not a data packet: drop without acknowledging
    Discard,
}

impl ReceiveDecision {
    /// Acknowledgment to send, if any
    pub fn ack(&self) -> Option<SeqNumber> {
        match self {
            ReceiveDecision::Deliver { ack } | ReceiveDecision::Reject { ack } => Some(*ack),
            ReceiveDecision::Discard => None,
        }
    }
}

/// In-order receive state
///
/// `expected_seq` starts at 0 and never decreases. It is not reset between
/// sender sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveState {
    expected_seq: SeqNumber,
}

impl ReceiveState {
    /// Create a receiver expecting sequence number 0
    pub fn new() -> Self {
        ReceiveState::default()
    }

    /// Next sequence number that will be accepted
    #[inline]
    pub fn expected_seq(&self) -> SeqNumber {
        self.expected_seq
    }

    /// Last sequence number accepted (the sentinel when nothing was)
    #[inline]
    pub fn last_accepted(&self) -> SeqNumber {
        self.expected_seq.prev()
    }

    /// Decide what to do with a decoded packet and update the state
    pub fn on_packet(&mut self, packet: &Packet) -> ReceiveDecision {
        if !packet.is_valid() || packet.is_ack() {
            return ReceiveDecision::Discard;
        }

        if packet.seq_number() == self.expected_seq {
            let ack = self.expected_seq;
            self.expected_seq = self.expected_seq.next();
            ReceiveDecision::Deliver { ack }
        } else {
            ReceiveDecision::Reject {
                ack: self.last_accepted(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn data(seq: i32) -> Packet {
        Packet::data(SeqNumber::new(seq), Bytes::from(format!("Packet_{}", seq)))
    }

    #[test]
    fn test_in_order_delivery() {
        let mut state = ReceiveState::new();
        for seq in 0..3 {
            assert_eq!(
                state.on_packet(&data(seq)),
                ReceiveDecision::Deliver {
                    ack: SeqNumber::new(seq)
                }
            );
        }
        assert_eq!(state.expected_seq(), SeqNumber::new(3));
    }

    #[test]
    fn test_out_of_order_before_anything_acks_sentinel() {
        let mut state = ReceiveState::new();
        let decision = state.on_packet(&data(2));

        assert_eq!(decision, ReceiveDecision::Reject { ack: SeqNumber::NONE });
        assert_eq!(decision.ack().map(SeqNumber::as_raw), Some(-1));
        assert_eq!(state.expected_seq(), SeqNumber::ZERO);
    }

    #[test]
    fn test_duplicate_reacks_last_accepted() {
        let mut state = ReceiveState::new();
        for seq in 0..4 {
            state.on_packet(&data(seq));
        }

        assert_eq!(
            state.on_packet(&data(1)),
            ReceiveDecision::Reject {
                ack: SeqNumber::new(3)
            }
        );
        assert_eq!(state.expected_seq(), SeqNumber::new(4));
    }

    #[test]
    fn test_future_packet_reacks_last_accepted() {
        let mut state = ReceiveState::new();
        state.on_packet(&data(0));
        state.on_packet(&data(1));

        assert_eq!(
            state.on_packet(&data(3)),
            ReceiveDecision::Reject {
                ack: SeqNumber::new(1)
            }
        );
    }

    #[test]
    fn test_corrupt_packet_discarded() {
        let mut state = ReceiveState::new();
        let mut packet = data(0);
        packet.header.checksum ^= 1;

        assert_eq!(state.on_packet(&packet), ReceiveDecision::Discard);
        assert_eq!(ReceiveDecision::Discard.ack(), None);
        assert_eq!(state.expected_seq(), SeqNumber::ZERO);
    }

    #[test]
    fn test_ack_packet_discarded() {
        let mut state = ReceiveState::new();
        assert_eq!(
            state.on_packet(&Packet::ack(SeqNumber::ZERO)),
            ReceiveDecision::Discard
        );
        assert_eq!(state.expected_seq(), SeqNumber::ZERO);
    }
}
