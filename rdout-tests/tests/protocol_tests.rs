//! Protocol-level tests
//!
//! Codec, receive state and send window working together without any I/O.

use bytes::Bytes;
use rdout_protocol::{
    decode, encode, AckOutcome, ArqConfig, ConfigError, Packet, PacketError, ReceiveDecision,
    ReceiveState, SendWindow, SeqNumber, HEADER_SIZE,
};
use std::time::Duration;

fn data(seq: i32) -> Bytes {
    encode(SeqNumber::new(seq), false, format!("Packet_{}", seq).as_bytes())
}

/// Feed wire bytes to the receive state the way the receiver does
fn receive(state: &mut ReceiveState, wire: &[u8]) -> Option<SeqNumber> {
    let packet = decode(wire).ok()?;
    state.on_packet(&packet).ack()
}

#[test]
fn test_hello_wire_layout() {
    let wire = encode(SeqNumber::ZERO, false, b"Hello");
    assert_eq!(wire.len(), HEADER_SIZE + 5);
    assert_eq!(&wire[0..4], &[0, 0, 0, 0]);
    assert_eq!(wire[8], 0);
    assert_eq!(&wire[HEADER_SIZE..], b"Hello");

    let packet = decode(&wire).unwrap();
    assert!(packet.is_valid());
    assert_eq!(packet.payload, Bytes::from_static(b"Hello"));
}

#[test]
fn test_sentinel_ack_encodes_as_all_ones() {
    let wire = encode(SeqNumber::NONE, true, &[]);
    assert_eq!(wire.len(), HEADER_SIZE);
    assert_eq!(&wire[0..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(wire[8], 1);

    let packet = decode(&wire).unwrap();
    assert!(packet.is_ack());
    assert!(packet.is_valid());
    assert!(packet.seq_number().is_none());
}

#[test]
fn test_eight_byte_datagram_is_malformed() {
    assert_eq!(
        decode(&[0u8; 8]),
        Err(PacketError::InsufficientData {
            expected: HEADER_SIZE,
            actual: 8
        })
    );
}

#[test]
fn test_zeroed_last_byte_invalidates_packet() {
    let mut wire = encode(SeqNumber::new(3), false, b"Hello").to_vec();
    *wire.last_mut().unwrap() = 0;
    assert!(!decode(&wire).unwrap().is_valid());
}

#[test]
fn test_receiver_ack_sequence_with_gap() {
    let mut state = ReceiveState::new();

    assert_eq!(receive(&mut state, &data(0)), Some(SeqNumber::new(0)));
    assert_eq!(receive(&mut state, &data(1)), Some(SeqNumber::new(1)));
    // 2 lost: 3 and 4 are rejected with the last in-order ack
    assert_eq!(receive(&mut state, &data(3)), Some(SeqNumber::new(1)));
    assert_eq!(receive(&mut state, &data(4)), Some(SeqNumber::new(1)));
    // Go-back-N resend
    assert_eq!(receive(&mut state, &data(2)), Some(SeqNumber::new(2)));
    assert_eq!(receive(&mut state, &data(3)), Some(SeqNumber::new(3)));
    assert_eq!(state.expected_seq(), SeqNumber::new(4));
}

#[test]
fn test_receiver_ignores_corrupt_and_ack_packets() {
    let mut state = ReceiveState::new();

    let mut corrupt = data(0).to_vec();
    *corrupt.last_mut().unwrap() = 0;
    assert_eq!(receive(&mut state, &corrupt), None);
    assert_eq!(receive(&mut state, &encode(SeqNumber::ZERO, true, &[])), None);
    assert_eq!(receive(&mut state, &[1, 2, 3]), None);

    assert_eq!(state.expected_seq(), SeqNumber::ZERO);
    assert_eq!(
        state.on_packet(&Packet::data(SeqNumber::ZERO, Bytes::new())),
        ReceiveDecision::Deliver {
            ack: SeqNumber::ZERO
        }
    );
}

#[test]
fn test_window_driven_by_receiver_acks() {
    let mut window = SendWindow::new(9, 4);
    let mut state = ReceiveState::new();

    let admitted: Vec<_> = std::iter::from_fn(|| window.admit()).collect();
    assert_eq!(admitted.len(), 4);
    assert!(admitted[0].arm_timer);
    assert!(admitted[1..].iter().all(|a| !a.arm_timer));

    // Packet 2 lost in transit
    let mut outcomes = Vec::new();
    for seq in [0, 1, 3] {
        let ack = receive(&mut state, &data(seq)).unwrap();
        outcomes.push(window.on_ack(ack));
    }
    assert_eq!(
        outcomes,
        vec![
            AckOutcome::Advanced {
                acked: 1,
                window_empty: false
            },
            AckOutcome::Advanced {
                acked: 1,
                window_empty: false
            },
            AckOutcome::Stale,
        ]
    );
    assert_eq!(window.base(), SeqNumber::new(2));
    assert_eq!(window.in_flight_range(), 2..4);

    // Two slots freed by the acks
    assert_eq!(window.admit().map(|a| a.seq), Some(SeqNumber::new(4)));
    assert_eq!(window.admit().map(|a| a.seq), Some(SeqNumber::new(5)));
    assert!(window.admit().is_none());

    // A late cumulative ack for 5 clears the whole window
    assert_eq!(
        window.on_ack(SeqNumber::new(5)),
        AckOutcome::Advanced {
            acked: 4,
            window_empty: true
        }
    );
    assert_eq!(window.base(), SeqNumber::new(6));
    assert_eq!(window.next_seq(), SeqNumber::new(6));
}

#[test]
fn test_config_validation() {
    assert!(ArqConfig::default().validate().is_ok());

    let zero_window = ArqConfig {
        window_size: 0,
        ..ArqConfig::default()
    };
    assert_eq!(
        zero_window.validate(),
        Err(ConfigError::InvalidWindowSize(0))
    );

    let zero_timeout = ArqConfig {
        retransmit_timeout: Duration::ZERO,
        ..ArqConfig::default()
    };
    assert!(zero_timeout.validate().is_err());

    let tiny = ArqConfig {
        max_datagram_size: HEADER_SIZE - 1,
        ..ArqConfig::default()
    };
    assert!(matches!(
        tiny.validate(),
        Err(ConfigError::DatagramTooSmall { .. })
    ));
    assert_eq!(ArqConfig::default().max_payload_size(), 1024 - HEADER_SIZE);
}
