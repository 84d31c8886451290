//! RDoUT Packet Structures and Serialization
//!
//! Every datagram carries a fixed 9-byte header followed by the payload:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Sequence Number (signed, BE)                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 CRC-32 of payload (BE)                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    is_ack     |            Payload ...                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Decoding never rejects a checksum mismatch; it only fails on input that
//! is too short to hold a header. Callers check [`Packet::is_valid`].

use crate::sequence::SeqNumber;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::mem::size_of;
use thiserror::Error;

/// Size of the packet header in bytes (sequence + checksum + ack flag)
pub const HEADER_SIZE: usize = size_of::<i32>() + size_of::<u32>() + size_of::<u8>();

/// Largest payload that fits in a datagram of `max_datagram_size` bytes
#[inline]
pub fn max_payload_size(max_datagram_size: usize) -> usize {
    max_datagram_size.saturating_sub(HEADER_SIZE)
}

/// CRC-32 of a payload, as carried in the header
pub fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Sequence number of a data packet, or the acknowledged sequence number
    pub seq: SeqNumber,
    /// Checksum as found on the wire (or computed at construction)
    pub checksum: u32,
    /// Acknowledgment flag
    pub is_ack: bool,
}

impl PacketHeader {
    /// Parse header from bytes (network byte order)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PacketError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(PacketHeader {
            seq: SeqNumber::new(buf.get_i32()),
            checksum: buf.get_u32(),
            is_ack: buf.get_u8() != 0,
        })
    }

    /// Serialize header to bytes (network byte order)
    pub fn to_bytes(&self, buf: &mut BytesMut) {
        buf.put_i32(self.seq.as_raw());
        buf.put_u32(self.checksum);
        buf.put_u8(u8::from(self.is_ack));
    }
}

/// A data or acknowledgment packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: PacketHeader,
    /// Payload data (empty for acknowledgments)
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet, computing the checksum over `payload`
    pub fn new(seq: SeqNumber, is_ack: bool, payload: Bytes) -> Self {
        Packet {
            header: PacketHeader {
                seq,
                checksum: checksum(&payload),
                is_ack,
            },
            payload,
        }
    }

    /// Create a data packet
    pub fn data(seq: SeqNumber, payload: Bytes) -> Self {
        Packet::new(seq, false, payload)
    }

    /// Create a cumulative acknowledgment for `seq`
    pub fn ack(seq: SeqNumber) -> Self {
        Packet::new(seq, true, Bytes::new())
    }

    /// Sequence number carried in the header
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        self.header.seq
    }

    /// Check if this is an acknowledgment
    #[inline]
    pub fn is_ack(&self) -> bool {
        self.header.is_ack
    }

    /// Check if this is a data packet
    #[inline]
    pub fn is_data(&self) -> bool {
        !self.header.is_ack
    }

    /// Recompute the payload checksum and compare it with the header
    pub fn is_valid(&self) -> bool {
        self.header.checksum == checksum(&self.payload)
    }

    /// Total size of the packet (header + payload)
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        self.header.to_bytes(&mut buf);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a packet from bytes
    ///
    /// The header checksum is kept as received; use [`Packet::is_valid`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::from_bytes(bytes)?;

        let payload = if bytes.len() > HEADER_SIZE {
            Bytes::copy_from_slice(&bytes[HEADER_SIZE..])
        } else {
            Bytes::new()
        };

        Ok(Packet { header, payload })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_ack() { "ACK" } else { "DATA" };
        write!(f, "[{} | SEQ={}]", kind, self.header.seq)
    }
}

/// Encode a packet straight to its wire form
pub fn encode(seq: SeqNumber, is_ack: bool, payload: &[u8]) -> Bytes {
    Packet::new(seq, is_ack, Bytes::copy_from_slice(payload))
        .to_bytes()
        .freeze()
}

/// Decode a packet from its wire form
pub fn decode(bytes: &[u8]) -> Result<Packet, PacketError> {
    Packet::from_bytes(bytes)
}

/// Packet parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 9);
        assert_eq!(max_payload_size(1024), 1015);
        assert_eq!(max_payload_size(4), 0);
    }

    #[test]
    fn test_data_packet_serialization() {
        let payload = Bytes::from_static(b"Packet_0: Hello");
        let packet = Packet::data(SeqNumber::new(0), payload.clone());
        let bytes = packet.to_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE + payload.len());

        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.seq_number(), SeqNumber::new(0));
        assert!(decoded.is_data());
        assert!(decoded.is_valid());
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_ack_packet_layout() {
        let bytes = Packet::ack(SeqNumber::NONE).to_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
        // CRC-32 of the empty payload is zero
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(bytes[8], 1);

        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert!(decoded.is_ack());
        assert!(decoded.is_valid());
        assert!(decoded.seq_number().is_none());
    }

    #[test]
    fn test_network_byte_order() {
        let bytes = encode(SeqNumber::new(0x0102_0304), false, b"");
        assert_eq!(&bytes[..4], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_known_checksum() {
        // Standard CRC-32 check value
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_short_input_rejected() {
        for len in 0..HEADER_SIZE {
            let err = decode(&vec![0u8; len]).unwrap_err();
            assert_eq!(
                err,
                PacketError::InsufficientData {
                    expected: HEADER_SIZE,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn test_corrupted_payload_is_invalid() {
        let mut bytes = encode(SeqNumber::new(3), false, b"Sliding").to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 0;

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.seq_number(), SeqNumber::new(3));
        assert!(!decoded.is_valid());
    }

    #[test]
    fn test_truncated_payload_is_invalid() {
        let bytes = encode(SeqNumber::new(5), false, b"Optimized");
        let decoded = decode(&bytes[..bytes.len() - 2]).unwrap();
        assert!(!decoded.is_valid());
    }

    #[test]
    fn test_nonzero_flag_is_ack() {
        let mut bytes = encode(SeqNumber::new(1), false, b"").to_vec();
        bytes[8] = 0x7F;
        assert!(decode(&bytes).unwrap().is_ack());
    }

    #[test]
    fn test_display() {
        assert_eq!(Packet::data(SeqNumber::new(4), Bytes::new()).to_string(), "[DATA | SEQ=4]");
        assert_eq!(Packet::ack(SeqNumber::NONE).to_string(), "[ACK | SEQ=-1]");
    }
}
