//! Wire-format definitions for protocol packets.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (fixed header, optional seqno, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], rejecting corrupt
//!   or malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            Length             |            Checksum           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Acknowledgment Number                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              Sequence Number (absent in pure ACKs)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Payload (0..=500) ...                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The `length` field carries the total datagram size: [`ACK_LEN`] for a pure
//! ACK, [`HEADER_LEN`] for the end-of-stream marker and `HEADER_LEN + k` for a
//! data packet with `1 <= k <= MAX_PAYLOAD` bytes.

use thiserror::Error;

/// Size of a pure acknowledgement: length + checksum + ackno.
pub const ACK_LEN: usize = 8;

/// Size of the header carried by data and EOF packets.
pub const HEADER_LEN: usize = 12;

/// Largest payload a single data packet may carry.
pub const MAX_PAYLOAD: usize = 500;

/// Largest valid datagram.
pub const MAX_PACKET_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

// Byte offsets of each field within the serialised header.
const OFF_LEN: usize = 0;
const OFF_CHECKSUM: usize = 2;
const OFF_ACK: usize = 4;
const OFF_SEQ: usize = 8;

/// A decoded protocol datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Pure cumulative acknowledgement.
    Ack { ackno: u32 },
    /// In-order data carrying `1..=MAX_PAYLOAD` bytes.
    Data {
        seqno: u32,
        ackno: u32,
        payload: Vec<u8>,
    },
    /// End-of-stream marker; occupies one sequence number, carries no bytes.
    Eof { seqno: u32, ackno: u32 },
}

impl Packet {
    /// Sequence number, or `None` for a pure ACK.
    pub fn seqno(&self) -> Option<u32> {
        match *self {
            Packet::Ack { .. } => None,
            Packet::Data { seqno, .. } | Packet::Eof { seqno, .. } => Some(seqno),
        }
    }

    /// Cumulative acknowledgement number, present in every kind.
    pub fn ackno(&self) -> u32 {
        match *self {
            Packet::Ack { ackno } | Packet::Data { ackno, .. } | Packet::Eof { ackno, .. } => {
                ackno
            }
        }
    }

    /// Total on-wire size, which is also the value of the `length` field.
    pub fn wire_len(&self) -> usize {
        match self {
            Packet::Ack { .. } => ACK_LEN,
            Packet::Data { payload, .. } => HEADER_LEN + payload.len(),
            Packet::Eof { .. } => HEADER_LEN,
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    ///
    /// The checksum is computed last, over the whole datagram with the
    /// checksum field zeroed.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.wire_len();
        let mut buf = vec![0u8; len];

        buf[OFF_LEN..OFF_LEN + 2].copy_from_slice(&(len as u16).to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&self.ackno().to_be_bytes());
        if let Some(seqno) = self.seqno() {
            buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&seqno.to_be_bytes());
        }
        if let Packet::Data { payload, .. } = self {
            debug_assert!(
                !payload.is_empty() && payload.len() <= MAX_PAYLOAD,
                "data payload must be 1..={MAX_PAYLOAD} bytes, got {}",
                payload.len()
            );
            buf[HEADER_LEN..].copy_from_slice(payload);
        }

        let csum = internet_checksum(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());

        buf
    }

    /// Parse a [`Packet`] from one received datagram.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`ACK_LEN`],
    /// - the checksum does not verify,
    /// - the `length` field disagrees with `buf.len()`, or
    /// - the length is not one a well-formed packet can have.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < ACK_LEN {
            return Err(PacketError::Truncated(buf.len()));
        }

        let checksum = read_u16(buf, OFF_CHECKSUM);
        let mut scratch = buf.to_vec();
        scratch[OFF_CHECKSUM..OFF_CHECKSUM + 2].fill(0);
        let computed = internet_checksum(&scratch);
        if computed != checksum {
            return Err(PacketError::Corrupt {
                expected: checksum,
                computed,
            });
        }

        let len = read_u16(buf, OFF_LEN) as usize;
        if len != buf.len() {
            return Err(PacketError::LengthMismatch {
                field: len,
                actual: buf.len(),
            });
        }

        let ackno = read_u32(buf, OFF_ACK);
        match len {
            ACK_LEN => Ok(Packet::Ack { ackno }),
            HEADER_LEN => Ok(Packet::Eof {
                seqno: read_u32(buf, OFF_SEQ),
                ackno,
            }),
            n if n > HEADER_LEN && n <= MAX_PACKET_LEN => Ok(Packet::Data {
                seqno: read_u32(buf, OFF_SEQ),
                ackno,
                payload: buf[HEADER_LEN..].to_vec(),
            }),
            n => Err(PacketError::BadLength(n)),
        }
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Buffer shorter than the smallest packet.
    #[error("datagram of {0} bytes is shorter than an ACK")]
    Truncated(usize),
    /// Checksum did not match the recomputed value.
    #[error("checksum mismatch: carried {expected:#06x}, computed {computed:#06x}")]
    Corrupt { expected: u16, computed: u16 },
    /// `length` field does not match the datagram size.
    #[error("length field {field} does not match datagram size {actual}")]
    LengthMismatch { field: usize, actual: usize },
    /// Length outside {8} ∪ [12, 512].
    #[error("invalid packet length {0}")]
    BadLength(usize),
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// The caller must zero the checksum field within `data` first.
fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    // Odd trailing byte, padded with zero on the right.
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(seqno: u32, ackno: u32, payload: &[u8]) -> Packet {
        Packet::Data {
            seqno,
            ackno,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn ack_is_eight_bytes_without_seqno() {
        let bytes = Packet::Ack { ackno: 7 }.encode();
        assert_eq!(bytes.len(), ACK_LEN);
        assert_eq!(&bytes[OFF_LEN..OFF_LEN + 2], &[0, 8]);
        assert_eq!(Packet::decode(&bytes), Ok(Packet::Ack { ackno: 7 }));
    }

    #[test]
    fn eof_is_twelve_bytes() {
        let pkt = Packet::Eof { seqno: 3, ackno: 2 };
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(Packet::decode(&bytes), Ok(pkt));
    }

    #[test]
    fn data_roundtrip_preserves_fields() {
        let pkt = data(42, 9, b"hello");
        let decoded = Packet::decode(&pkt.encode()).unwrap();
        assert_eq!(decoded.seqno(), Some(42));
        assert_eq!(decoded.ackno(), 9);
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn max_payload_roundtrip() {
        let pkt = data(1, 1, &[0xab; MAX_PAYLOAD]);
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), MAX_PACKET_LEN);
        assert_eq!(Packet::decode(&bytes), Ok(pkt));
    }

    #[test]
    fn fields_are_big_endian_on_wire() {
        let bytes = data(0x0102_0304, 0x0506_0708, b"x").encode();
        assert_eq!(&bytes[OFF_LEN..OFF_LEN + 2], &[0x00, 13]);
        assert_eq!(&bytes[OFF_ACK..OFF_ACK + 4], &[0x05, 0x06, 0x07, 0x08]);
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn checksum_covers_header_and_payload() {
        let bytes = data(5, 6, b"abc").encode();
        let mut zeroed = bytes.clone();
        zeroed[OFF_CHECKSUM..OFF_CHECKSUM + 2].fill(0);
        assert_eq!(read_u16(&bytes, OFF_CHECKSUM), internet_checksum(&zeroed));
    }

    #[test]
    fn decode_short_buffer_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::Truncated(0)));
        assert_eq!(
            Packet::decode(&[0u8; ACK_LEN - 1]),
            Err(PacketError::Truncated(ACK_LEN - 1))
        );
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let bytes = data(17, 4, b"some payload bytes").encode();
        for i in 0..bytes.len() * 8 {
            let mut flipped = bytes.clone();
            flipped[i / 8] ^= 1 << (i % 8);
            assert!(
                Packet::decode(&flipped).is_err(),
                "bit {i} flip was not detected"
            );
        }
    }

    #[test]
    fn corrupt_payload_reports_checksum_error() {
        let mut bytes = data(99, 0, b"test").encode();
        bytes[HEADER_LEN] ^= 0xff;
        assert!(matches!(
            Packet::decode(&bytes),
            Err(PacketError::Corrupt { .. })
        ));
    }

    #[test]
    fn truncated_datagram_is_rejected() {
        // Re-checksum a shortened copy so only the length check can catch it.
        let mut bytes = data(1, 1, b"data").encode();
        bytes.pop();
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].fill(0);
        let csum = internet_checksum(&bytes);
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(
            Packet::decode(&bytes),
            Err(PacketError::LengthMismatch {
                field: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn lengths_between_ack_and_header_are_invalid() {
        let mut bytes = vec![0u8; 10];
        bytes[OFF_LEN..OFF_LEN + 2].copy_from_slice(&10u16.to_be_bytes());
        let csum = internet_checksum(&bytes);
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(Packet::decode(&bytes), Err(PacketError::BadLength(10)));
    }

    #[test]
    fn oversized_datagram_is_invalid() {
        let len = MAX_PACKET_LEN + 1;
        let mut bytes = vec![0u8; len];
        bytes[OFF_LEN..OFF_LEN + 2].copy_from_slice(&(len as u16).to_be_bytes());
        let csum = internet_checksum(&bytes);
        bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(Packet::decode(&bytes), Err(PacketError::BadLength(len)));
    }
}
