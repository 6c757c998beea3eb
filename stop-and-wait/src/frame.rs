//! Frame layouts and the integrity check.
//!
//! Two kinds of frame cross the simulated network:
//! - [`DataFrame`] carries one message payload from sender to receiver.
//! - [`AckFrame`] carries the acknowledgment back.
//!
//! Both carry a checksum computed over their canonical byte layout with the
//! checksum field excluded.  A frame whose stored checksum no longer matches
//! the recomputed one has been damaged in transit; [`Frame::verify`] is the
//! only integrity signal the protocol uses.
//!
//! No I/O happens here; this module is pure data transformation.
//!
//! # Canonical layout
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//! DATA  +------+-----+-------------+---------------+----------+
//!       | kind | seq | payload_len |  payload ...  | checksum |
//!       |  1   |  1  |      2      |  payload_len  |    4     |
//!       +------+-----+-------------+---------------+----------+
//!
//! ACK   +------+-----+----------+
//!       | kind | ack | checksum |
//!       |  1   |  1  |    4     |
//!       +------+-----+----------+
//! ```

use std::fmt;

use thiserror::Error;

/// Largest payload a single [`DataFrame`] may carry, in bytes.
pub const MAX_DATA_SIZE: usize = 1024;

/// Bytes preceding the payload in an encoded data frame.
pub const DATA_HEADER_LEN: usize = 4;

/// Width of the trailing checksum field.
pub const CHECKSUM_LEN: usize = 4;

/// Total length of an encoded ack frame.
pub const ACK_LEN: usize = 2 + CHECKSUM_LEN;

// ---------------------------------------------------------------------------
// Sequence numbers
// ---------------------------------------------------------------------------

/// Alternating one-bit sequence number.
///
/// Stop-and-wait only ever needs to tell a frame apart from its immediate
/// predecessor, so the sequence space is `{0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(u8);

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum(0);
    pub const ONE: SeqNum = SeqNum(1);

    /// Size of the sequence space.
    pub const MODULUS: u8 = 2;

    /// Returns `None` for values outside the sequence space.
    pub fn new(value: u8) -> Option<Self> {
        (value < Self::MODULUS).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The sequence number that follows this one, `(seq + 1) mod 2`.
    pub fn next(self) -> Self {
        Self((self.0 + 1) % Self::MODULUS)
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Frame kind
// ---------------------------------------------------------------------------

/// Value of the leading `kind` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Data = 0x01,
    Ack = 0x02,
}

impl FrameKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Data),
            0x02 => Some(Self::Ack),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from building or parsing a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {len} bytes exceeds the {max}-byte frame limit")]
    InvalidPayload { len: usize, max: usize },
    #[error("buffer too short to contain a frame")]
    BufferTooShort,
    #[error("payload_len field does not match remaining bytes")]
    LengthMismatch,
    #[error("unknown frame kind {0:#04x}")]
    UnknownKind(u8),
    #[error("expected a {expected:?} frame, found {found:?}")]
    WrongKind { expected: FrameKind, found: FrameKind },
    #[error("sequence number {0} outside the 0/1 sequence space")]
    InvalidSequence(u8),
    #[error("checksum verification failed")]
    ChecksumFailed,
}

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

/// Wrapping 32-bit sum of every byte in `bytes`.
///
/// The caller must leave the checksum field out of `bytes`.  A single flipped
/// bit always changes the sum, since it moves one byte by a power of two
/// smaller than 256.
pub fn compute_checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Split an encoded frame into `(body, stored checksum)` after checking its
/// kind byte.
fn split_checked(
    buf: &[u8],
    min_len: usize,
    expected: FrameKind,
) -> Result<(&[u8], u32), FrameError> {
    if buf.len() < min_len {
        return Err(FrameError::BufferTooShort);
    }
    let found = FrameKind::from_u8(buf[0]).ok_or(FrameError::UnknownKind(buf[0]))?;
    if found != expected {
        return Err(FrameError::WrongKind { expected, found });
    }
    let (body, trailer) = buf.split_at(buf.len() - CHECKSUM_LEN);
    Ok((body, read_u32(trailer)))
}

// ---------------------------------------------------------------------------
// Frame trait
// ---------------------------------------------------------------------------

/// Behaviour shared by every frame the network path can carry.
pub trait Frame: Clone + fmt::Debug {
    const KIND: FrameKind;

    /// Sequence (data) or acknowledgment (ack) number.
    fn number(&self) -> SeqNum;

    /// `true` when the stored checksum matches the frame's contents.
    fn verify(&self) -> bool;

    /// Number of distinct bit positions [`Frame::flip_bit`] addresses.
    fn bit_len(&self) -> usize;

    /// Flip one bit of the frame's contents without touching the checksum
    /// bookkeeping, as line noise would.
    fn flip_bit(&mut self, bit: usize);
}

// ---------------------------------------------------------------------------
// DataFrame
// ---------------------------------------------------------------------------

/// A frame carrying one message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub seq: SeqNum,
    pub payload: Vec<u8>,
    /// Checksum over kind, seq, payload length and payload.
    ///
    /// Set last by [`DataFrame::new`]; never recomputed afterwards.
    pub checksum: u32,
}

impl DataFrame {
    /// Build a data frame and seal it with its checksum.
    pub fn new(seq: SeqNum, payload: impl Into<Vec<u8>>) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.len() > MAX_DATA_SIZE {
            return Err(FrameError::InvalidPayload {
                len: payload.len(),
                max: MAX_DATA_SIZE,
            });
        }
        let mut frame = Self {
            seq,
            payload,
            checksum: 0,
        };
        frame.checksum = compute_checksum(&frame.body());
        Ok(frame)
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Encoded frame minus the checksum trailer.
    ///
    /// Callers guarantee `payload.len() <= MAX_DATA_SIZE`, so the length
    /// fits the 16-bit field.
    fn body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DATA_HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        buf.push(FrameKind::Data as u8);
        buf.push(self.seq.value());
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Serialise into the canonical layout, carrying the stored checksum.
    ///
    /// Fails if `payload` was replaced with one over [`MAX_DATA_SIZE`]
    /// after construction.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.payload.len() > MAX_DATA_SIZE {
            return Err(FrameError::InvalidPayload {
                len: self.payload.len(),
                max: MAX_DATA_SIZE,
            });
        }
        let mut buf = self.body();
        buf.extend_from_slice(&self.checksum.to_be_bytes());
        Ok(buf)
    }

    /// Parse a data frame, rejecting anything malformed or damaged.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let (body, checksum) = split_checked(buf, DATA_HEADER_LEN + CHECKSUM_LEN, FrameKind::Data)?;
        let seq = SeqNum::new(body[1]).ok_or(FrameError::InvalidSequence(body[1]))?;
        let payload_len = usize::from(u16::from_be_bytes([body[2], body[3]]));
        if body.len() != DATA_HEADER_LEN + payload_len {
            return Err(FrameError::LengthMismatch);
        }
        if payload_len > MAX_DATA_SIZE {
            return Err(FrameError::InvalidPayload {
                len: payload_len,
                max: MAX_DATA_SIZE,
            });
        }
        if compute_checksum(body) != checksum {
            return Err(FrameError::ChecksumFailed);
        }
        Ok(Self {
            seq,
            payload: body[DATA_HEADER_LEN..].to_vec(),
            checksum,
        })
    }
}

impl Frame for DataFrame {
    const KIND: FrameKind = FrameKind::Data;

    fn number(&self) -> SeqNum {
        self.seq
    }

    fn verify(&self) -> bool {
        self.payload.len() <= MAX_DATA_SIZE && compute_checksum(&self.body()) == self.checksum
    }

    fn bit_len(&self) -> usize {
        self.payload.len() * 8 + CHECKSUM_LEN * 8
    }

    // Payload bits first, then checksum bits.
    fn flip_bit(&mut self, bit: usize) {
        let payload_bits = self.payload.len() * 8;
        if bit < payload_bits {
            self.payload[bit / 8] ^= 1 << (bit % 8);
        } else {
            self.checksum ^= 1 << ((bit - payload_bits) % 32);
        }
    }
}

// ---------------------------------------------------------------------------
// AckFrame
// ---------------------------------------------------------------------------

/// Acknowledgment of the data frame carrying sequence number `ack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    pub ack: SeqNum,
    pub checksum: u32,
}

impl AckFrame {
    pub fn new(ack: SeqNum) -> Self {
        let checksum = compute_checksum(&[FrameKind::Ack as u8, ack.value()]);
        Self { ack, checksum }
    }

    fn body(&self) -> [u8; 2] {
        [FrameKind::Ack as u8, self.ack.value()]
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.body().to_vec();
        buf.extend_from_slice(&self.checksum.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let (body, checksum) = split_checked(buf, ACK_LEN, FrameKind::Ack)?;
        if body.len() != ACK_LEN - CHECKSUM_LEN {
            return Err(FrameError::LengthMismatch);
        }
        let ack = SeqNum::new(body[1]).ok_or(FrameError::InvalidSequence(body[1]))?;
        if compute_checksum(body) != checksum {
            return Err(FrameError::ChecksumFailed);
        }
        Ok(Self { ack, checksum })
    }
}

impl Frame for AckFrame {
    const KIND: FrameKind = FrameKind::Ack;

    fn number(&self) -> SeqNum {
        self.ack
    }

    fn verify(&self) -> bool {
        compute_checksum(&self.body()) == self.checksum
    }

    fn bit_len(&self) -> usize {
        1 + CHECKSUM_LEN * 8
    }

    // Bit 0 is the ack number itself; the rest address the checksum.
    fn flip_bit(&mut self, bit: usize) {
        if bit == 0 {
            self.ack = self.ack.next();
        } else {
            self.checksum ^= 1 << ((bit - 1) % 32);
        }
    }
}
