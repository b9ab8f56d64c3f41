//! # IR Frame
//!
//! The 72-bit command the heat pump remote sends, carried as a string of
//! `'0'`/`'1'` characters so the transmitter can play it back bit by bit.
//!
//! ```text
//! HEADER                                   TEMP      FAN    P MO          CHSM   P CS
//! 1111001000001101000000111111110000000001 0101 0000 1000 0 0 11 00000000 1101 0 0 10
//! ```
//!
//! - TEMP: target temperature minus 17 (17..=30 fits in 4 bits)
//! - FAN: 0 = auto, otherwise `(speed / 20) * 2 + 2`
//! - P: power, inverted (0 = on, 1 = off), repeated before CS
//! - MO: 0 = auto, 1 = cool, 3 = heat; the remote sends heat while powered off
//! - CHSM: `(TEMP + FAN) % 16`
//! - CS: `MO ^ 1`

pub mod decoder;
pub mod encoder;

use std::fmt;
use std::ops::Range;

use crate::error::{DecodeError, EncodeError};

pub use decoder::decode;
pub use encoder::encode;

/// Total frame length in bits.
pub const FRAME_LEN: usize = 72;

/// Constant preamble every frame starts with.
pub const HEADER_BITS: &str = "1111001000001101000000111111110000000001";

/// Offset of the target temperature on the wire (TEMP = temperature - 17).
pub const TEMPERATURE_OFFSET: i32 = 17;

/// A fixed-position bit field inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Segment {
    const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self { name, offset, width }
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }

    pub fn end(&self) -> usize {
        self.offset + self.width
    }

    fn max_value(&self) -> i64 {
        (1i64 << self.width) - 1
    }
}

pub const HEADER: Segment = Segment::new("HEADER", 0, 40);
pub const TEMP: Segment = Segment::new("TEMP", 40, 4);
pub const PAD_TEMP: Segment = Segment::new("PAD", 44, 4);
pub const FAN: Segment = Segment::new("FAN", 48, 4);
pub const PAD_FAN: Segment = Segment::new("PAD", 52, 1);
pub const POWER: Segment = Segment::new("P", 53, 1);
pub const MODE: Segment = Segment::new("MO", 54, 2);
pub const PAD_MODE: Segment = Segment::new("PAD", 56, 8);
pub const CHSM: Segment = Segment::new("CHSM", 64, 4);
pub const PAD_CHSM: Segment = Segment::new("PAD", 68, 1);
pub const POWER_MIRROR: Segment = Segment::new("P", 69, 1);
pub const CS: Segment = Segment::new("CS", 70, 2);

/// Every segment in wire order.
pub const LAYOUT: [Segment; 12] = [
    HEADER,
    TEMP,
    PAD_TEMP,
    FAN,
    PAD_FAN,
    POWER,
    MODE,
    PAD_MODE,
    CHSM,
    PAD_CHSM,
    POWER_MIRROR,
    CS,
];

/// A complete, well-formed 72-bit frame.
///
/// Holding a `Frame` only guarantees length and alphabet; header and
/// checksums are checked by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame(String);

impl Frame {
    pub fn parse(bits: &str) -> Result<Self, DecodeError> {
        if bits.len() != FRAME_LEN || !bits.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(DecodeError::Malformed {
                expected: FRAME_LEN,
                len: bits.chars().count(),
            });
        }
        Ok(Frame(bits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn header(&self) -> &str {
        &self.0[HEADER.range()]
    }

    /// Reads a segment of up to 8 bits as an unsigned integer.
    pub(crate) fn read(&self, segment: Segment) -> u8 {
        assert!(segment.width <= 8, "{} is wider than 8 bits", segment.name);
        self.0[segment.range()]
            .bytes()
            .fold(0u8, |acc, b| (acc << 1) | (b - b'0'))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Frame {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Appends segments in wire order and checks the finished length.
#[derive(Debug)]
pub struct FrameBuilder {
    bits: String,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            bits: String::with_capacity(FRAME_LEN),
        }
    }

    pub fn literal(mut self, segment: Segment, bits: &str) -> Self {
        debug_assert_eq!(self.bits.len(), segment.offset, "{} out of order", segment.name);
        debug_assert_eq!(bits.len(), segment.width, "{} width", segment.name);
        self.bits.push_str(bits);
        self
    }

    pub fn zeros(mut self, segment: Segment) -> Self {
        debug_assert_eq!(self.bits.len(), segment.offset, "{} out of order", segment.name);
        self.bits.extend(std::iter::repeat('0').take(segment.width));
        self
    }

    pub fn field(mut self, segment: Segment, value: i64) -> Result<Self, EncodeError> {
        debug_assert_eq!(self.bits.len(), segment.offset, "{} out of order", segment.name);
        if value < 0 || value > segment.max_value() {
            return Err(EncodeError::OutOfRange {
                segment: segment.name,
                value,
                width: segment.width,
            });
        }
        self.bits
            .push_str(&format!("{:0width$b}", value, width = segment.width));
        Ok(self)
    }

    pub fn finish(self) -> Frame {
        assert_eq!(self.bits.len(), FRAME_LEN, "frame layout does not add up");
        Frame(self.bits)
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
