//! The coarse/fine spacecraft clock value type.
use std::cmp::Ordering;

use crate::encoding::CoarseFineEncoding;
use crate::{Error, Result};

/// An immutable spacecraft clock value: a coarse (seconds) count and a fine
/// (sub-second ticks) count bound to a [CoarseFineEncoding].
///
/// A `Sclk` is created from explicit tick values, from a floating-point
/// seconds value, from decoded bytes (see [crate::extract]), or from
/// arithmetic on an existing value. Values are never mutated in place.
///
/// A *dummy* value means "no value": it formats as an empty string but still
/// carries a zero payload through arithmetic. DVT and other structurally
/// identical clock tags are the same type bound to a different encoding.
#[derive(Clone, Debug)]
pub struct Sclk {
    coarse: u64,
    fine: u64,
    encoding: CoarseFineEncoding,
    original_bit_len: u32,
    dummy: bool,
}

impl Sclk {
    /// Create a value from coarse and fine tick counts.
    ///
    /// # Errors
    /// [Error::OutOfRange] if either count exceeds its encoding modulus.
    pub fn new(coarse: u64, fine: u64, encoding: CoarseFineEncoding) -> Result<Self> {
        if coarse > encoding.max_coarse() {
            return Err(Error::OutOfRange {
                field: "coarse",
                value: i128::from(coarse),
                max: encoding.max_coarse(),
            });
        }
        if fine > encoding.max_fine() {
            return Err(Error::OutOfRange {
                field: "fine",
                value: i128::from(fine),
                max: encoding.max_fine(),
            });
        }
        let original_bit_len = encoding.bit_len();
        Ok(Sclk {
            coarse,
            fine,
            encoding,
            original_bit_len,
            dummy: false,
        })
    }

    /// Create a value from seconds, splitting the fractional part onto the
    /// fine scale with round-to-nearest.
    ///
    /// # Errors
    /// [Error::NegativeOperand] for negative or non-finite input;
    /// [Error::OutOfRange] if the integer part exceeds the coarse modulus or
    /// the rounded fine count overflows the fine modulus.
    pub fn from_float_seconds(secs: f64, encoding: CoarseFineEncoding) -> Result<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(Error::NegativeOperand {
                field: "seconds",
                value: secs as i64,
            });
        }
        let coarse = secs.trunc();
        let fine = ((secs - coarse) * (encoding.max_fine() as f64 + 1.0)).round();
        if coarse > encoding.max_coarse() as f64 {
            return Err(Error::OutOfRange {
                field: "coarse",
                value: coarse as i128,
                max: encoding.max_coarse(),
            });
        }
        Self::new(coarse as u64, fine as u64, encoding)
    }

    /// Create a value from milliseconds, rounding the sub-second part onto
    /// the fine scale. A fine count that rounds up to the modulus carries
    /// into coarse.
    ///
    /// # Errors
    /// [Error::OutOfRange] if the second count exceeds the coarse modulus.
    pub fn from_millis(millis: u64, encoding: CoarseFineEncoding) -> Result<Self> {
        let mut coarse = millis / 1000;
        let fulp1 = u128::from(encoding.max_fine()) + 1;
        // round-half-up in exact integer arithmetic
        let mut fine = ((u128::from(millis % 1000) * fulp1 + 500) / 1000) as u64;
        if u128::from(fine) == fulp1 {
            coarse += 1;
            fine = 0;
        }
        Self::new(coarse, fine, encoding)
    }

    /// A "no value" placeholder that formats as an empty string.
    #[must_use]
    pub fn dummy(encoding: CoarseFineEncoding) -> Self {
        let original_bit_len = encoding.bit_len();
        Sclk {
            coarse: 0,
            fine: 0,
            encoding,
            original_bit_len,
            dummy: true,
        }
    }

    /// Construct a decoded value that records the bit width of its source
    /// layout, which may differ from the target encoding's.
    pub(crate) fn decoded(
        coarse: u64,
        fine: u64,
        encoding: CoarseFineEncoding,
        original_bit_len: u32,
    ) -> Result<Self> {
        let mut sclk = Self::new(coarse, fine, encoding)?;
        sclk.original_bit_len = original_bit_len;
        Ok(sclk)
    }

    pub(crate) fn with_original_bit_len(mut self, bits: u32) -> Self {
        self.original_bit_len = bits;
        self
    }

    #[must_use]
    pub fn coarse(&self) -> u64 {
        self.coarse
    }

    #[must_use]
    pub fn fine(&self) -> u64 {
        self.fine
    }

    #[must_use]
    pub fn encoding(&self) -> &CoarseFineEncoding {
        &self.encoding
    }

    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    /// Serialized length in bytes of the layout this value was decoded from.
    /// Equal to the encoding's byte length unless the value came from a
    /// source with a different total width.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.original_bit_len.div_ceil(8) as usize
    }

    /// Add coarse and fine tick counts, carrying fine overflow into coarse.
    ///
    /// The resulting coarse count is *not* checked against the coarse
    /// modulus; mission clocks may wrap and wrapping policy belongs to the
    /// caller. [Sclk::to_bytes] rejects such a value at serialization time.
    ///
    /// # Errors
    /// [Error::NegativeOperand] for a negative operand, [Error::Overflow] if
    /// the coarse count no longer fits 64 bits.
    pub fn increment(&self, add_coarse: i64, add_fine: i64) -> Result<Self> {
        let (add_coarse, add_fine) = unsigned_operands(add_coarse, add_fine)?;
        let fulp1 = self.encoding.max_fine() + 1;
        let total_fine = self
            .fine
            .checked_add(add_fine)
            .ok_or(Error::Overflow)?;
        let coarse = self
            .coarse
            .checked_add(add_coarse)
            .and_then(|c| c.checked_add(total_fine / fulp1))
            .ok_or(Error::Overflow)?;
        Ok(Sclk {
            coarse,
            fine: total_fine % fulp1,
            encoding: self.encoding.clone(),
            original_bit_len: self.encoding.bit_len(),
            dummy: false,
        })
    }

    /// Subtract coarse and fine tick counts, borrowing from coarse as needed.
    ///
    /// # Errors
    /// [Error::NegativeOperand] for a negative operand, [Error::Underflow] if
    /// the subtrahend exceeds this value.
    pub fn decrement(&self, sub_coarse: i64, sub_fine: i64) -> Result<Self> {
        let (sub_coarse, sub_fine) = unsigned_operands(sub_coarse, sub_fine)?;
        let fulp1 = u128::from(self.encoding.max_fine()) + 1;
        let total = u128::from(self.coarse) * fulp1 + u128::from(self.fine);
        let sub = u128::from(sub_coarse) * fulp1 + u128::from(sub_fine);
        if sub > total {
            return Err(Error::Underflow);
        }
        let rem = total - sub;
        Ok(Sclk {
            coarse: (rem / fulp1) as u64,
            fine: (rem % fulp1) as u64,
            encoding: self.encoding.clone(),
            original_bit_len: self.encoding.bit_len(),
            dummy: false,
        })
    }

    /// This value as a flat tick count: `coarse * (max_fine+1) + fine`.
    ///
    /// # Errors
    /// [Error::Overflow] if the count does not fit 64 bits, possible only
    /// for pathological configured moduli.
    pub fn exact_ticks(&self) -> Result<u64> {
        self.coarse
            .checked_mul(self.encoding.max_fine() + 1)
            .and_then(|t| t.checked_add(self.fine))
            .ok_or(Error::Overflow)
    }

    /// This value as seconds, with the fine count as the fractional part.
    #[must_use]
    pub fn floating_point_seconds(&self) -> f64 {
        self.coarse as f64 + self.fine as f64 / (self.encoding.max_fine() as f64 + 1.0)
    }

    /// Serialize as big-endian coarse field then fine field, each of its
    /// encoding's fixed byte width.
    ///
    /// # Errors
    /// [Error::OutOfRange] if arithmetic carried the coarse count past the
    /// coarse modulus; the value cannot be represented and is not truncated.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.coarse > self.encoding.max_coarse() {
            return Err(Error::OutOfRange {
                field: "coarse",
                value: i128::from(self.coarse),
                max: self.encoding.max_coarse(),
            });
        }
        let mut bytes = Vec::with_capacity(self.encoding.byte_len());
        bytes.extend_from_slice(&self.coarse.to_be_bytes()[8 - self.encoding.coarse_byte_len()..]);
        bytes.extend_from_slice(&self.fine.to_be_bytes()[8 - self.encoding.fine_byte_len()..]);
        Ok(bytes)
    }

    /// Decode from big-endian bytes at `offset`, validating against the
    /// encoding's moduli.
    ///
    /// # Errors
    /// [Error::BufferTooShort] if fewer than `encoding.byte_len()` bytes
    /// remain at `offset`; [Error::OutOfRange] if a decoded field exceeds
    /// its modulus.
    pub fn from_bytes(buf: &[u8], offset: usize, encoding: CoarseFineEncoding) -> Result<Self> {
        let needed = encoding.byte_len();
        if buf.len() < offset + needed {
            return Err(Error::BufferTooShort {
                offset,
                needed,
                available: buf.len().saturating_sub(offset),
            });
        }
        let coarse = read_unsigned_be(buf, offset, encoding.coarse_byte_len());
        let fine = read_unsigned_be(
            buf,
            offset + encoding.coarse_byte_len(),
            encoding.fine_byte_len(),
        );
        Self::new(coarse, fine, encoding)
    }
}

/// Read `len` (0..=8) bytes at `offset` as a big-endian unsigned integer.
pub(crate) fn read_unsigned_be(buf: &[u8], offset: usize, len: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[8 - len..].copy_from_slice(&buf[offset..offset + len]);
    u64::from_be_bytes(bytes)
}

fn unsigned_operands(coarse: i64, fine: i64) -> Result<(u64, u64)> {
    if coarse < 0 {
        return Err(Error::NegativeOperand {
            field: "coarse",
            value: coarse,
        });
    }
    if fine < 0 {
        return Err(Error::NegativeOperand {
            field: "fine",
            value: fine,
        });
    }
    Ok((coarse as u64, fine as u64))
}

impl PartialEq for Sclk {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Sclk {}

impl PartialOrd for Sclk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sclk {
    /// Values sharing a fine modulus compare lexicographically on
    /// (coarse, fine). Values with differing moduli compare as exact
    /// fractions by cross-multiplication, so a 1/256-resolution clock and a
    /// 1/65536-resolution clock order consistently.
    fn cmp(&self, other: &Self) -> Ordering {
        let s_fulp1 = u128::from(self.encoding.max_fine()) + 1;
        let o_fulp1 = u128::from(other.encoding.max_fine()) + 1;
        if s_fulp1 == o_fulp1 {
            return (self.coarse, self.fine).cmp(&(other.coarse, other.fine));
        }
        // Bounded: total ticks < 2^96 (64-bit coarse, <=32-bit fine) and the
        // other modulus is <= 2^32, so the cross product is < 2^128.
        let lhs = (u128::from(self.coarse) * s_fulp1 + u128::from(self.fine)) * o_fulp1;
        let rhs = (u128::from(other.coarse) * o_fulp1 + u128::from(other.fine)) * s_fulp1;
        lhs.cmp(&rhs)
    }
}
