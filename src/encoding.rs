//! Coarse/fine bit-layout descriptors.
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Widest supported coarse or fine field, in bits. Wider fields would need
/// more than 4 bytes in the binary codec.
const MAX_FIELD_BITS: u32 = 32;

/// Describes how a spacecraft clock value is split into a coarse (seconds)
/// field and a fine (sub-second ticks) field.
///
/// `max_fine` is the fine modulus minus one. It is normally derived from the
/// fine bit width, but missions with decimal sub-second counters (e.g. a
/// fine field counting 0..=9999 in 14 bits) may supply it explicitly via
/// [`CoarseFineEncoding::with_fine_modulus`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoarseFineEncoding {
    coarse_bits: u32,
    fine_bits: u32,
    max_fine: u64,
}

impl CoarseFineEncoding {
    /// Create an encoding whose fine modulus is derived from the fine bit
    /// width, i.e. `max_fine = 2^fine_bits - 1`.
    ///
    /// # Errors
    /// [Error::InvalidEncoding] if either field is wider than 32 bits.
    pub fn new(coarse_bits: u32, fine_bits: u32) -> Result<Self> {
        validate_widths(coarse_bits, fine_bits)?;
        Ok(CoarseFineEncoding {
            coarse_bits,
            fine_bits,
            max_fine: max_value(fine_bits),
        })
    }

    /// Create an encoding with an explicit fine modulus.
    ///
    /// # Errors
    /// [Error::InvalidEncoding] if either field is wider than 32 bits or if
    /// `max_fine` cannot be represented in `fine_bits`.
    pub fn with_fine_modulus(coarse_bits: u32, fine_bits: u32, max_fine: u64) -> Result<Self> {
        validate_widths(coarse_bits, fine_bits)?;
        if max_fine > max_value(fine_bits) {
            return Err(Error::InvalidEncoding(format!(
                "fine upper limit {max_fine} does not fit in {fine_bits} bits"
            )));
        }
        Ok(CoarseFineEncoding {
            coarse_bits,
            fine_bits,
            max_fine,
        })
    }

    #[must_use]
    pub fn coarse_bits(&self) -> u32 {
        self.coarse_bits
    }

    #[must_use]
    pub fn fine_bits(&self) -> u32 {
        self.fine_bits
    }

    /// Largest valid coarse value.
    #[must_use]
    pub fn max_coarse(&self) -> u64 {
        max_value(self.coarse_bits)
    }

    /// Largest valid fine value (the fine modulus minus one).
    #[must_use]
    pub fn max_fine(&self) -> u64 {
        self.max_fine
    }

    #[must_use]
    pub fn coarse_byte_len(&self) -> usize {
        self.coarse_bits.div_ceil(8) as usize
    }

    #[must_use]
    pub fn fine_byte_len(&self) -> usize {
        self.fine_bits.div_ceil(8) as usize
    }

    /// Serialized length of a value in this encoding: coarse field
    /// immediately followed by fine field, no padding.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.coarse_byte_len() + self.fine_byte_len()
    }

    #[must_use]
    pub fn bit_len(&self) -> u32 {
        self.coarse_bits + self.fine_bits
    }

    /// Rescale a fine tick count from one modulus to another.
    ///
    /// The result is `floor(fine * (target_max_fine+1) / (source_max_fine+1))`,
    /// computed exactly in 128 bits. Strictly floor: repeated conversions can
    /// never move a fine value later in time than its true position.
    #[must_use]
    pub fn normalize_fine(fine: u64, source_max_fine: u64, target_max_fine: u64) -> u64 {
        let scaled =
            u128::from(fine) * (u128::from(target_max_fine) + 1) / (u128::from(source_max_fine) + 1);
        // fine <= source_max_fine, so the quotient is <= target_max_fine
        scaled as u64
    }
}

fn validate_widths(coarse_bits: u32, fine_bits: u32) -> Result<()> {
    if coarse_bits > MAX_FIELD_BITS {
        return Err(Error::InvalidEncoding(format!(
            "coarse field of {coarse_bits} bits exceeds supported 4-byte width"
        )));
    }
    if fine_bits > MAX_FIELD_BITS {
        return Err(Error::InvalidEncoding(format!(
            "fine field of {fine_bits} bits exceeds supported 4-byte width"
        )));
    }
    Ok(())
}

fn max_value(bits: u32) -> u64 {
    ((1u128 << bits) - 1) as u64
}
