use crate::encoding::CoarseFineEncoding;
use crate::sclk::Sclk;
use crate::{Error, Result};

use super::{check_bytes, read_bits, SclkExtractor};

/// Extracts a flat count of sub-coarse ticks.
///
/// The source is a single unsigned field counting ticks at
/// `ticks_per_coarse` per coarse unit, e.g. a 48-bit microsecond counter
/// with one million ticks per second. The count splits into whole coarse
/// units plus a remainder rescaled onto the target fine modulus.
#[derive(Clone, Debug)]
pub struct FineTimeExtractor {
    bits: u32,
    ticks_per_coarse: u64,
    target: CoarseFineEncoding,
}

impl FineTimeExtractor {
    /// # Errors
    /// [Error::InvalidConfiguration] for a zero-width or wider-than-64-bit
    /// field, or a zero tick modulus.
    pub fn new(bits: u32, ticks_per_coarse: u64, target: CoarseFineEncoding) -> Result<Self> {
        if bits == 0 || bits > 64 {
            return Err(Error::InvalidConfiguration(format!(
                "fine time field of {bits} bits is unsupported"
            )));
        }
        if ticks_per_coarse == 0 {
            return Err(Error::InvalidConfiguration(
                "fine time modulus must be nonzero".to_string(),
            ));
        }
        Ok(FineTimeExtractor {
            bits,
            ticks_per_coarse,
            target,
        })
    }
}

impl SclkExtractor for FineTimeExtractor {
    fn extract(&self, buf: &[u8], offset: usize) -> Result<Sclk> {
        check_bytes(buf, offset, self.bits.div_ceil(8) as usize)?;

        let ticks = read_bits(buf, offset * 8, self.bits);
        let coarse = ticks / self.ticks_per_coarse;
        let fine = CoarseFineEncoding::normalize_fine(
            ticks % self.ticks_per_coarse,
            self.ticks_per_coarse - 1,
            self.target.max_fine(),
        );
        Sclk::decoded(coarse, fine, self.target.clone(), self.bits)
    }

    fn has_enough_bytes(&self, buf: &[u8], offset: usize) -> bool {
        buf.len() >= offset + self.bits.div_ceil(8) as usize
    }
}
