use crate::encoding::CoarseFineEncoding;
use crate::sclk::Sclk;
use crate::{Error, Result};

use super::{check_bytes, read_bits, SclkExtractor};

/// GPS week numbers roll over on a 12-bit counter; no attempt is made to
/// disambiguate the absolute week.
const GPS_WEEK_MASK: u64 = 0x0fff;
const SECONDS_PER_WEEK: u64 = 604_800;

/// Extracts GPS-style week / seconds-of-week / subseconds fields.
///
/// The three fields are adjacent MSB-first bit fields; they need not be
/// byte aligned. Weeks fold into the coarse count at 604800 seconds per
/// week, and subseconds rescale from their own power-of-two modulus onto
/// the target fine modulus.
#[derive(Clone, Debug)]
pub struct GpsTimeExtractor {
    target: CoarseFineEncoding,
    week_bits: u32,
    second_bits: u32,
    subsecond_bits: u32,
}

impl GpsTimeExtractor {
    /// # Errors
    /// [Error::InvalidConfiguration] if any field is wider than 32 bits or
    /// the week and second fields are absent.
    pub fn new(
        target: CoarseFineEncoding,
        week_bits: u32,
        second_bits: u32,
        subsecond_bits: u32,
    ) -> Result<Self> {
        if week_bits == 0 || second_bits == 0 {
            return Err(Error::InvalidConfiguration(
                "GPS time needs week and second fields".to_string(),
            ));
        }
        if week_bits > 32 || second_bits > 32 || subsecond_bits > 32 {
            return Err(Error::InvalidConfiguration(format!(
                "GPS fields {week_bits}/{second_bits}/{subsecond_bits} exceed 32 bits"
            )));
        }
        Ok(GpsTimeExtractor {
            target,
            week_bits,
            second_bits,
            subsecond_bits,
        })
    }

    fn bit_len(&self) -> u32 {
        self.week_bits + self.second_bits + self.subsecond_bits
    }
}

impl SclkExtractor for GpsTimeExtractor {
    fn extract(&self, buf: &[u8], offset: usize) -> Result<Sclk> {
        check_bytes(buf, offset, self.bit_len().div_ceil(8) as usize)?;

        let bit = offset * 8;
        let weeks = read_bits(buf, bit, self.week_bits);
        let seconds = read_bits(buf, bit + self.week_bits as usize, self.second_bits);
        let subseconds = if self.subsecond_bits == 0 {
            0
        } else {
            read_bits(
                buf,
                bit + (self.week_bits + self.second_bits) as usize,
                self.subsecond_bits,
            )
        };

        let coarse = seconds + (weeks & GPS_WEEK_MASK) * SECONDS_PER_WEEK;
        let source_max_fine = (1u64 << self.subsecond_bits) - 1;
        let fine = CoarseFineEncoding::normalize_fine(
            subseconds,
            source_max_fine,
            self.target.max_fine(),
        );
        Sclk::decoded(coarse, fine, self.target.clone(), self.bit_len())
    }

    fn has_enough_bytes(&self, buf: &[u8], offset: usize) -> bool {
        buf.len() >= offset + self.bit_len().div_ceil(8) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> CoarseFineEncoding {
        CoarseFineEncoding::new(32, 8).unwrap()
    }

    /// Pack week/second/subsecond MSB-first and left-align to whole bytes.
    fn pack(week: u64, second: u64, subsecond: u64, widths: (u32, u32, u32)) -> Vec<u8> {
        let (wb, sb, ssb) = widths;
        let total = wb + sb + ssb;
        let value = week << (sb + ssb) | second << ssb | subsecond;
        let pad = total.div_ceil(8) * 8 - total;
        let bytes = (value << pad).to_be_bytes();
        bytes[8 - total.div_ceil(8) as usize..].to_vec()
    }

    #[test]
    fn folds_weeks_into_coarse_and_rescales_subseconds() {
        let ex = GpsTimeExtractor::new(target(), 10, 20, 4).unwrap();
        let buf = pack(5, 100, 8, (10, 20, 4));
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!(sclk.coarse(), 100 + 5 * 604_800);
        assert_eq!(sclk.fine(), 128);
        assert_eq!(sclk.byte_len(), 5);
    }

    #[test]
    fn applies_week_rollover_mask() {
        // a 16-bit week field still folds modulo the 12-bit GPS rollover
        let ex = GpsTimeExtractor::new(target(), 16, 20, 0).unwrap();
        let buf = pack(0x1002, 7, 0, (16, 20, 0));
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!(sclk.coarse(), 7 + 2 * 604_800);
    }

    #[test]
    fn no_subsecond_field() {
        let ex = GpsTimeExtractor::new(target(), 10, 20, 0).unwrap();
        let buf = pack(1, 9, 0, (10, 20, 0));
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!((sclk.coarse(), sclk.fine()), (604_809, 0));
    }

    #[test]
    fn short_buffer() {
        let ex = GpsTimeExtractor::new(target(), 10, 20, 4).unwrap();
        assert!(!ex.has_enough_bytes(&[0u8; 4], 0));
        assert!(matches!(
            ex.extract(&[0u8; 4], 0),
            Err(Error::BufferTooShort { needed: 5, .. })
        ));
    }

    #[test]
    fn rejects_invalid_widths() {
        assert!(matches!(
            GpsTimeExtractor::new(target(), 0, 20, 4),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            GpsTimeExtractor::new(target(), 33, 20, 4),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
