use crate::encoding::CoarseFineEncoding;
use crate::sclk::{read_unsigned_be, Sclk};
use crate::{Error, Result};

use super::{check_bytes, SclkExtractor};

/// Extracts directly-encoded coarse and fine fields.
///
/// The source layout may differ from the target encoding, e.g. when decoding
/// a third-party clock format into the mission's canonical modulus: the fine
/// count is rescaled from the source modulus onto the target's.
#[derive(Clone, Debug)]
pub struct CoarseFineExtractor {
    source: CoarseFineEncoding,
    target: CoarseFineEncoding,
}

impl CoarseFineExtractor {
    /// An extractor whose source layout is the target encoding itself.
    #[must_use]
    pub fn new(target: CoarseFineEncoding) -> Self {
        CoarseFineExtractor {
            source: target.clone(),
            target,
        }
    }

    /// An extractor decoding `source`-laid-out fields into `target`.
    #[must_use]
    pub fn with_source(source: CoarseFineEncoding, target: CoarseFineEncoding) -> Self {
        CoarseFineExtractor { source, target }
    }
}

impl SclkExtractor for CoarseFineExtractor {
    fn extract(&self, buf: &[u8], offset: usize) -> Result<Sclk> {
        check_bytes(buf, offset, self.source.byte_len())?;

        // bits above the declared field width are not part of the value
        let coarse =
            read_unsigned_be(buf, offset, self.source.coarse_byte_len()) & self.source.max_coarse();
        let fine = read_unsigned_be(
            buf,
            offset + self.source.coarse_byte_len(),
            self.source.fine_byte_len(),
        ) & max_field_value(self.source.fine_bits());

        if fine > self.source.max_fine() {
            return Err(Error::OutOfRange {
                field: "fine",
                value: i128::from(fine),
                max: self.source.max_fine(),
            });
        }
        let fine = if self.source.max_fine() == self.target.max_fine() {
            fine
        } else {
            CoarseFineEncoding::normalize_fine(fine, self.source.max_fine(), self.target.max_fine())
        };
        Sclk::decoded(coarse, fine, self.target.clone(), self.source.bit_len())
    }

    fn has_enough_bytes(&self, buf: &[u8], offset: usize) -> bool {
        buf.len() >= offset + self.source.byte_len()
    }
}

fn max_field_value(bits: u32) -> u64 {
    ((1u128 << bits) - 1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(coarse_bits: u32, fine_bits: u32) -> CoarseFineEncoding {
        CoarseFineEncoding::new(coarse_bits, fine_bits).unwrap()
    }

    #[test]
    fn extracts_canonical_layout() {
        let ex = CoarseFineExtractor::new(enc(32, 16));
        let buf = hex::decode("00000064ffff").unwrap();
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!((sclk.coarse(), sclk.fine()), (100, 65535));
        assert_eq!(sclk.byte_len(), 6);
    }

    #[test]
    fn rescales_source_modulus_onto_target() {
        // source counts 0..=999 in 10 bits, target is 8-bit binary fine
        let source = CoarseFineEncoding::with_fine_modulus(32, 10, 999).unwrap();
        let ex = CoarseFineExtractor::with_source(source, enc(32, 8));
        let mut buf = 7u32.to_be_bytes().to_vec();
        buf.extend(500u16.to_be_bytes());
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!((sclk.coarse(), sclk.fine()), (7, 128));
        // the decoded value reports the source width, not the target's
        assert_eq!(sclk.byte_len(), 6);
    }

    #[test]
    fn rejects_fine_beyond_source_modulus() {
        let source = CoarseFineEncoding::with_fine_modulus(32, 10, 999).unwrap();
        let ex = CoarseFineExtractor::with_source(source, enc(32, 8));
        let mut buf = 7u32.to_be_bytes().to_vec();
        buf.extend(1001u16.to_be_bytes());
        assert!(matches!(
            ex.extract(&buf, 0),
            Err(Error::OutOfRange { field: "fine", .. })
        ));
    }

    #[test]
    fn masks_stray_bits_above_field_width() {
        // 17 coarse bits in 3 bytes; the top 7 bits of the field are padding
        let ex = CoarseFineExtractor::new(enc(17, 8));
        let buf = [0xfe, 0x00, 0x05, 0x80];
        let sclk = ex.extract(&buf, 0).unwrap();
        assert_eq!(sclk.coarse(), 0xfe0005 & 0x1ffff);
        assert_eq!(sclk.fine(), 0x80);
    }

    #[test]
    fn short_buffer() {
        let ex = CoarseFineExtractor::new(enc(32, 16));
        assert!(!ex.has_enough_bytes(&[0u8; 5], 0));
        assert!(matches!(
            ex.extract(&[0u8; 8], 3),
            Err(Error::BufferTooShort {
                offset: 3,
                needed: 6,
                available: 5
            })
        ));
    }
}
