use crate::encoding::CoarseFineEncoding;
use crate::sclk::Sclk;
use crate::{Error, Result};

use super::{check_bytes, SclkExtractor};

/// Extracts a big-endian IEEE floating-point seconds value.
///
/// Only single (4-byte) and double (8-byte) widths exist; anything else is
/// rejected at construction. The fractional part rounds onto the target
/// fine modulus.
#[derive(Clone, Debug)]
pub struct FloatTimeExtractor {
    byte_len: usize,
    target: CoarseFineEncoding,
}

impl FloatTimeExtractor {
    /// # Errors
    /// [Error::InvalidConfiguration] if `byte_len` is not 4 or 8.
    pub fn new(byte_len: usize, target: CoarseFineEncoding) -> Result<Self> {
        if byte_len != 4 && byte_len != 8 {
            return Err(Error::InvalidConfiguration(format!(
                "float time must be 4 or 8 bytes, not {byte_len}"
            )));
        }
        Ok(FloatTimeExtractor { byte_len, target })
    }
}

impl SclkExtractor for FloatTimeExtractor {
    fn extract(&self, buf: &[u8], offset: usize) -> Result<Sclk> {
        check_bytes(buf, offset, self.byte_len)?;

        let secs = match self.byte_len {
            4 => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&buf[offset..offset + 4]);
                f64::from(f32::from_be_bytes(bytes))
            }
            _ => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&buf[offset..offset + 8]);
                f64::from_be_bytes(bytes)
            }
        };
        let sclk = Sclk::from_float_seconds(secs, self.target.clone())?;
        Ok(sclk.with_original_bit_len(self.byte_len as u32 * 8))
    }

    fn has_enough_bytes(&self, buf: &[u8], offset: usize) -> bool {
        buf.len() >= offset + self.byte_len
    }
}
