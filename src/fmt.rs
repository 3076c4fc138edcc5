//! SCLK string formatting and parsing.
use regex::Regex;

use crate::encoding::CoarseFineEncoding;
use crate::sclk::Sclk;
use crate::{Error, Result};

const DEFAULT_TICKS_SEP: &str = "-";
const DEFAULT_DECIMAL_SEP: &str = ".";

/// Renders and parses clock values in two textual forms: the ticks form
/// `COARSE-FINE` and the decimal form `COARSE.FRACTION`.
///
/// Both fields are zero-padded to the decimal digit counts of the
/// encoding's moduli, so all values of one clock render at a fixed width.
/// A dummy value renders as the empty string in every form.
#[derive(Clone, Debug)]
pub struct SclkFormatter {
    encoding: CoarseFineEncoding,
    ticks_sep: String,
    decimal_sep: String,
    use_fractional: bool,
    max_coarse_digits: usize,
    max_fine_digits: usize,
    pattern: Regex,
}

impl SclkFormatter {
    /// A formatter with the standard `-` ticks and `.` decimal separators,
    /// defaulting to the ticks form.
    #[must_use]
    pub fn new(encoding: CoarseFineEncoding) -> Self {
        Self::with_separators(encoding, DEFAULT_TICKS_SEP, DEFAULT_DECIMAL_SEP, false)
    }

    /// A formatter with mission-specific separators. `use_fractional`
    /// selects the decimal form as the default for [SclkFormatter::format].
    #[must_use]
    pub fn with_separators(
        encoding: CoarseFineEncoding,
        ticks_sep: &str,
        decimal_sep: &str,
        use_fractional: bool,
    ) -> Self {
        let pattern = Regex::new(&format!(
            r"^\d+(?:(?:{}|{})\d+)?$",
            regex::escape(ticks_sep),
            regex::escape(decimal_sep),
        ))
        .expect("separator pattern to compile");
        SclkFormatter {
            max_coarse_digits: digits(encoding.max_coarse()),
            max_fine_digits: digits(encoding.max_fine()),
            encoding,
            ticks_sep: ticks_sep.to_string(),
            decimal_sep: decimal_sep.to_string(),
            use_fractional,
            pattern,
        }
    }

    #[must_use]
    pub fn encoding(&self) -> &CoarseFineEncoding {
        &self.encoding
    }

    /// Render in the configured default form.
    #[must_use]
    pub fn format(&self, sclk: &Sclk) -> String {
        if self.use_fractional {
            self.to_decimal_string(sclk)
        } else {
            self.to_ticks_string(sclk)
        }
    }

    /// Render as zero-padded `COARSE-FINE` ticks.
    #[must_use]
    pub fn to_ticks_string(&self, sclk: &Sclk) -> String {
        if sclk.is_dummy() {
            return String::new();
        }
        format!(
            "{:0cw$}{}{:0fw$}",
            sclk.coarse(),
            self.ticks_sep,
            sclk.fine(),
            cw = self.max_coarse_digits,
            fw = self.max_fine_digits,
        )
    }

    /// Render as `COARSE.FRACTION` with the fine count scaled to a decimal
    /// fraction of `max_fine_digits` digits.
    ///
    /// A fraction that rounds up past the digit width falls back to
    /// truncation rather than carrying into the coarse field.
    #[must_use]
    pub fn to_decimal_string(&self, sclk: &Sclk) -> String {
        if sclk.is_dummy() {
            return String::new();
        }
        let scale = 10u64.pow(self.max_fine_digits as u32);
        let ratio = sclk.fine() as f64 / (self.encoding.max_fine() as f64 + 1.0);
        let mut fraction = (ratio * scale as f64).round() as u64;
        if fraction >= scale {
            fraction = (ratio * scale as f64).trunc() as u64;
        }
        format!(
            "{:0cw$}{}{:0fw$}",
            sclk.coarse(),
            self.decimal_sep,
            fraction,
            cw = self.max_coarse_digits,
            fw = self.max_fine_digits,
        )
    }

    /// True if `text` is syntactically a clock value for this formatter,
    /// without regard to numeric range.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Parse either textual form back into a value.
    ///
    /// The separator present selects the interpretation; a bare integer is
    /// a coarse count.
    ///
    /// # Errors
    /// [Error::ParseError] if `text` does not match the expected pattern or
    /// embeds a value exceeding the target moduli.
    pub fn parse(&self, text: &str) -> Result<Sclk> {
        if !self.pattern.is_match(text) {
            return Err(parse_error(text, "expected COARSE, COARSE-FINE, or COARSE.FRACTION"));
        }
        if let Some((coarse, fine)) = text.split_once(&self.ticks_sep) {
            let coarse = self.parse_coarse(text, coarse)?;
            let fine: u64 = fine
                .parse()
                .map_err(|_| parse_error(text, "fine count too large"))?;
            if fine > self.encoding.max_fine() {
                return Err(parse_error(text, "fine count exceeds modulus"));
            }
            return Sclk::new(coarse, fine, self.encoding.clone())
                .map_err(|e| parse_error(text, &e.to_string()));
        }
        if let Some((coarse, fraction)) = text.split_once(&self.decimal_sep) {
            let coarse = self.parse_coarse(text, coarse)?;
            let fraction: f64 = format!("0.{fraction}")
                .parse()
                .map_err(|_| parse_error(text, "bad fractional part"))?;
            let fine = (fraction * (self.encoding.max_fine() as f64 + 1.0)).round() as u64;
            if fine > self.encoding.max_fine() {
                return Err(parse_error(text, "fraction rounds past the fine modulus"));
            }
            return Sclk::new(coarse, fine, self.encoding.clone())
                .map_err(|e| parse_error(text, &e.to_string()));
        }
        let coarse = self.parse_coarse(text, text)?;
        Sclk::new(coarse, 0, self.encoding.clone()).map_err(|e| parse_error(text, &e.to_string()))
    }

    fn parse_coarse(&self, text: &str, part: &str) -> Result<u64> {
        let coarse: u64 = part
            .parse()
            .map_err(|_| parse_error(text, "coarse count too large"))?;
        if coarse > self.encoding.max_coarse() {
            return Err(parse_error(text, "coarse count exceeds modulus"));
        }
        Ok(coarse)
    }
}

fn parse_error(text: &str, reason: &str) -> Error {
    Error::ParseError {
        value: text.to_string(),
        reason: reason.to_string(),
    }
}

fn digits(v: u64) -> usize {
    (v.checked_ilog10().unwrap_or(0) + 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fmt(coarse_bits: u32, fine_bits: u32) -> SclkFormatter {
        SclkFormatter::new(CoarseFineEncoding::new(coarse_bits, fine_bits).unwrap())
    }

    #[test]
    fn ticks_string_is_zero_padded() {
        let fmt = fmt(32, 16);
        let sclk = Sclk::new(100, 65535, fmt.encoding().clone()).unwrap();
        assert_eq!(fmt.to_ticks_string(&sclk), "0000000100-65535");
    }

    #[test]
    fn decimal_string_scales_fine() {
        let fmt = fmt(32, 8);
        let sclk = Sclk::new(100, 128, fmt.encoding().clone()).unwrap();
        // 128/256 over 3 digits
        assert_eq!(fmt.to_decimal_string(&sclk), "0000000100.500");
    }

    #[test]
    fn decimal_string_top_of_modulus_stays_in_width() {
        // 65535/65536 scaled to 5 digits: 99998.47 rounds within the width
        let fmt = fmt(32, 16);
        let sclk = Sclk::new(7, 65535, fmt.encoding().clone()).unwrap();
        assert_eq!(fmt.to_decimal_string(&sclk), "0000000007.99998");
    }

    #[test]
    fn format_honors_fractional_default() {
        let encoding = CoarseFineEncoding::new(32, 8).unwrap();
        let fmt = SclkFormatter::with_separators(encoding.clone(), "-", ".", true);
        let sclk = Sclk::new(1, 64, encoding).unwrap();
        assert_eq!(fmt.format(&sclk), "0000000001.250");
    }

    #[test]
    fn dummy_formats_empty_in_every_form() {
        let fmt = fmt(32, 16);
        let dummy = Sclk::dummy(fmt.encoding().clone());
        assert_eq!(fmt.to_ticks_string(&dummy), "");
        assert_eq!(fmt.to_decimal_string(&dummy), "");
        assert_eq!(fmt.format(&dummy), "");
    }

    #[test]
    fn parse_round_trips_ticks_form() {
        let fmt = fmt(32, 16);
        for (c, f) in [(0u64, 0u64), (100, 65535), (4294967295, 1)] {
            let sclk = Sclk::new(c, f, fmt.encoding().clone()).unwrap();
            assert_eq!(fmt.parse(&fmt.to_ticks_string(&sclk)).unwrap(), sclk);
        }
    }

    #[test]
    fn parse_decimal_form() {
        let fmt = fmt(32, 8);
        let sclk = fmt.parse("100.500").unwrap();
        assert_eq!((sclk.coarse(), sclk.fine()), (100, 128));
    }

    #[test]
    fn parse_bare_coarse() {
        let fmt = fmt(32, 16);
        let sclk = fmt.parse("12345").unwrap();
        assert_eq!((sclk.coarse(), sclk.fine()), (12345, 0));
    }

    #[test_case(""; "empty")]
    #[test_case("abc"; "letters")]
    #[test_case("1-2-3"; "double separator")]
    #[test_case("1-"; "missing fine")]
    #[test_case("-5"; "missing coarse")]
    #[test_case("1 5"; "unknown separator")]
    fn parse_rejects_malformed(text: &str) {
        let fmt = fmt(32, 16);
        assert!(!fmt.matches(text));
        assert!(matches!(fmt.parse(text), Err(Error::ParseError { .. })));
    }

    #[test]
    fn parse_rejects_out_of_range() {
        let fmt = fmt(32, 8);
        assert!(matches!(fmt.parse("1-256"), Err(Error::ParseError { .. })));
        assert!(matches!(
            fmt.parse("4294967296-0"),
            Err(Error::ParseError { .. })
        ));
    }

    #[test]
    fn matches_is_syntax_only() {
        let fmt = fmt(32, 8);
        // in range syntactically, out of range numerically
        assert!(fmt.matches("1-999"));
        assert!(fmt.parse("1-999").is_err());
    }

    #[test]
    fn custom_separators() {
        let encoding = CoarseFineEncoding::new(32, 8).unwrap();
        let fmt = SclkFormatter::with_separators(encoding.clone(), ".", ",", false);
        let sclk = Sclk::new(9, 5, encoding).unwrap();
        assert_eq!(fmt.to_ticks_string(&sclk), "0000000009.005");
        assert_eq!(fmt.parse("0000000009.005").unwrap(), sclk);
    }
}
