//! Millisecond instants extended with sub-millisecond resolution.
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;

use crate::{Error, Result};

const MAX_NANOS: u32 = 999_999;
/// Total fractional digits available: 3 millisecond digits plus 6 more.
const MAX_PRECISION: u32 = 9;

const YMD_TEMPLATE: &str = "1970-01-01T00:00:00.000";
const DOY_TEMPLATE: &str = "1970-001T00:00:00.000";
const YMD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const DOY_FORMAT: &str = "%Y-%jT%H:%M:%S%.3f";

/// An absolute instant: milliseconds since the Unix epoch plus 0..=999999
/// nanoseconds beyond the millisecond. Used as the Earth-reference (SCET)
/// side of clock correlation.
///
/// Arithmetic granularity is 100 ns; [AccurateTime::roll] rounds its
/// sub-millisecond term to the nearest 100 before applying it.
///
/// A *dummy* value formats as an empty string but otherwise behaves as the
/// zero instant, matching [crate::Sclk] dummy semantics.
#[derive(Clone, Copy, Debug)]
pub struct AccurateTime {
    millis: i64,
    nanos: u32,
    dummy: bool,
}

impl AccurateTime {
    /// # Errors
    /// [Error::OutOfRange] if `nanos` exceeds 999999.
    pub fn new(millis: i64, nanos: u32) -> Result<Self> {
        if nanos > MAX_NANOS {
            return Err(Error::OutOfRange {
                field: "nanoseconds",
                value: i128::from(nanos),
                max: u64::from(MAX_NANOS),
            });
        }
        Ok(AccurateTime {
            millis,
            nanos,
            dummy: false,
        })
    }

    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        AccurateTime {
            millis,
            nanos: 0,
            dummy: false,
        }
    }

    /// A "no value" placeholder that formats as an empty string.
    #[must_use]
    pub fn dummy() -> Self {
        AccurateTime {
            millis: 0,
            nanos: 0,
            dummy: true,
        }
    }

    /// Parse `YYYY-MM-DDThh:mm:ss.sss[uuu[n]]` or
    /// `YYYY-DOYThh:mm:ss.sss[uuu[n]]`.
    ///
    /// A truncated input is padded out from a zero template, so `"2020-045"`
    /// parses as the start of that day. Up to six digits may follow the
    /// milliseconds; shorter suffixes are zero-extended on the right.
    ///
    /// # Errors
    /// [Error::ParseError] for a malformed date/time or a sub-millisecond
    /// suffix longer than six digits.
    pub fn parse(text: &str) -> Result<Self> {
        if !text.is_ascii() {
            return Err(parse_error(text, "not an ISO or day-of-year date/time"));
        }
        let filled = fill_out_time_string(text);

        let (base, base_len) = parse_base(&filled)
            .ok_or_else(|| parse_error(text, "not an ISO or day-of-year date/time"))?;
        let millis = base.and_utc().timestamp_millis();

        let suffix = &filled[base_len..];
        if suffix.is_empty() {
            return Ok(AccurateTime {
                millis,
                nanos: 0,
                dummy: false,
            });
        }
        if suffix.len() > 6 {
            return Err(parse_error(
                text,
                "exceeds supported resolution of 999999 nanoseconds",
            ));
        }
        let nanos: u32 = format!("{suffix:0<6}")
            .parse()
            .map_err(|_| parse_error(text, "bad sub-millisecond digits"))?;
        Self::new(millis, nanos).map_err(|e| parse_error(text, &e.to_string()))
    }

    #[must_use]
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Nanoseconds beyond the millisecond, 0..=999999.
    #[must_use]
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// The sub-millisecond part as whole microseconds, truncating.
    #[must_use]
    pub fn micros(&self) -> u32 {
        self.nanos / 1000
    }

    /// The sub-millisecond part as tenths of microseconds, truncating.
    #[must_use]
    pub fn micro_tenths(&self) -> u32 {
        self.nanos / 100
    }

    /// Milliseconds with the sub-millisecond part rounded half-up.
    #[must_use]
    pub fn rounded_millis(&self) -> i64 {
        if self.nanos >= 500_000 {
            self.millis + 1
        } else {
            self.millis
        }
    }

    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    #[must_use]
    pub fn before(&self, other: &AccurateTime) -> bool {
        self < other
    }

    #[must_use]
    pub fn after(&self, other: &AccurateTime) -> bool {
        self > other
    }

    /// Add or subtract a term of milliseconds plus sub-millisecond
    /// nanoseconds. The nanosecond term is first rounded to the nearest
    /// 100, the supported granularity.
    ///
    /// # Errors
    /// [Error::OutOfRange] if the nanosecond term exceeds 999999,
    /// [Error::NegativeOperand] for a negative millisecond term, and
    /// [Error::Underflow] if a subtraction term exceeds this value.
    pub fn roll(&self, term_millis: i64, term_nanos: i64, is_add: bool) -> Result<Self> {
        if !(0..=i64::from(MAX_NANOS)).contains(&term_nanos) {
            return Err(Error::OutOfRange {
                field: "nanosecond term",
                value: i128::from(term_nanos),
                max: u64::from(MAX_NANOS),
            });
        }
        if term_millis < 0 {
            return Err(Error::NegativeOperand {
                field: "millisecond term",
                value: term_millis,
            });
        }

        let (term_millis, term_nanos) = round_to_hundred_nanos(term_millis, term_nanos);
        let mut millis = self.millis;
        let mut nanos = i64::from(self.nanos);

        if is_add {
            nanos += term_nanos;
            // both terms honor the 100 ns granularity, so crossing 999900
            // means a whole extra millisecond
            if nanos > 999_900 {
                millis += 1;
                nanos -= 1_000_000;
            }
            millis += term_millis;
        } else {
            if term_millis > millis || (term_millis == millis && term_nanos > nanos) {
                return Err(Error::Underflow);
            }
            if term_nanos > nanos {
                millis -= 1;
                nanos += 1_000_000;
            }
            nanos -= term_nanos;
            millis -= term_millis;
        }

        let nanos = u32::try_from(nanos).map_err(|_| Error::OutOfRange {
            field: "nanoseconds",
            value: i128::from(nanos),
            max: u64::from(MAX_NANOS),
        })?;
        Self::new(millis, nanos)
    }

    /// This instant as seconds, exact.
    ///
    /// `millis/1000` when there is no sub-millisecond part, otherwise
    /// `(millis*10^6 + nanos)/10^9`, both as decimal arithmetic; binary
    /// floating point would drift over multi-decade spans.
    #[must_use]
    pub fn as_fractional_seconds(&self) -> Decimal {
        if self.nanos == 0 {
            return Decimal::new(self.millis, 3);
        }
        // any i64 millisecond count scaled to nanoseconds fits the 96-bit
        // decimal mantissa
        let total_ns = i128::from(self.millis) * 1_000_000 + i128::from(self.nanos);
        Decimal::from_i128_with_scale(total_ns, 9)
    }

    /// Format as `YYYY-MM-DDThh:mm:ss.sss` extended to `precision` total
    /// fractional digits (3..=9).
    ///
    /// Extended digits are truncated from the nanosecond count, never
    /// rounded; precision 3 does not consult the sub-millisecond part at
    /// all, so nanoseconds never round into the displayed milliseconds.
    #[must_use]
    pub fn format_ymd(&self, precision: u32, suppress_trailing_zeros: bool) -> String {
        self.format_with(YMD_FORMAT, precision, suppress_trailing_zeros)
    }

    /// Format as `YYYY-DOYThh:mm:ss.sss`, extended as in
    /// [AccurateTime::format_ymd].
    #[must_use]
    pub fn format_doy(&self, precision: u32, suppress_trailing_zeros: bool) -> String {
        self.format_with(DOY_FORMAT, precision, suppress_trailing_zeros)
    }

    fn format_with(&self, pattern: &str, precision: u32, suppress_trailing_zeros: bool) -> String {
        if self.dummy {
            return String::new();
        }
        let calendar = DateTime::from_timestamp_millis(self.millis).unwrap_or(DateTime::UNIX_EPOCH);
        let base = calendar.format(pattern).to_string();
        if precision <= 3 {
            return base;
        }
        let precision = precision.min(MAX_PRECISION);

        let mut jnano = u64::from(self.nanos);
        for _ in precision..MAX_PRECISION {
            jnano /= 10;
        }
        if jnano == 0 && suppress_trailing_zeros {
            return base;
        }

        let width = (precision - 3) as usize;
        let mut ext = format!("{jnano:0width$}");
        if suppress_trailing_zeros {
            while ext.ends_with('0') {
                ext.pop();
            }
        }
        base + &ext
    }
}

impl fmt::Display for AccurateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_ymd(MAX_PRECISION, true))
    }
}

impl PartialEq for AccurateTime {
    fn eq(&self, other: &Self) -> bool {
        (self.millis, self.nanos) == (other.millis, other.nanos)
    }
}

impl Eq for AccurateTime {}

impl PartialOrd for AccurateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccurateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.millis, self.nanos).cmp(&(other.millis, other.nanos))
    }
}

/// Extend a truncated time string out to its template's full pattern. The
/// year-month-day form is recognized by its second dash.
fn fill_out_time_string(orig: &str) -> String {
    let template = if orig.find('-') != orig.rfind('-') {
        YMD_TEMPLATE
    } else {
        DOY_TEMPLATE
    };
    if template.len() <= orig.len() {
        orig.to_string()
    } else {
        format!("{orig}{}", &template[orig.len()..])
    }
}

fn parse_base(filled: &str) -> Option<(NaiveDateTime, usize)> {
    let ymd_len = YMD_TEMPLATE.len().min(filled.len());
    if let Ok(dt) = NaiveDateTime::parse_from_str(&filled[..ymd_len], YMD_FORMAT) {
        return Some((dt, ymd_len));
    }
    let doy_len = DOY_TEMPLATE.len().min(filled.len());
    NaiveDateTime::parse_from_str(&filled[..doy_len], DOY_FORMAT)
        .ok()
        .map(|dt| (dt, doy_len))
}

/// Round a nanosecond term to the nearest 100, carrying into milliseconds
/// when the round-up crosses the millisecond.
fn round_to_hundred_nanos(millis: i64, nanos: i64) -> (i64, i64) {
    let rem = nanos % 100;
    if rem == 0 {
        return (millis, nanos);
    }
    if rem < 50 {
        (millis, nanos - rem)
    } else {
        let n = nanos + (100 - rem);
        if n >= 1_000_000 {
            (millis + 1, n - 1_000_000)
        } else {
            (millis, n)
        }
    }
}

fn parse_error(text: &str, reason: &str) -> Error {
    Error::ParseError {
        value: text.to_string(),
        reason: reason.to_string(),
    }
}
