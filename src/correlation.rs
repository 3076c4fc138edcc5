//! Table-driven SCLK/SCET correlation.
//!
//! A correlation table is an ordered sequence of points pairing a spacecraft
//! clock reading with the Earth-reference instant (SCET) it occurred at,
//! plus the local clock rate for extrapolation beyond the table. Conversion
//! interpolates linearly between the bounding points, or extrapolates from
//! the nearest end using that entry's rate.
//!
//! A table assumes no clock resets: across a reset the caller must supply a
//! different table, selected by earth receive time. Tables are never mutated
//! after load; new calibration data means publishing a new converter.
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::accurate::AccurateTime;
use crate::sclk::Sclk;
use crate::{Error, Result};

/// One correlation point.
#[derive(Clone, Debug)]
pub struct SclkScetEntry {
    pub sclk: Sclk,
    pub scet: AccurateTime,
    /// Accumulated leap-second offset (UTC minus ephemeris time) at this
    /// entry, in seconds.
    pub dut: f64,
    /// Seconds of absolute time per SCLK tick.
    pub sclk_rate: f64,
}

impl SclkScetEntry {
    #[must_use]
    pub fn new(sclk: Sclk, scet: AccurateTime, dut: f64, sclk_rate: f64) -> Self {
        SclkScetEntry {
            sclk,
            scet,
            dut,
            sclk_rate,
        }
    }
}

/// Bidirectional SCLK/SCET converter over one spacecraft's correlation
/// table.
///
/// Entries must be strictly increasing in both SCLK and SCET. The converter
/// is read-only after construction and safe for concurrent use.
///
/// The SCET→SCLK direction runs in decimal arithmetic end to end. The
/// SCLK→SCET direction computes its millisecond offset in `f64`; changing
/// it to decimal would change produced SCETs and needs a compatibility
/// review first.
pub struct SclkScetConverter {
    table: Vec<SclkScetEntry>,
    extended_scet: bool,
}

impl SclkScetConverter {
    #[must_use]
    pub fn new(table: Vec<SclkScetEntry>) -> Self {
        debug!(
            "loaded SCLK/SCET correlation table with {} entries",
            table.len()
        );
        SclkScetConverter {
            table,
            extended_scet: true,
        }
    }

    /// Select sub-millisecond SCET interpolation (the default) or rounding
    /// to whole milliseconds.
    #[must_use]
    pub fn with_extended_scet(mut self, extended: bool) -> Self {
        self.extended_scet = extended;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[SclkScetEntry] {
        &self.table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Convert an Earth-reference instant to the spacecraft clock reading.
    ///
    /// All fractional-second arithmetic on this path is decimal; binary
    /// floating point loses tick-level precision once the table spans
    /// years.
    ///
    /// # Errors
    /// [Error::CorrelationUnavailable] for an empty table;
    /// [Error::InvalidConfiguration] for degenerate entries (zero rate or
    /// coincident SCETs); [Error::Underflow] if the result precedes clock
    /// zero.
    pub fn to_sclk(&self, scet: &AccurateTime) -> Result<Sclk> {
        if self.table.is_empty() {
            return Err(Error::CorrelationUnavailable);
        }

        // first entry strictly past the query; the query falls between
        // ind-1 and ind, or off either end
        let ind = self
            .table
            .iter()
            .position(|e| scet < &e.scet)
            .unwrap_or(self.table.len());

        if ind == 0 {
            let first = &self.table[0];
            trace!("SCET precedes correlation table, extrapolating from {}", first.scet);
            let secs_before = first.scet.as_fractional_seconds() - scet.as_fractional_seconds();
            let ticks = exact_div(secs_before, decimal_rate(first.sclk_rate)?, "SCLK rate")?;
            apply_ticks(&first.sclk, ticks, false)
        } else {
            let lower = &self.table[ind - 1];
            let ticks = if ind == self.table.len() {
                trace!("SCET past correlation table, extrapolating from {}", lower.scet);
                let secs_past = scet.as_fractional_seconds() - lower.scet.as_fractional_seconds();
                exact_div(secs_past, decimal_rate(lower.sclk_rate)?, "SCLK rate")?
            } else {
                let upper = &self.table[ind];
                let bin_width =
                    upper.scet.as_fractional_seconds() - lower.scet.as_fractional_seconds();
                let difference =
                    scet.as_fractional_seconds() - lower.scet.as_fractional_seconds();
                let ratio = exact_div(difference, bin_width, "SCET bin width")?;
                // the clock bin width is formed in double precision before
                // widening to decimal
                let width =
                    upper.sclk.floating_point_seconds() - lower.sclk.floating_point_seconds();
                let sclk_bin_width = Decimal::from_f64(width).ok_or_else(|| {
                    Error::InvalidConfiguration(format!("non-finite SCLK bin width {width}"))
                })?;
                ratio.checked_mul(sclk_bin_width).ok_or(Error::Overflow)?
            };
            apply_ticks(&lower.sclk, ticks, true)
        }
    }

    /// Convert a spacecraft clock reading to the Earth-reference instant.
    ///
    /// # Errors
    /// [Error::CorrelationUnavailable] for an empty table;
    /// [Error::InvalidConfiguration] for degenerate entries.
    pub fn to_scet(&self, sclk: &Sclk) -> Result<AccurateTime> {
        if self.table.is_empty() {
            return Err(Error::CorrelationUnavailable);
        }

        let ind = self
            .table
            .iter()
            .position(|e| sclk < &e.sclk)
            .unwrap_or(self.table.len());

        let (base, msecs_offset) = if ind == 0 {
            let first = &self.table[0];
            trace!("SCLK precedes correlation table, extrapolating backward");
            let secs_before =
                first.sclk.floating_point_seconds() - sclk.floating_point_seconds();
            (first.scet, -(secs_before * first.sclk_rate * 1000.0))
        } else {
            let lower = &self.table[ind - 1];
            if ind == self.table.len() {
                trace!("SCLK past correlation table, extrapolating forward");
                let secs_past =
                    sclk.floating_point_seconds() - lower.sclk.floating_point_seconds();
                (lower.scet, secs_past * lower.sclk_rate * 1000.0)
            } else {
                let upper = &self.table[ind];
                let bin_width =
                    upper.sclk.floating_point_seconds() - lower.sclk.floating_point_seconds();
                if bin_width == 0.0 {
                    return Err(Error::InvalidConfiguration(
                        "correlation entries share a SCLK".to_string(),
                    ));
                }
                let ratio =
                    (sclk.floating_point_seconds() - lower.sclk.floating_point_seconds())
                        / bin_width;
                // SCET bin width in whole milliseconds; entry sub-millisecond
                // parts do not contribute
                let scet_bin_width = (upper.scet.millis() - lower.scet.millis()) as f64;
                (lower.scet, ratio * scet_bin_width)
            }
        };
        self.interpolated_scet(&base, msecs_offset)
    }

    /// The accumulated leap-second offset in effect at `sclk`: a step
    /// function over the table, never interpolated. Zero for an empty
    /// table.
    #[must_use]
    pub fn dut(&self, sclk: &Sclk) -> f64 {
        if self.table.is_empty() {
            return 0.0;
        }
        let ind = self
            .table
            .iter()
            .position(|e| sclk < &e.sclk)
            .unwrap_or(self.table.len());
        if ind == 0 {
            self.table[0].dut
        } else {
            self.table[ind - 1].dut
        }
    }

    /// Offset a SCET by fractional milliseconds. In extended mode the
    /// result is an exact integer count of nanoseconds with a single
    /// half-up rounding; otherwise it rounds to whole milliseconds.
    fn interpolated_scet(&self, scet: &AccurateTime, msecs_offset: f64) -> Result<AccurateTime> {
        if !self.extended_scet {
            let millis = (scet.millis() as f64 + msecs_offset).round() as i64;
            return Ok(AccurateTime::from_millis(millis));
        }

        let offset_ns = Decimal::from_f64(msecs_offset)
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!("non-finite SCET offset {msecs_offset}"))
            })?
            .checked_mul(Decimal::from(1_000_000u64))
            .ok_or(Error::Overflow)?;
        let scet_ns = Decimal::from_i128_with_scale(
            i128::from(scet.millis()) * 1_000_000 + i128::from(scet.nanos()),
            0,
        );
        let total = scet_ns.checked_add(offset_ns).ok_or(Error::Overflow)?;

        let ns = (total + Decimal::new(5, 1))
            .trunc()
            .to_i128()
            .ok_or(Error::Overflow)?;
        let millis = i64::try_from(ns.div_euclid(1_000_000)).map_err(|_| Error::Overflow)?;
        let nanos = ns.rem_euclid(1_000_000) as u32;
        AccurateTime::new(millis, nanos)
    }
}

/// Split fractional ticks into coarse and fine counts on `base`'s fine
/// scale and add or subtract them. The fine part rounds half-up; a round
/// up to the modulus carries into coarse.
fn apply_ticks(base: &Sclk, ticks: Decimal, forward: bool) -> Result<Sclk> {
    let fulp1 = base.encoding().max_fine() + 1;
    let coarse = ticks.trunc().to_i64().ok_or(Error::Overflow)?;
    let fine = (ticks.fract() * Decimal::from(fulp1) + Decimal::new(5, 1))
        .trunc()
        .to_i64()
        .ok_or(Error::Overflow)?;

    let (coarse, fine) = if fine < fulp1 as i64 {
        (coarse, fine)
    } else {
        (coarse + 1, fine - fulp1 as i64)
    };
    if forward {
        base.increment(coarse, fine)
    } else {
        base.decrement(coarse, fine)
    }
}

fn decimal_rate(rate: f64) -> Result<Decimal> {
    Decimal::from_f64(rate)
        .filter(|r| !r.is_zero())
        .ok_or_else(|| Error::InvalidConfiguration(format!("unusable SCLK rate {rate}")))
}

fn exact_div(num: Decimal, den: Decimal, what: &str) -> Result<Decimal> {
    if den.is_zero() {
        return Err(Error::InvalidConfiguration(format!("{what} is zero")));
    }
    num.checked_div(den).ok_or(Error::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CoarseFineEncoding;

    fn enc() -> CoarseFineEncoding {
        CoarseFineEncoding::new(32, 8).unwrap()
    }

    fn sclk(coarse: u64, fine: u64) -> Sclk {
        Sclk::new(coarse, fine, enc()).unwrap()
    }

    fn entry(coarse: u64, scet: &str, rate: f64) -> SclkScetEntry {
        SclkScetEntry::new(
            sclk(coarse, 0),
            AccurateTime::parse(scet).unwrap(),
            64.184,
            rate,
        )
    }

    #[test]
    fn empty_table_is_unavailable() {
        let conv = SclkScetConverter::new(vec![]);
        assert!(matches!(
            conv.to_sclk(&AccurateTime::from_millis(0)),
            Err(Error::CorrelationUnavailable)
        ));
        assert!(matches!(
            conv.to_scet(&sclk(0, 0)),
            Err(Error::CorrelationUnavailable)
        ));
        assert!(conv.dut(&sclk(0, 0)) == 0.0);
        assert!(conv.is_empty());
    }

    #[test]
    fn forward_extrapolation_past_single_entry() {
        let conv =
            SclkScetConverter::new(vec![entry(0, "2000-001T00:00:00", 1.0)]);
        // 100 fine ticks = 100/256 s = 390.625 ms past the entry
        let scet = conv.to_scet(&sclk(0, 100)).unwrap();
        let epoch = AccurateTime::parse("2000-001T00:00:00").unwrap();
        assert_eq!(scet.millis() - epoch.millis(), 390);
        assert_eq!(scet.nanos(), 625_000);
    }

    #[test]
    fn unextended_scet_rounds_to_whole_milliseconds() {
        let conv = SclkScetConverter::new(vec![entry(0, "2000-001T00:00:00", 1.0)])
            .with_extended_scet(false);
        let scet = conv.to_scet(&sclk(0, 100)).unwrap();
        let epoch = AccurateTime::parse("2000-001T00:00:00").unwrap();
        assert_eq!(scet.millis() - epoch.millis(), 391);
        assert_eq!(scet.nanos(), 0);
    }

    #[test]
    fn to_sclk_extrapolates_forward() {
        let conv =
            SclkScetConverter::new(vec![entry(0, "2000-001T00:00:00", 1.0)]);
        let scet = AccurateTime::parse("2000-001T00:00:00")
            .unwrap()
            .roll(390, 625_000, true)
            .unwrap();
        assert_eq!(conv.to_sclk(&scet).unwrap(), sclk(0, 100));
    }

    #[test]
    fn backward_extrapolation_before_table() {
        let conv =
            SclkScetConverter::new(vec![entry(100, "2000-001T00:00:00", 1.0)]);
        let scet = AccurateTime::parse("1999-365T23:59:50").unwrap();
        assert_eq!(conv.to_sclk(&scet).unwrap(), sclk(90, 0));
        let back = conv.to_scet(&sclk(90, 0)).unwrap();
        assert_eq!(back, scet);
    }

    #[test]
    fn interior_interpolation_round_trips() {
        let conv = SclkScetConverter::new(vec![
            entry(0, "2000-001T00:00:00", 1.0),
            entry(1000, "2000-001T00:16:40", 1.0),
        ]);
        let query = sclk(500, 128);
        let scet = conv.to_scet(&query).unwrap();
        let epoch = AccurateTime::parse("2000-001T00:00:00").unwrap();
        assert_eq!(scet.millis() - epoch.millis(), 500_500);
        assert_eq!(conv.to_sclk(&scet).unwrap(), query);
    }

    #[test]
    fn interpolation_with_drifting_clock() {
        // second segment runs at 2 SCET seconds per tick
        let conv = SclkScetConverter::new(vec![
            entry(0, "2000-001T00:00:00", 1.0),
            entry(100, "2000-001T00:01:40", 2.0),
            entry(200, "2000-001T00:05:00", 2.0),
        ]);
        let scet = conv.to_scet(&sclk(150, 0)).unwrap();
        let epoch = AccurateTime::parse("2000-001T00:00:00").unwrap();
        // halfway through the 100..200 bin: 100s + 0.5 * 200s
        assert_eq!(scet.millis() - epoch.millis(), 200_000);
        assert_eq!(conv.to_sclk(&scet).unwrap(), sclk(150, 0));
    }

    #[test]
    fn dut_is_a_step_function() {
        let mut early = entry(100, "2000-001T00:00:00", 1.0);
        early.dut = 57.0;
        let mut late = entry(200, "2000-001T00:01:40", 1.0);
        late.dut = 58.0;
        let conv = SclkScetConverter::new(vec![early, late]);

        assert!(conv.dut(&sclk(50, 0)) == 57.0);
        assert!(conv.dut(&sclk(100, 0)) == 57.0);
        assert!(conv.dut(&sclk(150, 0)) == 57.0);
        assert!(conv.dut(&sclk(200, 0)) == 58.0);
        assert!(conv.dut(&sclk(900, 0)) == 58.0);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let conv = SclkScetConverter::new(vec![entry(0, "2000-001T00:00:00", 0.0)]);
        let late = AccurateTime::parse("2000-002T00:00:00").unwrap();
        assert!(matches!(
            conv.to_sclk(&late),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn result_before_clock_zero_underflows() {
        let conv = SclkScetConverter::new(vec![entry(10, "2000-001T00:00:00", 1.0)]);
        let scet = AccurateTime::parse("1999-365T23:59:00").unwrap();
        assert!(matches!(conv.to_sclk(&scet), Err(Error::Underflow)));
    }
}
