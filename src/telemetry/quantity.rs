//! `Quantity`: human "number + unit" strings such as `10 TiB`, `3.2T` or `600 Mbps`.
//!
//! Parsing keeps the unit text and the spacing style so a walked value
//! re-serializes in exactly the form it was read.

#![allow(missing_docs)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::{Result, SimError};
use crate::telemetry::walk::round_to;

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)(\s*)([A-Za-z/%]*)\s*$").expect("quantity regex")
});

/// What a unit measures, which decides its base and multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    /// Storage sizes, binary multiples (`K`, `KiB`, `KB` are all 1024).
    Bytes,
    /// Link rates, decimal multiples of bits per second.
    BitRate,
    /// Anything else (`%`, `x`, unknown); no conversion possible.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: String,
    /// Whether a space separated number and unit in the source text.
    pub spaced: bool,
}

impl Quantity {
    #[must_use]
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Self {
            magnitude,
            unit: unit.into(),
            spaced: true,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let caps = QUANTITY_RE
            .captures(raw)
            .ok_or_else(|| SimError::validation(format!("Invalid quantity: {raw:?}")))?;
        let magnitude = caps[1]
            .parse::<f64>()
            .map_err(|e| SimError::validation(format!("Invalid quantity {raw:?}: {e}")))?;
        Ok(Self {
            magnitude,
            unit: caps[3].to_string(),
            spaced: !caps[2].is_empty(),
        })
    }

    #[must_use]
    pub fn family(&self) -> UnitFamily {
        unit_scale(&self.unit).map_or(UnitFamily::Other, |(family, _)| family)
    }

    /// Value in the family base unit (bytes or bits per second).
    #[must_use]
    pub fn to_base(&self) -> Option<f64> {
        unit_scale(&self.unit).map(|(_, factor)| self.magnitude * factor)
    }

    /// A quantity in this quantity's unit holding `base` base units.
    #[must_use]
    pub fn with_base(&self, base: f64) -> Option<Self> {
        let (_, factor) = unit_scale(&self.unit)?;
        Some(Self {
            magnitude: base / factor,
            unit: self.unit.clone(),
            spaced: self.spaced,
        })
    }

    /// Convert into another unit of the same family.
    #[must_use]
    pub fn convert_to(&self, unit: &str) -> Option<f64> {
        let (from_family, from) = unit_scale(&self.unit)?;
        let (to_family, to) = unit_scale(unit)?;
        (from_family == to_family).then(|| self.magnitude * from / to)
    }

    /// Render with `precision` decimal places, trailing zeros trimmed.
    #[must_use]
    pub fn format(&self, precision: u32) -> String {
        let rounded = round_to(self.magnitude, precision);
        let mut number = format!("{rounded:.prec$}", prec = precision as usize);
        if number.contains('.') {
            number = number.trim_end_matches('0').trim_end_matches('.').to_string();
        }
        let sep = if self.spaced && !self.unit.is_empty() {
            " "
        } else {
            ""
        };
        format!("{number}{sep}{}", self.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(2))
    }
}

/// Family and multiplier to the family base unit.
fn unit_scale(unit: &str) -> Option<(UnitFamily, f64)> {
    let lower = unit.to_ascii_lowercase();
    if let Some(prefix) = lower.strip_suffix("bps") {
        let factor = match prefix {
            "" => 1.0,
            "k" => 1e3,
            "m" => 1e6,
            "g" => 1e9,
            "t" => 1e12,
            _ => return None,
        };
        return Some((UnitFamily::BitRate, factor));
    }

    let stripped = lower
        .strip_suffix("ib")
        .or_else(|| lower.strip_suffix('b'))
        .unwrap_or(&lower);
    let exponent = match stripped {
        "" => 0,
        "k" => 1,
        "m" => 2,
        "g" => 3,
        "t" => 4,
        "p" => 5,
        "e" => 6,
        _ => return None,
    };
    Some((UnitFamily::Bytes, 1024_f64.powi(exponent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_and_compact_forms() {
        let a = Quantity::parse("10 TiB").unwrap();
        assert!((a.magnitude - 10.0).abs() < f64::EPSILON);
        assert_eq!(a.unit, "TiB");
        assert!(a.spaced);

        let b = Quantity::parse("3.62T").unwrap();
        assert_eq!(b.unit, "T");
        assert!(!b.spaced);
        assert_eq!(b.family(), UnitFamily::Bytes);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Quantity::parse("lots").is_err());
        assert!(Quantity::parse("").is_err());
        assert!(Quantity::parse("-3G").is_err());
    }

    #[test]
    fn binary_byte_units_share_a_scale() {
        let t = Quantity::parse("1T").unwrap().to_base().unwrap();
        let tib = Quantity::parse("1 TiB").unwrap().to_base().unwrap();
        assert!((t - tib).abs() < f64::EPSILON);
        assert!((t - 1024_f64.powi(4)).abs() < 1.0);
    }

    #[test]
    fn bit_rates_are_decimal() {
        let q = Quantity::parse("600 Mbps").unwrap();
        assert_eq!(q.family(), UnitFamily::BitRate);
        assert!((q.convert_to("Gbps").unwrap() - 0.6).abs() < 1e-12);
        assert!(q.convert_to("GiB").is_none());
    }

    #[test]
    fn format_preserves_unit_and_spacing() {
        let q = Quantity::parse("10 TiB").unwrap();
        let walked = q.with_base(q.to_base().unwrap() * 0.5).unwrap();
        assert_eq!(walked.format(2), "5 TiB");

        let compact = Quantity::parse("1.5G").unwrap();
        let grown = compact.with_base(compact.to_base().unwrap() * 1.5).unwrap();
        assert_eq!(grown.format(2), "2.25G");
    }

    #[test]
    fn unitless_and_percent_quantities_have_no_base() {
        let pct = Quantity::parse("42%").unwrap();
        assert_eq!(pct.family(), UnitFamily::Other);
        assert!(pct.to_base().is_none());
        let ratio = Quantity::parse("1.00x").unwrap();
        assert_eq!(ratio.format(2), "1x");
    }
}
