//! Bounded random walks and monotonic counters: the numeric core of every synthesizer.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Range, step and display precision for one oscillating metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalkBounds {
    pub min: f64,
    pub max: f64,
    /// Largest absolute change per step.
    pub max_step: f64,
    /// Decimal places kept after each step.
    pub precision: u32,
}

impl Default for WalkBounds {
    fn default() -> Self {
        Self::new(0.0, 100.0, 1.0, 2)
    }
}

impl WalkBounds {
    #[must_use]
    pub const fn new(min: f64, max: f64, max_step: f64, precision: u32) -> Self {
        Self {
            min,
            max,
            max_step,
            precision,
        }
    }

    /// Same step and precision, scaled onto `[min * scale, max * scale]`.
    ///
    /// Used for fraction-of-total bounds (memory, pool capacity).
    #[must_use]
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            min: self.min * scale,
            max: self.max * scale,
            max_step: self.max_step * scale,
            precision: self.precision,
        }
    }

    /// Same step and precision with the ceiling lowered to `cap`.
    #[must_use]
    pub fn capped(&self, cap: f64) -> Self {
        let max = self.max.min(cap).max(self.min);
        Self { max, ..*self }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Per-call increment range of a cumulative counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CounterRange {
    pub min_delta: f64,
    pub max_delta: f64,
}

impl Default for CounterRange {
    fn default() -> Self {
        Self::new(0.0, 100.0)
    }
}

impl CounterRange {
    #[must_use]
    pub const fn new(min_delta: f64, max_delta: f64) -> Self {
        Self {
            min_delta,
            max_delta,
        }
    }
}

/// Round half away from zero to `precision` decimal places.
#[must_use]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// One step of a bounded random walk.
///
/// `next = clamp(previous + uniform(-max_step, +max_step), min, max)`, rounded to
/// the configured precision. The result lies in `[min, max]` for any input,
/// including non-finite or out-of-range seeds.
pub fn bounded_walk<R: Rng + ?Sized>(previous: f64, bounds: &WalkBounds, rng: &mut R) -> f64 {
    let (lo, hi) = if bounds.min <= bounds.max {
        (bounds.min, bounds.max)
    } else {
        (bounds.max, bounds.min)
    };
    let start = if previous.is_finite() {
        previous
    } else {
        f64::midpoint(lo, hi)
    };
    let step = bounds.max_step.abs();
    let delta = if step > 0.0 {
        rng.random_range(-step..=step)
    } else {
        0.0
    };
    let next = (start + delta).clamp(lo, hi);
    // Rounding can push a value just past an unrounded bound.
    round_to(next, bounds.precision).clamp(lo, hi)
}

/// One step of a cumulative counter: `max(previous, round(previous + uniform(min, max)))`.
///
/// Never decreases and never goes below zero.
pub fn counter_increment<R: Rng + ?Sized>(previous: u64, range: &CounterRange, rng: &mut R) -> u64 {
    let lo = range.min_delta.max(0.0);
    let hi = range.max_delta.max(lo);
    let delta = if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    };
    let next = (previous as f64 + delta).round().max(0.0);
    if next >= u64::MAX as f64 {
        return u64::MAX;
    }
    (next as u64).max(previous)
}
