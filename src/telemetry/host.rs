//! CPU load and memory usage synthesizers.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rand::Rng;

use crate::store::model::{CpuSnapshot, MemorySnapshot};
use crate::telemetry::walk::{WalkBounds, bounded_walk, round_to};

/// Smoothing factors for the 5- and 15-minute load averages.
const LOAD5_ALPHA: f64 = 0.30;
const LOAD15_ALPHA: f64 = 0.10;

/// Walk overall and per-core load, then derive the load averages.
pub fn advance_cpu<R: Rng + ?Sized>(cpu: &mut CpuSnapshot, bounds: &WalkBounds, rng: &mut R) {
    cpu.cpu_percent = bounded_walk(cpu.cpu_percent, bounds, rng);
    for core in &mut cpu.per_cpu_percent {
        *core = bounded_walk(*core, bounds, rng);
    }

    let load1 = round_to(cpu.cpu_percent / 100.0 * f64::from(cpu.cores.max(1)), 2);
    let [_, load5, load15] = cpu.load_average;
    cpu.load_average = [
        load1,
        round_to(ewma(LOAD5_ALPHA, load5, load1), 2),
        round_to(ewma(LOAD15_ALPHA, load15, load1), 2),
    ];
}

/// Walk used memory inside `bounds` (fractions of total) and recompute the rest.
///
/// Keeps `used + available == total` and `free <= available`.
pub fn advance_memory<R: Rng + ?Sized>(
    memory: &mut MemorySnapshot,
    bounds: &WalkBounds,
    rng: &mut R,
) {
    if memory.total == 0 {
        return;
    }
    let total = memory.total as f64;
    let byte_bounds = WalkBounds {
        precision: 0,
        ..bounds.scaled(total)
    };
    let used = bounded_walk(memory.used as f64, &byte_bounds, rng);
    memory.used = (used as u64).min(memory.total);
    memory.available = memory.total - memory.used;
    memory.free = memory.available.saturating_sub(memory.cached);
    memory.percent = round_to(memory.used as f64 / total * 100.0, bounds.precision);
}

#[inline]
fn ewma(alpha: f64, prev: f64, current: f64) -> f64 {
    alpha * current + (1.0 - alpha) * prev
}
