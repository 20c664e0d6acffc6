//! Pool capacity synthesizer.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use rand::Rng;

use crate::store::model::PoolCapacity;
use crate::telemetry::quantity::Quantity;
use crate::telemetry::walk::{WalkBounds, bounded_walk};

/// Pool size in bytes from the first populated size field.
#[must_use]
pub fn pool_size_bytes(pool: &PoolCapacity) -> Option<f64> {
    let size = Quantity::parse(pool.size_text()?).ok()?;
    size.to_base().filter(|bytes| *bytes > 0.0)
}

/// Walk a pool's used capacity (bounds are fractions of its size) and
/// recompute `free` and `capacity`.
///
/// Used and free keep the unit they were stored with. A pool with no
/// resolvable size is left untouched.
pub fn advance_pool<R: Rng + ?Sized>(pool: &mut PoolCapacity, bounds: &WalkBounds, rng: &mut R) {
    let Some(size_text) = pool.size_text() else {
        return;
    };
    let Ok(size) = Quantity::parse(size_text) else {
        return;
    };
    let Some(total) = size.to_base().filter(|bytes| *bytes > 0.0) else {
        return;
    };

    let template = |existing: Option<&str>| {
        existing
            .and_then(|raw| Quantity::parse(raw).ok())
            .filter(|q| q.to_base().is_some())
            .unwrap_or_else(|| Quantity {
                magnitude: 0.0,
                ..size.clone()
            })
    };
    let used_q = template(pool.used.as_deref());
    let free_q = template(pool.free.as_deref());
    let used_bytes = used_q.to_base().unwrap_or(0.0);

    let byte_bounds = WalkBounds {
        precision: 0,
        ..bounds.scaled(total)
    };
    let walked = bounded_walk(used_bytes, &byte_bounds, rng);

    if let Some(used) = used_q.with_base(walked) {
        pool.used = Some(used.format(bounds.precision));
    }
    if let Some(free) = free_q.with_base((total - walked).max(0.0)) {
        pool.free = Some(free.format(bounds.precision));
    }
    pool.capacity = format!("{}%", (walked / total * 100.0).round() as i64);
}
