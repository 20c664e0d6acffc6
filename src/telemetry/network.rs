//! Per-interface bandwidth synthesizer.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use rand::Rng;

use crate::store::model::NetworkInterface;
use crate::telemetry::quantity::Quantity;
use crate::telemetry::walk::{WalkBounds, bounded_walk};

/// Unit the configured network bounds are expressed in.
pub const BOUNDS_UNIT: &str = "Mbps";

/// Walk download and upload rates, capped at the link speed.
///
/// `bounds` are in Mbps and are converted into the interface's own bandwidth
/// unit, which is left untouched. A link that is down or reports no speed
/// carries no traffic.
pub fn advance_interface<R: Rng + ?Sized>(
    iface: &mut NetworkInterface,
    bounds: &WalkBounds,
    rng: &mut R,
) {
    if !iface.status.isup || iface.status.speed == 0 {
        iface.bandwidth.download = 0.0;
        iface.bandwidth.upload = 0.0;
        return;
    }

    let unit = iface.bandwidth.unit.as_str();
    let Some(scale) = Quantity::new(1.0, BOUNDS_UNIT).convert_to(unit) else {
        // Unknown unit: walk in the configured numbers, uncapped.
        iface.bandwidth.download = bounded_walk(iface.bandwidth.download, bounds, rng);
        iface.bandwidth.upload = bounded_walk(iface.bandwidth.upload, bounds, rng);
        return;
    };
    let link = iface.status.speed as f64 * scale;
    let local = bounds.scaled(scale).capped(link);
    iface.bandwidth.download = bounded_walk(iface.bandwidth.download, &local, rng);
    iface.bandwidth.upload = bounded_walk(iface.bandwidth.upload, &local, rng);
}
