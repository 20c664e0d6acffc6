//! Disk usage and cumulative IO counter synthesizers.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rand::Rng;
use serde::Serialize;

use crate::core::config::IoIncrementConfig;
use crate::store::model::{DiskDevice, DiskUsage, IoCounters};
use crate::telemetry::walk::{WalkBounds, bounded_walk, counter_increment, round_to};

/// Walk one device's usage percent and bump its IO counters.
pub fn advance_disk<R: Rng + ?Sized>(
    disk: &mut DiskDevice,
    usage_bounds: &WalkBounds,
    io: &IoIncrementConfig,
    rng: &mut R,
) {
    advance_usage(&mut disk.usage, usage_bounds, rng);
    advance_io(&mut disk.io, io, rng);
}

/// Walk `percent` and derive `used`/`free` from the final value.
///
/// Afterwards `used + free == total` and `percent` is `used / total` to within
/// one byte.
pub fn advance_usage<R: Rng + ?Sized>(usage: &mut DiskUsage, bounds: &WalkBounds, rng: &mut R) {
    if usage.total == 0 {
        usage.used = 0;
        usage.free = 0;
        usage.percent = 0.0;
        return;
    }
    let percent = bounded_walk(usage.percent, bounds, rng).clamp(0.0, 100.0);
    let total = usage.total as f64;
    usage.used = ((total * percent / 100.0).round() as u64).min(usage.total);
    usage.free = usage.total - usage.used;
    usage.percent = percent;
}

pub fn advance_io<R: Rng + ?Sized>(io: &mut IoCounters, cfg: &IoIncrementConfig, rng: &mut R) {
    io.read_count = counter_increment(io.read_count, &cfg.read_count, rng);
    io.write_count = counter_increment(io.write_count, &cfg.write_count, rng);
    io.read_bytes = counter_increment(io.read_bytes, &cfg.read_bytes, rng);
    io.write_bytes = counter_increment(io.write_bytes, &cfg.write_bytes, rng);
    io.read_time = counter_increment(io.read_time, &cfg.read_time, rng);
    io.write_time = counter_increment(io.write_time, &cfg.write_time, rng);
    io.busy_time = counter_increment(io.busy_time, &cfg.busy_time, rng);
}

/// Fleet-wide totals reported next to the per-device inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskSummary {
    pub device_count: usize,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub io: IoCounters,
}

pub fn summarize<'a>(disks: impl IntoIterator<Item = &'a DiskDevice>, precision: u32) -> DiskSummary {
    let mut summary = DiskSummary {
        device_count: 0,
        total: 0,
        used: 0,
        free: 0,
        percent: 0.0,
        io: IoCounters::default(),
    };
    for disk in disks {
        summary.device_count += 1;
        summary.total = summary.total.saturating_add(disk.usage.total);
        summary.used = summary.used.saturating_add(disk.usage.used);
        summary.free = summary.free.saturating_add(disk.usage.free);
        let io = &mut summary.io;
        io.read_count = io.read_count.saturating_add(disk.io.read_count);
        io.write_count = io.write_count.saturating_add(disk.io.write_count);
        io.read_bytes = io.read_bytes.saturating_add(disk.io.read_bytes);
        io.write_bytes = io.write_bytes.saturating_add(disk.io.write_bytes);
        io.read_time = io.read_time.saturating_add(disk.io.read_time);
        io.write_time = io.write_time.saturating_add(disk.io.write_time);
        io.busy_time = io.busy_time.saturating_add(disk.io.busy_time);
    }
    if summary.total > 0 {
        summary.percent = round_to(summary.used as f64 / summary.total as f64 * 100.0, precision);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn disk() -> DiskDevice {
        DiskDevice {
            device: "/dev/sdb".into(),
            mountpoint: None,
            fstype: Some("zfs_member".into()),
            usage: DiskUsage {
                total: 4_000_787_030_016,
                used: 1_680_330_552_320,
                free: 2_320_456_477_696,
                percent: 42.0,
            },
            io: IoCounters {
                read_count: 10,
                write_count: 20,
                read_bytes: 4096,
                write_bytes: 8192,
                read_time: 1,
                write_time: 2,
                busy_time: 3,
            },
        }
    }

    #[test]
    fn usage_stays_consistent_and_bounded() {
        let bounds = WalkBounds::new(5.0, 95.0, 1.5, 1);
        let mut rng = StdRng::seed_from_u64(21);
        let mut device = disk();
        for _ in 0..1_000 {
            advance_disk(&mut device, &bounds, &IoIncrementConfig::default(), &mut rng);
            let usage = &device.usage;
            assert_eq!(usage.used + usage.free, usage.total);
            assert!(bounds.contains(usage.percent), "percent {}", usage.percent);
        }
    }

    #[test]
    fn used_matches_reported_percent_on_tiny_devices() {
        let bounds = WalkBounds::new(40.0, 60.0, 5.0, 1);
        let mut rng = StdRng::seed_from_u64(23);
        let mut device = disk();
        device.usage = DiskUsage {
            total: 3,
            used: 1,
            free: 2,
            percent: 50.0,
        };
        for _ in 0..500 {
            advance_usage(&mut device.usage, &bounds, &mut rng);
            let usage = &device.usage;
            assert!(bounds.contains(usage.percent), "percent {}", usage.percent);
            assert_eq!(usage.used + usage.free, usage.total);
            let implied = usage.total as f64 * usage.percent / 100.0;
            assert!((usage.used as f64 - implied).abs() <= 0.5, "{usage:?}");
        }
    }

    #[test]
    fn io_counters_are_monotonic() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut device = disk();
        let cfg = IoIncrementConfig::default();
        for _ in 0..200 {
            let before = device.io;
            advance_io(&mut device.io, &cfg, &mut rng);
            let after = device.io;
            assert!(after.read_count >= before.read_count);
            assert!(after.write_count >= before.write_count);
            assert!(after.read_bytes >= before.read_bytes);
            assert!(after.write_bytes >= before.write_bytes);
            assert!(after.read_time >= before.read_time);
            assert!(after.write_time >= before.write_time);
            assert!(after.busy_time >= before.busy_time);
        }
    }

    #[test]
    fn zero_sized_device_reports_zero_usage() {
        let mut device = disk();
        device.usage.total = 0;
        let mut rng = StdRng::seed_from_u64(1);
        advance_usage(&mut device.usage, &WalkBounds::default(), &mut rng);
        assert_eq!(device.usage.used, 0);
        assert!(device.usage.percent.abs() < f64::EPSILON);
    }

    #[test]
    fn summary_adds_devices() {
        let a = disk();
        let b = disk();
        let summary = summarize([&a, &b], 1);
        assert_eq!(summary.device_count, 2);
        assert_eq!(summary.total, a.usage.total * 2);
        assert_eq!(summary.used + summary.free, summary.total);
        assert_eq!(summary.io.read_bytes, 8192);
        assert!((summary.percent - 42.0).abs() < 0.1);
    }
}
