//! Pool listing, detail, creation and cascading deletion.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::core::errors::{Result, SimError};
use crate::handlers::{required_str, string_list};
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::{PoolCapacity, PoolDetail, PoolDevice};
use crate::store::state::SystemState;
use crate::telemetry::pool::advance_pool;
use crate::telemetry::quantity::Quantity;

static POOL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.:-]*$").expect("pool name regex"));

/// Names zpool refuses because they collide with vdev keywords.
const RESERVED_NAMES: &[&str] = &["mirror", "raidz", "draid", "spare", "log", "cache"];

const TIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

/// Redundancy layout requested for a new pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VdevLayout {
    Stripe,
    Mirror,
    RaidZ(u8),
}

impl VdevLayout {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "stripe" | "disk" => Some(Self::Stripe),
            "mirror" => Some(Self::Mirror),
            "raidz" | "raidz1" => Some(Self::RaidZ(1)),
            "raidz2" => Some(Self::RaidZ(2)),
            "raidz3" => Some(Self::RaidZ(3)),
            _ => None,
        }
    }

    fn label(self) -> String {
        match self {
            Self::Stripe => "stripe".to_string(),
            Self::Mirror => "mirror".to_string(),
            Self::RaidZ(parity) => format!("raidz{parity}"),
        }
    }

    fn min_devices(self) -> usize {
        match self {
            Self::Stripe => 1,
            Self::Mirror => 2,
            Self::RaidZ(parity) => usize::from(parity) + 1,
        }
    }

    /// Usable bytes for devices of the given sizes.
    fn usable_bytes(self, sizes: &[u64]) -> u64 {
        let smallest = sizes.iter().copied().min().unwrap_or(0);
        match self {
            Self::Stripe => sizes.iter().sum(),
            Self::Mirror => smallest,
            Self::RaidZ(parity) => {
                let data = sizes.len().saturating_sub(usize::from(parity)) as u64;
                data.saturating_mul(smallest)
            }
        }
    }
}

/// `GET /api/zpool/`: capacity rows as they stand, then each advanced one
/// telemetry step for the next read.
///
/// A pool is reported before its first walk, so a fresh pool lists at 0%.
pub fn list(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let body = json!({ "data": ctx.state.pools });
    let telemetry = ctx.telemetry;
    for pool in &mut ctx.state.pools {
        advance_pool(pool, &telemetry.pool, ctx.rng);
    }
    Ok(HandlerReply::ok(body))
}

/// `GET /api/zpool/{name}/`
pub fn detail(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let name = ctx.params.get("name").unwrap_or_default();
    let detail = ctx
        .state
        .pool_details
        .get(name)
        .ok_or_else(|| SimError::not_found(format!("Pool {name} not found")))?;
    Ok(HandlerReply::ok(json!({ "data": [detail] })))
}

/// `POST /api/zpool/create/`
pub fn create(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let name = required_str(ctx, "pool_name")?;
    if !POOL_NAME_RE.is_match(&name) || RESERVED_NAMES.iter().any(|r| name.starts_with(r)) {
        return Err(SimError::validation(format!("Invalid pool name: {name}")));
    }
    let vdev_raw = required_str(ctx, "vdev_type")?;
    let layout = VdevLayout::parse(&vdev_raw)
        .ok_or_else(|| SimError::validation(format!("Unsupported vdev type: {vdev_raw}")))?;

    let devices: Vec<String> = string_list(ctx, "devices")?
        .into_iter()
        .map(|d| d.trim_start_matches("/dev/").to_string())
        .collect();
    if devices.is_empty() {
        return Err(SimError::validation("At least one device is required"));
    }
    let mut unique = HashSet::new();
    if let Some(dup) = devices.iter().find(|d| !unique.insert(d.as_str())) {
        return Err(SimError::validation(format!("Device {dup} listed more than once")));
    }
    if devices.len() < layout.min_devices() {
        return Err(SimError::validation(format!(
            "{} requires at least {} devices",
            layout.label(),
            layout.min_devices()
        )));
    }

    if ctx.state.has_pool(&name) {
        return Err(SimError::conflict(format!("Pool {name} already exists")));
    }
    if let Some((device, reason)) = device_unavailable(ctx.state, &devices) {
        return Err(SimError::conflict(format!("Device {device} is {reason}")));
    }
    if let Some((device, owner)) = device_in_use(ctx.state, &devices) {
        return Err(SimError::conflict(format!(
            "Device {device} is already in use by pool {owner}"
        )));
    }

    let (size, used, free) = match capacity_of(ctx.state, layout, &devices) {
        Some(bytes) => {
            let unit = if bytes as f64 >= TIB { "T" } else { "G" };
            let zero = Quantity {
                magnitude: 0.0,
                unit: unit.to_string(),
                spaced: false,
            };
            let size = zero.with_base(bytes as f64).map(|q| q.format(2));
            (size.clone(), Some(zero.format(2)), size)
        }
        None => (None, None, None),
    };

    ctx.state.pools.push(PoolCapacity {
        name: name.clone(),
        total: None,
        size,
        capacity_total: None,
        used,
        free,
        capacity: "0%".to_string(),
        dedup: "1.00x".to_string(),
        fragmentation: "0%".to_string(),
        health: "ONLINE".to_string(),
    });
    ctx.state.pool_details.insert(
        name.clone(),
        PoolDetail {
            name: name.clone(),
            state: "ONLINE".to_string(),
            vdev_type: layout.label(),
            devices: devices
                .iter()
                .map(|d| PoolDevice {
                    name: d.clone(),
                    state: "ONLINE".to_string(),
                    read: 0,
                    write: 0,
                    cksum: 0,
                })
                .collect(),
            scan: None,
            errors: "No known data errors".to_string(),
        },
    );

    Ok(HandlerReply::created(json!({
        "detail": format!("Pool {name} created successfully")
    })))
}

/// `DELETE /api/zpool/delete/`: removes the pool and every `<pool>/` volume.
///
/// Deleting an unknown pool succeeds without changing anything.
pub fn delete(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let name = required_str(ctx, "pool_name")?;
    let removal = ctx.state.remove_pool_cascade(&name);
    let detail = if removal.pool_removed {
        format!(
            "Pool {name} deleted successfully ({} volume(s) removed)",
            removal.volumes_removed.len()
        )
    } else {
        format!("Pool {name} does not exist; nothing to delete")
    };
    Ok(HandlerReply::ok(json!({ "detail": detail })))
}

fn device_in_use<'a>(state: &'a SystemState, devices: &[String]) -> Option<(String, &'a str)> {
    state.pool_details.values().find_map(|pool| {
        pool.devices
            .iter()
            .find(|d| devices.contains(&d.name))
            .map(|d| (d.name.clone(), pool.name.as_str()))
    })
}

/// First requested disk that holds a mounted or foreign filesystem.
fn device_unavailable(state: &SystemState, devices: &[String]) -> Option<(String, String)> {
    devices.iter().find_map(|name| {
        let disk = state.disks.get(name)?;
        if let Some(mountpoint) = &disk.mountpoint {
            return Some((name.clone(), format!("mounted at {mountpoint}")));
        }
        match disk.fstype.as_deref() {
            Some(fstype) if fstype != "zfs_member" => {
                Some((name.clone(), format!("formatted as {fstype}")))
            }
            _ => None,
        }
    })
}

/// Usable capacity when every device is a known disk.
fn capacity_of(state: &SystemState, layout: VdevLayout, devices: &[String]) -> Option<u64> {
    let sizes: Option<Vec<u64>> = devices
        .iter()
        .map(|d| state.disks.get(d).map(|disk| disk.usage.total))
        .collect();
    sizes.map(|sizes| layout.usable_bytes(&sizes))
}
