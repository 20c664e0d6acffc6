//! Typed records for every simulated resource kind.
//!
//! Field names follow the JSON the management API returns, so most records
//! serialize straight into response bodies.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form attribute bag (volume properties, share options, ...).
pub type Attributes = BTreeMap<String, Value>;

/// One row of the pool capacity listing.
///
/// `total`, `size` and `capacity_total` are alternative spellings of the pool
/// size; readers resolve them in that priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCapacity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_total: Option<String>,
    #[serde(default)]
    pub used: Option<String>,
    #[serde(default)]
    pub free: Option<String>,
    pub capacity: String,
    pub dedup: String,
    pub fragmentation: String,
    pub health: String,
}

impl PoolCapacity {
    /// First populated size candidate by priority.
    #[must_use]
    pub fn size_text(&self) -> Option<&str> {
        [&self.total, &self.size, &self.capacity_total]
            .into_iter()
            .find_map(|candidate| candidate.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDevice {
    pub name: String,
    pub state: String,
    pub read: u64,
    pub write: u64,
    pub cksum: u64,
}

/// Status detail of a single pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDetail {
    pub name: String,
    pub state: String,
    pub vdev_type: String,
    pub devices: Vec<PoolDevice>,
    #[serde(default)]
    pub scan: Option<String>,
    pub errors: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SambaUser {
    pub username: String,
    pub disabled: bool,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsUser {
    pub username: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
    pub system: bool,
    pub has_samba_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub unit: String,
    pub description: String,
    pub load_state: String,
    pub active_state: String,
    pub sub_state: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bandwidth {
    pub download: f64,
    pub upload: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    pub family: String,
    pub address: String,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub broadcast: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStatus {
    pub isup: bool,
    /// Link speed in Mbps; 0 when unknown.
    pub speed: u64,
    pub mtu: u32,
    pub duplex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub bandwidth: Bandwidth,
    pub addresses: Vec<InterfaceAddress>,
    pub status: InterfaceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IoCounters {
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time: u64,
    pub write_time: u64,
    pub busy_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskDevice {
    pub device: String,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    pub usage: DiskUsage,
    pub io: IoCounters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub cpu_percent: f64,
    pub per_cpu_percent: Vec<f64>,
    pub cores: u32,
    pub load_average: [f64; 3],
    pub frequency_mhz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub free: u64,
    pub cached: u64,
    pub percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirPermission {
    pub ok: bool,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerActionResult {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub password: String,
    pub token: String,
}
