//! Simulated system state and the lock-guarded store that owns it.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::store::model::{
    Attributes, CpuSnapshot, Credential, DirPermission, DiskDevice, MemorySnapshot,
    NetworkInterface, OsUser, PoolCapacity, PoolDetail, PowerActionResult, SambaUser, Service,
    WebUser,
};

/// Every mutable collection of the simulated appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub pools: Vec<PoolCapacity>,
    pub pool_details: BTreeMap<String, PoolDetail>,
    pub volumes: BTreeMap<String, Attributes>,
    pub shares: BTreeMap<String, Attributes>,
    pub samba_users: BTreeMap<String, SambaUser>,
    pub os_users: BTreeMap<String, OsUser>,
    pub web_users: Vec<WebUser>,
    pub services: BTreeMap<String, Service>,
    pub interfaces: BTreeMap<String, NetworkInterface>,
    pub disks: BTreeMap<String, DiskDevice>,
    pub wwn_map: BTreeMap<String, String>,
    pub cpu: CpuSnapshot,
    pub memory: MemorySnapshot,
    pub dir_permissions: BTreeMap<String, DirPermission>,
    pub power_actions: BTreeMap<String, PowerActionResult>,
    pub credentials: BTreeMap<String, Credential>,
}

/// What a cascading pool removal took out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolRemoval {
    pub pool_removed: bool,
    pub volumes_removed: Vec<String>,
}

impl SystemState {
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&PoolCapacity> {
        self.pools.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn has_pool(&self, name: &str) -> bool {
        self.pool(name).is_some() || self.pool_details.contains_key(name)
    }

    /// Volume names that live under `pool`.
    #[must_use]
    pub fn volumes_of(&self, pool: &str) -> Vec<String> {
        let prefix = format!("{pool}/");
        self.volumes
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Remove a pool's capacity row, its detail entry and every `<pool>/` volume.
    ///
    /// Runs under one `&mut self` borrow, so no caller observes a partial removal.
    pub fn remove_pool_cascade(&mut self, name: &str) -> PoolRemoval {
        let volumes_removed = self.volumes_of(name);
        for volume in &volumes_removed {
            self.volumes.remove(volume);
        }
        let before = self.pools.len();
        self.pools.retain(|p| p.name != name);
        let had_detail = self.pool_details.remove(name).is_some();
        PoolRemoval {
            pool_removed: before != self.pools.len() || had_detail,
            volumes_removed,
        }
    }

    #[must_use]
    pub fn web_user(&self, username: &str) -> Option<&WebUser> {
        self.web_users.iter().find(|u| u.username == username)
    }

    /// Next free web user id.
    #[must_use]
    pub fn next_web_user_id(&self) -> u64 {
        self.web_users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// Next free uid for a regular (non-system) account.
    #[must_use]
    pub fn next_regular_uid(&self) -> u32 {
        self.os_users
            .values()
            .filter(|u| !u.system && u.uid >= 1000 && u.uid < 60_000)
            .map(|u| u.uid + 1)
            .max()
            .unwrap_or(1000)
    }
}

struct StoreInner {
    state: SystemState,
    rng: StdRng,
}

/// Process-wide owner of the simulated state.
///
/// Handlers only reach the state through [`Store::with_state`], so a borrow
/// can never outlive one invocation and the lock is held for the whole
/// read-modify-write sequence.
pub struct Store {
    baseline: SystemState,
    seed: Option<u64>,
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Build a store whose live state is a structural copy of `baseline`.
    #[must_use]
    pub fn new(baseline: SystemState, seed: Option<u64>) -> Self {
        let inner = StoreInner {
            state: baseline.clone(),
            rng: make_rng(seed),
        };
        Self {
            baseline,
            seed,
            inner: Mutex::new(inner),
        }
    }

    /// Run `f` with exclusive access to the live state and the telemetry RNG.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut SystemState, &mut StdRng) -> T) -> T {
        let mut guard = self.inner.lock();
        let StoreInner { state, rng } = &mut *guard;
        f(state, rng)
    }

    /// Deep copy of the live state.
    #[must_use]
    pub fn snapshot(&self) -> SystemState {
        self.inner.lock().state.clone()
    }

    /// The immutable baseline this store was built from.
    #[must_use]
    pub fn baseline(&self) -> &SystemState {
        &self.baseline
    }

    /// Discard every mutation and restore a fresh copy of the baseline.
    ///
    /// A seeded store also rewinds its RNG so runs after a reset replay
    /// identically. Test-harness operation: call between requests, never
    /// during one.
    pub fn reset(&self) {
        let mut guard = self.inner.lock();
        guard.state = self.baseline.clone();
        if self.seed.is_some() {
            guard.rng = make_rng(self.seed);
        }
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::baseline;

    fn store() -> Store {
        Store::new(baseline::builtin().expect("baseline parses"), Some(1))
    }

    #[test]
    fn live_state_starts_equal_to_baseline() {
        let store = store();
        assert_eq!(&store.snapshot(), store.baseline());
    }

    #[test]
    fn cascade_removes_pool_detail_and_volumes() {
        let store = store();
        store.with_state(|state, _| {
            assert!(!state.volumes_of("tank").is_empty());
            let removal = state.remove_pool_cascade("tank");
            assert!(removal.pool_removed);
            assert!(!removal.volumes_removed.is_empty());
            assert!(state.pool("tank").is_none());
            assert!(!state.pool_details.contains_key("tank"));
            assert!(state.volumes.keys().all(|k| !k.starts_with("tank/")));
        });
    }

    #[test]
    fn cascade_respects_name_boundaries() {
        let store = store();
        store.with_state(|state, _| {
            state
                .volumes
                .insert("tank2/other".to_string(), Attributes::new());
            state.remove_pool_cascade("tank");
            assert!(state.volumes.contains_key("tank2/other"));
        });
    }

    #[test]
    fn cascade_on_missing_pool_changes_nothing() {
        let store = store();
        let before = store.snapshot();
        let removal = store.with_state(|state, _| state.remove_pool_cascade("nope"));
        assert_eq!(removal, PoolRemoval::default());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn reset_restores_baseline_after_mutation() {
        let store = store();
        store.with_state(|state, _| {
            state.pools.clear();
            state.volumes.clear();
            state.cpu.cpu_percent = 99.0;
        });
        assert_ne!(&store.snapshot(), store.baseline());
        store.reset();
        assert_eq!(&store.snapshot(), store.baseline());
    }

    #[test]
    fn next_ids_skip_existing_entries() {
        let store = store();
        let state = store.snapshot();
        let max_id = state.web_users.iter().map(|u| u.id).max().unwrap();
        assert_eq!(state.next_web_user_id(), max_id + 1);
        assert!(state.next_regular_uid() >= 1000);
        assert!(state.os_users.values().all(|u| u.uid != state.next_regular_uid()));
    }
}
