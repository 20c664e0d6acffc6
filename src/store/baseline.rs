//! Baseline fixture: the immutable starting state every store is cloned from.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::errors::{Result, SimError};
use crate::store::state::SystemState;

/// Built-in fixture compiled into the crate.
pub const BASELINE_JSON: &str = include_str!("../../fixtures/baseline.json");

/// Parse and check the built-in fixture.
pub fn builtin() -> Result<SystemState> {
    from_json_str(BASELINE_JSON)
}

/// Parse and check a fixture file that replaces the built-in one.
pub fn load(path: &Path) -> Result<SystemState> {
    let raw = fs::read_to_string(path).map_err(|source| SimError::io(path, source))?;
    from_json_str(&raw)
}

pub fn from_json_str(raw: &str) -> Result<SystemState> {
    let state: SystemState = serde_json::from_str(raw)?;
    validate(&state)?;
    Ok(state)
}

/// Structural checks a fixture must pass before any store is built from it.
pub fn validate(state: &SystemState) -> Result<()> {
    let mut seen = HashSet::new();
    for pool in &state.pools {
        if !seen.insert(pool.name.as_str()) {
            return Err(invalid(format!("duplicate pool {:?}", pool.name)));
        }
        if !state.pool_details.contains_key(&pool.name) {
            return Err(invalid(format!("pool {:?} has no detail entry", pool.name)));
        }
    }
    for name in state.pool_details.keys() {
        if !seen.contains(name.as_str()) {
            return Err(invalid(format!("detail entry {name:?} has no pool row")));
        }
    }

    for volume in state.volumes.keys() {
        let Some((pool, rest)) = volume.split_once('/') else {
            return Err(invalid(format!("volume {volume:?} is not of the form pool/name")));
        };
        if rest.is_empty() || !seen.contains(pool) {
            return Err(invalid(format!("volume {volume:?} references unknown pool")));
        }
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for user in &state.web_users {
        if !ids.insert(user.id) || !names.insert(user.username.as_str()) {
            return Err(invalid(format!("duplicate web user {:?}", user.username)));
        }
    }

    for (key, user) in &state.samba_users {
        if key != &user.username {
            return Err(invalid(format!("samba user key {key:?} != {:?}", user.username)));
        }
    }
    for (key, user) in &state.os_users {
        if key != &user.username {
            return Err(invalid(format!("os user key {key:?} != {:?}", user.username)));
        }
    }

    for (name, disk) in &state.disks {
        let usage = &disk.usage;
        if usage.used.checked_add(usage.free) != Some(usage.total) {
            return Err(invalid(format!("disk {name:?} usage does not add up")));
        }
        if !(0.0..=100.0).contains(&usage.percent) {
            return Err(invalid(format!("disk {name:?} percent out of range")));
        }
    }

    if state.memory.used > state.memory.total {
        return Err(invalid("memory used exceeds total".to_string()));
    }

    Ok(())
}

fn invalid(details: String) -> SimError {
    SimError::InvalidConfig {
        details: format!("baseline fixture: {details}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_fixture_is_valid() {
        let state = builtin().expect("built-in baseline must parse");
        assert!(state.pool("tank").is_some());
        assert!(state.dir_permissions.contains_key("/restricted"));
        assert!(state.services.contains_key("smbd"));
    }

    #[test]
    fn samba_links_match_os_users() {
        let state = builtin().unwrap();
        for user in state.os_users.values() {
            assert_eq!(
                user.has_samba_user,
                state.samba_users.contains_key(&user.username),
                "link flag out of sync for {}",
                user.username
            );
        }
    }

    #[test]
    fn orphan_volume_rejected() {
        let mut state = builtin().unwrap();
        state
            .volumes
            .insert("ghost/vol".to_string(), Default::default());
        let err = validate(&state).unwrap_err();
        assert!(err.to_string().contains("ghost/vol"));
    }

    #[test]
    fn duplicate_pool_rejected() {
        let mut state = builtin().unwrap();
        let dup = state.pools[0].clone();
        state.pools.push(dup);
        assert!(validate(&state).is_err());
    }

    #[test]
    fn load_reads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        fs::write(&path, BASELINE_JSON).unwrap();
        assert_eq!(load(&path).unwrap(), builtin().unwrap());
    }

    #[test]
    fn malformed_fixture_is_serialization_error() {
        let err = from_json_str("{\"pools\": 3}").unwrap_err();
        assert_eq!(err.code(), "SIM-3001");
    }
}
