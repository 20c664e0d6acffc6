//! Directory permission records.
//!
//! `info` always answers 200 and reports failure through `{ok: false}`,
//! matching the backend's envelope for this endpoint.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::core::errors::{Result, SimError};
use crate::handlers::{optional_str, required_str};
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::DirPermission;

static MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-7]{3,4}$").expect("mode regex"));

/// `POST /api/dir/create/permissions/`: upsert; new records default to `root:root 755`.
pub fn create(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let path = required_str(ctx, "path")?;
    if !path.starts_with('/') {
        return Err(SimError::validation(format!("path must be absolute: {path}")));
    }
    let mode = optional_str(ctx, "mode");
    if let Some(mode) = mode.as_deref()
        && !MODE_RE.is_match(mode)
    {
        return Err(SimError::validation(format!("Invalid mode: {mode}")));
    }
    let owner = optional_str(ctx, "owner");
    let group = optional_str(ctx, "group");

    let entry = ctx
        .state
        .dir_permissions
        .entry(path)
        .or_insert_with(|| DirPermission {
            ok: true,
            owner: Some("root".to_string()),
            group: Some("root".to_string()),
            mode: Some("755".to_string()),
            error: None,
        });
    entry.ok = true;
    entry.error = None;
    if owner.is_some() {
        entry.owner = owner;
    }
    if group.is_some() {
        entry.group = group;
    }
    if mode.is_some() {
        entry.mode = mode;
    }
    Ok(HandlerReply::ok(json!({
        "ok": true,
        "error": Value::Null,
        "owner": entry.owner,
        "group": entry.group,
        "mode": entry.mode,
    })))
}

/// `GET /api/dir/info/permissions/?path=...`
pub fn info(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let Some(path) = ctx.query.get("path").filter(|p| !p.is_empty()) else {
        return Ok(failure("path is required"));
    };
    let body = match ctx.state.dir_permissions.get(path) {
        Some(entry) if entry.ok => json!({
            "ok": true,
            "error": Value::Null,
            "owner": entry.owner,
            "group": entry.group,
            "mode": entry.mode,
        }),
        Some(entry) => {
            return Ok(failure(
                entry
                    .error
                    .as_deref()
                    .unwrap_or("Permission denied"),
            ));
        }
        None => return Ok(failure(&format!("No such directory: {path}"))),
    };
    Ok(HandlerReply::ok(body))
}

fn failure(message: &str) -> HandlerReply {
    HandlerReply::ok(json!({
        "ok": false,
        "error": { "message": message },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testkit::Harness;

    const INFO: &str = "/api/dir/info/permissions/";
    const CREATE: &str = "/api/dir/create/permissions/";

    #[test]
    fn denied_path_is_ok_false_with_200() {
        let mut h = Harness::new();
        let reply = h
            .call(info, INFO, "GET", "/api/dir/info/permissions/?path=/restricted", None)
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["ok"], false);
        assert!(
            reply.body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Permission denied")
        );
    }

    #[test]
    fn unknown_and_missing_paths_are_ok_false() {
        let mut h = Harness::new();
        let reply = h
            .call(info, INFO, "GET", "/api/dir/info/permissions/?path=/nowhere", None)
            .unwrap();
        assert_eq!(reply.body["ok"], false);
        let reply = h.call(info, INFO, "GET", INFO, None).unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["ok"], false);
    }

    #[test]
    fn known_path_reports_owner_and_mode() {
        let mut h = Harness::new();
        let reply = h
            .call(info, INFO, "GET", "/api/dir/info/permissions/?path=%2Ftank%2Fdata", None)
            .unwrap();
        assert_eq!(reply.body["ok"], true);
        assert_eq!(reply.body["mode"], "2775");
    }

    #[test]
    fn create_applies_defaults_then_updates() {
        let mut h = Harness::new();
        h.call(create, CREATE, "POST", CREATE, Some(json!({"path": "/tank/new"})))
            .unwrap();
        let entry = &h.state.dir_permissions["/tank/new"];
        assert_eq!(entry.owner.as_deref(), Some("root"));
        assert_eq!(entry.mode.as_deref(), Some("755"));

        h.call(
            create,
            CREATE,
            "POST",
            CREATE,
            Some(json!({"path": "/tank/new", "owner": "alice", "mode": "0750"})),
        )
        .unwrap();
        let entry = &h.state.dir_permissions["/tank/new"];
        assert_eq!(entry.owner.as_deref(), Some("alice"));
        assert_eq!(entry.group.as_deref(), Some("root"));
        assert_eq!(entry.mode.as_deref(), Some("0750"));
    }

    #[test]
    fn create_validates_path_and_mode() {
        let mut h = Harness::new();
        for body in [
            json!({"path": "relative/dir"}),
            json!({"path": "/tank/x", "mode": "999"}),
            json!({"path": "/tank/x", "mode": "75"}),
            json!({"mode": "755"}),
        ] {
            let err = h
                .call(create, CREATE, "POST", CREATE, Some(body.clone()))
                .unwrap_err();
            assert_eq!(err.http_status(), 400, "body {body}");
        }
    }
}
