//! Volume (dataset) listing, creation and deletion.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::core::errors::{Result, SimError};
use crate::handlers::{optional_str, required_str};
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::Attributes;
use crate::telemetry::quantity::{Quantity, UnitFamily};

static DATASET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]*$").expect("dataset regex"));

/// `GET /api/volume/`
pub fn list(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.volumes })))
}

/// `POST /api/volume/create/`: `volume_name` is `pool/name`, nested names allowed.
pub fn create(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let full_name = required_str(ctx, "volume_name")?;
    let (pool, _) = full_name
        .split_once('/')
        .ok_or_else(|| SimError::validation("volume_name must be in the form pool/volume"))?;
    if full_name.split('/').any(|part| !DATASET_RE.is_match(part)) {
        return Err(SimError::validation(format!("Invalid volume name: {full_name}")));
    }

    let volsize_raw = required_str(ctx, "volsize")?;
    let volsize = Quantity::parse(&volsize_raw)?;
    if volsize.family() != UnitFamily::Bytes || volsize.magnitude <= 0.0 {
        return Err(SimError::validation(format!("Invalid volsize: {volsize_raw}")));
    }

    if !ctx.state.has_pool(pool) {
        return Err(SimError::not_found(format!("Pool {pool} not found")));
    }
    if ctx.state.volumes.contains_key(&full_name) {
        return Err(SimError::conflict(format!("Volume {full_name} already exists")));
    }

    let compression = optional_str(ctx, "compression").unwrap_or_else(|| "lz4".to_string());
    let mut attributes = Attributes::new();
    attributes.insert("type".into(), Value::from("volume"));
    attributes.insert("mountpoint".into(), Value::from("-"));
    attributes.insert("compression".into(), Value::from(compression));
    attributes.insert("volsize".into(), Value::from(volsize_raw));
    attributes.insert("used".into(), Value::from("0B"));
    attributes.insert("referenced".into(), Value::from("0B"));
    ctx.state.volumes.insert(full_name.clone(), attributes);

    Ok(HandlerReply::created(json!({
        "detail": format!("Volume {full_name} created successfully")
    })))
}

/// `DELETE /api/volume/delete/`: unknown volumes are a no-op.
pub fn delete(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let full_name = required_str(ctx, "volume_name")?;
    let detail = if ctx.state.volumes.remove(&full_name).is_some() {
        format!("Volume {full_name} deleted successfully")
    } else {
        format!("Volume {full_name} does not exist; nothing to delete")
    };
    Ok(HandlerReply::ok(json!({ "detail": detail })))
}
