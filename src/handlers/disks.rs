//! Disk inventory with live usage/IO, and the WWN map.

use serde_json::json;

use crate::core::errors::Result;
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::telemetry::disk::{advance_disk, summarize};

/// `GET /api/disk/`: every call advances usage and IO counters one step.
pub fn list(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let telemetry = ctx.telemetry;
    for disk in ctx.state.disks.values_mut() {
        advance_disk(disk, &telemetry.disk, &telemetry.io, ctx.rng);
    }
    let summary = summarize(ctx.state.disks.values(), telemetry.disk.precision);
    let data: Vec<_> = ctx.state.disks.values().collect();
    Ok(HandlerReply::ok(json!({
        "data": data,
        "summary": summary,
    })))
}

/// `GET /api/disk/wwn/map/`
pub fn wwn_map(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.wwn_map })))
}
