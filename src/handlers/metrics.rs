//! Live CPU and memory snapshots.

use serde_json::json;

use crate::core::errors::Result;
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::telemetry::host::{advance_cpu, advance_memory};

/// `GET /api/cpu/`
pub fn cpu(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let telemetry = ctx.telemetry;
    advance_cpu(&mut ctx.state.cpu, &telemetry.cpu, ctx.rng);
    Ok(HandlerReply::ok(json!(ctx.state.cpu)))
}

/// `GET /api/memory/`
pub fn memory(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let telemetry = ctx.telemetry;
    advance_memory(&mut ctx.state.memory, &telemetry.memory, ctx.rng);
    Ok(HandlerReply::ok(json!(ctx.state.memory)))
}
