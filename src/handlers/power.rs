//! Canned power action results.

use serde_json::json;

use crate::core::errors::{Result, SimError};
use crate::router::dispatch::{HandlerReply, RequestContext};

/// `GET /api/os/power/restart/`
pub fn restart(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    power_action(ctx, "restart")
}

/// `GET /api/os/power/shutdown/`
pub fn shutdown(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    power_action(ctx, "shutdown")
}

fn power_action(ctx: &RequestContext<'_>, kind: &str) -> Result<HandlerReply> {
    let result = ctx
        .state
        .power_actions
        .get(kind)
        .ok_or_else(|| SimError::not_found(format!("Power action {kind} is not available")))?;
    Ok(HandlerReply::ok(json!(result)))
}
