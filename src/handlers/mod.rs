//! Resource handlers and the route table that binds them to paths.
//!
//! Every handler runs with the store lock held, validates its input first,
//! and returns a `SimError` as soon as a precondition fails.

pub mod auth;
pub mod dirs;
pub mod disks;
pub mod metrics;
pub mod network;
pub mod pools;
pub mod power;
pub mod samba;
pub mod services;
pub mod users;
pub mod volumes;

use serde_json::{Map, Value};

use crate::core::errors::{Result, SimError};
use crate::router::dispatch::{RequestContext, RouteSpec};

/// The full request surface, in match order.
pub const ROUTES: &[RouteSpec] = &[
    route("POST", "/auth-token/", "auth_token", auth::obtain_token),
    route("GET", "/api/zpool/", "pool_list", pools::list),
    route("POST", "/api/zpool/create/", "pool_create", pools::create),
    route("DELETE", "/api/zpool/delete/", "pool_delete", pools::delete),
    route("GET", "/api/zpool/{name}/", "pool_detail", pools::detail),
    route("GET", "/api/volume/", "volume_list", volumes::list),
    route("POST", "/api/volume/create/", "volume_create", volumes::create),
    route("DELETE", "/api/volume/delete/", "volume_delete", volumes::delete),
    route("GET", "/api/disk/", "disk_list", disks::list),
    route("GET", "/api/disk/wwn/map/", "disk_wwn_map", disks::wwn_map),
    route("GET", "/api/net/", "net_list", network::list),
    route(
        "POST",
        "/api/net/nicfile/{iface}/ip/edit/",
        "net_ip_edit",
        network::edit_ip,
    ),
    route("GET", "/api/cpu/", "cpu", metrics::cpu),
    route("GET", "/api/memory/", "memory", metrics::memory),
    route("GET", "/api/service/", "service_list", services::list),
    route("POST", "/api/service/", "service_action", services::action),
    route("GET", "/api/os/user/", "os_user_list", users::list_os_users),
    route(
        "POST",
        "/api/os/user/create/",
        "os_user_create",
        users::create_os_user,
    ),
    route(
        "DELETE",
        "/api/os/user/delete/",
        "os_user_delete",
        users::delete_os_user,
    ),
    route(
        "GET",
        "/api/samba/user/list/",
        "samba_user_list",
        samba::list_users,
    ),
    route("POST", "/api/samba/user/add/", "samba_user_add", samba::add_user),
    route(
        "POST",
        "/api/samba/user/enable/",
        "samba_user_enable",
        samba::enable_user,
    ),
    route(
        "POST",
        "/api/samba/user/passwd/",
        "samba_user_passwd",
        samba::change_password,
    ),
    route("GET", "/api/samba/", "share_list", samba::list_shares),
    route(
        "POST",
        "/api/samba/config/append/",
        "share_append",
        samba::append_share,
    ),
    route(
        "DELETE",
        "/api/samba/config/remove/",
        "share_remove",
        samba::remove_share,
    ),
    route(
        "POST",
        "/api/dir/create/permissions/",
        "dir_permissions_create",
        dirs::create,
    ),
    route(
        "GET",
        "/api/dir/info/permissions/",
        "dir_permissions_info",
        dirs::info,
    ),
    route("GET", "/api/os/power/restart/", "power_restart", power::restart),
    route(
        "GET",
        "/api/os/power/shutdown/",
        "power_shutdown",
        power::shutdown,
    ),
    route("GET", "/api/users/", "web_user_list", users::list_web_users),
    route(
        "POST",
        "/api/users/create/",
        "web_user_create",
        users::create_web_user,
    ),
    route(
        "DELETE",
        "/api/users/delete/",
        "web_user_delete",
        users::delete_web_user,
    ),
];

const fn route(
    method: &'static str,
    template: &'static str,
    name: &'static str,
    handler: crate::router::dispatch::Handler,
) -> RouteSpec {
    RouteSpec {
        method,
        template,
        name,
        handler,
    }
}

// ──────────────────────── request body helpers ────────────────────────

fn body_object<'a>(ctx: &'a RequestContext<'_>) -> Option<&'a Map<String, Value>> {
    ctx.request.body.as_ref().and_then(Value::as_object)
}

fn field<'a>(ctx: &'a RequestContext<'_>, name: &str) -> Option<&'a Value> {
    body_object(ctx)
        .and_then(|body| body.get(name))
        .filter(|v| !v.is_null())
}

/// Trimmed string field, `None` when absent, null or blank.
pub(crate) fn optional_str(ctx: &RequestContext<'_>, name: &str) -> Option<String> {
    match field(ctx, name)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn required_str(ctx: &RequestContext<'_>, name: &str) -> Result<String> {
    optional_str(ctx, name).ok_or_else(|| SimError::validation(format!("{name} is required")))
}

/// Boolean field; accepts JSON booleans and the strings `true`/`false`/`1`/`0`.
pub(crate) fn optional_bool(ctx: &RequestContext<'_>, name: &str) -> Result<Option<bool>> {
    match field(ctx, name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => parse_bool(s)
            .map(Some)
            .ok_or_else(|| SimError::validation(format!("{name} must be a boolean"))),
        Some(_) => Err(SimError::validation(format!("{name} must be a boolean"))),
    }
}

/// List field given either as a JSON array of strings or one comma/space separated string.
pub(crate) fn string_list(ctx: &RequestContext<'_>, name: &str) -> Result<Vec<String>> {
    let items: Vec<String> = match field(ctx, name) {
        None => Vec::new(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SimError::validation(format!("{name} must contain strings")))
            })
            .collect::<Result<_>>()?,
        Some(Value::String(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
        Some(_) => {
            return Err(SimError::validation(format!(
                "{name} must be a list of strings"
            )));
        }
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

pub(crate) fn query_bool(ctx: &RequestContext<'_>, name: &str) -> bool {
    ctx.query
        .get(name)
        .and_then(|raw| parse_bool(raw))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
