//! OS accounts and web console accounts.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::core::errors::{Result, SimError};
use crate::handlers::auth::issue_token;
use crate::handlers::samba::remove_member_everywhere;
use crate::handlers::{now_rfc3339, optional_bool, optional_str, query_bool, required_str};
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::{Credential, OsUser, WebUser};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("username regex"));

const DEFAULT_SHELL: &str = "/bin/bash";

fn validate_username(username: &str) -> Result<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(SimError::validation(format!("Invalid username: {username}")))
    }
}

// ──────────────────────────── OS users ────────────────────────────

/// `GET /api/os/user/`: system accounts only with `?include_system=true`.
pub fn list_os_users(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let include_system = query_bool(ctx, "include_system");
    let data: BTreeMap<&String, OsUser> = ctx
        .state
        .os_users
        .iter()
        .filter(|(_, u)| include_system || !u.system)
        .map(|(name, u)| {
            let mut user = u.clone();
            user.has_samba_user = ctx.state.samba_users.contains_key(name);
            (name, user)
        })
        .collect();
    Ok(HandlerReply::ok(json!({ "data": data })))
}

/// `POST /api/os/user/create/`
pub fn create_os_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    validate_username(&username)?;
    let shell = optional_str(ctx, "login_shell").unwrap_or_else(|| DEFAULT_SHELL.to_string());
    if !shell.starts_with('/') {
        return Err(SimError::validation(format!("Invalid login shell: {shell}")));
    }
    if ctx.state.os_users.contains_key(&username) {
        return Err(SimError::conflict(format!("User {username} already exists")));
    }

    let uid = ctx.state.next_regular_uid();
    ctx.state.os_users.insert(
        username.clone(),
        OsUser {
            username: username.clone(),
            uid,
            gid: uid,
            home: format!("/home/{username}"),
            shell,
            system: false,
            has_samba_user: false,
        },
    );
    Ok(HandlerReply::created(json!({
        "detail": format!("User {username} created successfully")
    })))
}

/// `DELETE /api/os/user/delete/`: also drops the samba account and share memberships.
pub fn delete_os_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    if ctx.state.os_users.get(&username).is_some_and(|u| u.system) {
        return Err(SimError::validation(format!(
            "Refusing to delete system account {username}"
        )));
    }

    if ctx.state.os_users.remove(&username).is_none() {
        return Ok(HandlerReply::ok(json!({
            "detail": format!("User {username} does not exist; nothing to delete")
        })));
    }
    ctx.state.samba_users.remove(&username);
    let shares = remove_member_everywhere(&mut ctx.state.shares, &username);
    Ok(HandlerReply::ok(json!({
        "detail": format!(
            "User {username} deleted successfully ({} share(s) updated)",
            shares.len()
        )
    })))
}

// ──────────────────────────── web users ────────────────────────────

/// `GET /api/users/`
pub fn list_web_users(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.web_users })))
}

/// `POST /api/users/create/`: also registers a login credential.
pub fn create_web_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    validate_username(&username)?;
    let password = required_str(ctx, "password")?;
    let is_staff = optional_bool(ctx, "is_staff")?.unwrap_or(false);
    let is_superuser = optional_bool(ctx, "is_superuser")?.unwrap_or(false);
    if ctx.state.web_user(&username).is_some() || ctx.state.credentials.contains_key(&username) {
        return Err(SimError::conflict(format!("User {username} already exists")));
    }

    let user = WebUser {
        id: ctx.state.next_web_user_id(),
        username: username.clone(),
        email: optional_str(ctx, "email").unwrap_or_default(),
        first_name: optional_str(ctx, "first_name").unwrap_or_default(),
        last_name: optional_str(ctx, "last_name").unwrap_or_default(),
        is_active: true,
        is_staff: is_staff || is_superuser,
        is_superuser,
        date_joined: now_rfc3339(),
        last_login: None,
    };
    let token = issue_token(&username, &password, ctx.rng);
    ctx.state
        .credentials
        .insert(username.clone(), Credential { password, token });
    ctx.state.web_users.push(user.clone());

    Ok(HandlerReply::created(json!({
        "detail": format!("User {username} created successfully"),
        "data": user,
    })))
}

/// `DELETE /api/users/delete/`: unknown users are a no-op.
pub fn delete_web_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    let before = ctx.state.web_users.len();
    ctx.state.web_users.retain(|u| u.username != username);
    let removed = before != ctx.state.web_users.len();
    let had_credential = ctx.state.credentials.remove(&username).is_some();
    let detail = if removed || had_credential {
        format!("User {username} deleted successfully")
    } else {
        format!("User {username} does not exist; nothing to delete")
    };
    Ok(HandlerReply::ok(json!({ "detail": detail })))
}
