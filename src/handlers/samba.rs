//! Samba accounts and share definitions.

use serde_json::{Value, json};

use crate::core::errors::{Result, SimError};
use crate::handlers::{now_rfc3339, optional_bool, optional_str, required_str, string_list};
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::{Attributes, SambaUser};

/// Share attribute holding the space separated member list.
pub(crate) const VALID_USERS: &str = "valid users";

const DEFAULT_DOMAIN: &str = "STORAGE";

// ──────────────────────────── membership ────────────────────────────

/// Members of a share: user names and `@group` tokens, in stored order.
pub(crate) fn share_members(attrs: &Attributes) -> Vec<String> {
    match attrs.get(VALID_USERS) {
        Some(Value::String(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn set_share_members(attrs: &mut Attributes, members: &[String]) {
    attrs.insert(VALID_USERS.to_string(), Value::from(members.join(" ")));
}

/// Drop `user` from every share's member list. Returns the touched share names.
pub(crate) fn remove_member_everywhere(
    shares: &mut std::collections::BTreeMap<String, Attributes>,
    user: &str,
) -> Vec<String> {
    let mut touched = Vec::new();
    for (name, attrs) in shares.iter_mut() {
        let mut members = share_members(attrs);
        let before = members.len();
        members.retain(|m| m != user);
        if members.len() != before {
            set_share_members(attrs, &members);
            touched.push(name.clone());
        }
    }
    touched
}

/// Requested members from `valid_users` plus `valid_groups` (as `@group`).
fn requested_members(ctx: &RequestContext<'_>) -> Result<Vec<String>> {
    let mut members = string_list(ctx, "valid_users")?;
    members.extend(string_list(ctx, "valid_groups")?.into_iter().map(|g| {
        if g.starts_with('@') { g } else { format!("@{g}") }
    }));
    Ok(members)
}

// ──────────────────────────── users ────────────────────────────

/// `GET /api/samba/user/list/`
pub fn list_users(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.samba_users })))
}

/// `POST /api/samba/user/add/`: the OS account must already exist.
pub fn add_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    required_str(ctx, "password")?;

    let Some(os_user) = ctx.state.os_users.get_mut(&username) else {
        return Err(SimError::not_found(format!("OS user {username} not found")));
    };
    if ctx.state.samba_users.contains_key(&username) {
        return Err(SimError::conflict(format!(
            "Samba user {username} already exists"
        )));
    }
    os_user.has_samba_user = true;

    let mut attributes = Attributes::new();
    attributes.insert("domain".into(), Value::from(DEFAULT_DOMAIN));
    attributes.insert("password_last_set".into(), Value::from(now_rfc3339()));
    ctx.state.samba_users.insert(
        username.clone(),
        SambaUser {
            username: username.clone(),
            disabled: false,
            attributes,
        },
    );
    Ok(HandlerReply::created(json!({
        "detail": format!("Samba user {username} added successfully")
    })))
}

/// `POST /api/samba/user/enable/`: `enable` defaults to true.
pub fn enable_user(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    let enable = optional_bool(ctx, "enable")?.unwrap_or(true);
    let user = ctx
        .state
        .samba_users
        .get_mut(&username)
        .ok_or_else(|| SimError::not_found(format!("Samba user {username} not found")))?;
    user.disabled = !enable;
    let verb = if enable { "enabled" } else { "disabled" };
    Ok(HandlerReply::ok(json!({
        "detail": format!("Samba user {username} {verb}")
    })))
}

/// `POST /api/samba/user/passwd/`
pub fn change_password(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    required_str(ctx, "password")?;
    let user = ctx
        .state
        .samba_users
        .get_mut(&username)
        .ok_or_else(|| SimError::not_found(format!("Samba user {username} not found")))?;
    user.attributes
        .insert("password_last_set".into(), Value::from(now_rfc3339()));
    Ok(HandlerReply::ok(json!({
        "detail": format!("Password for {username} changed successfully")
    })))
}

// ──────────────────────────── shares ────────────────────────────

/// `GET /api/samba/`
pub fn list_shares(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.shares })))
}

/// `POST /api/samba/config/append/`: create the share or add members to it.
pub fn append_share(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let full_path = required_str(ctx, "full_path")?;
    if !full_path.starts_with('/') {
        return Err(SimError::validation(format!(
            "full_path must be absolute: {full_path}"
        )));
    }
    let share_name = match optional_str(ctx, "share_name") {
        Some(name) => name,
        None => full_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SimError::validation("share_name is required for /"))?,
    };
    let requested = requested_members(ctx)?;

    if let Some(attrs) = ctx.state.shares.get_mut(&share_name) {
        let mut members = share_members(attrs);
        let mut added = 0_usize;
        for member in requested {
            if !members.contains(&member) {
                members.push(member);
                added += 1;
            }
        }
        set_share_members(attrs, &members);
        return Ok(HandlerReply::ok(json!({
            "detail": format!("Share {share_name} updated ({added} member(s) added)")
        })));
    }

    let mut members: Vec<String> = Vec::new();
    for member in requested {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    let mut attrs = Attributes::new();
    attrs.insert("path".into(), Value::from(full_path));
    attrs.insert("browseable".into(), Value::from("yes"));
    attrs.insert("read only".into(), Value::from("no"));
    set_share_members(&mut attrs, &members);
    ctx.state.shares.insert(share_name.clone(), attrs);
    Ok(HandlerReply::created(json!({
        "detail": format!("Share {share_name} created successfully")
    })))
}

/// `DELETE /api/samba/config/remove/`: drop listed members, or the whole share.
pub fn remove_share(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let share_name = required_str(ctx, "share_name")?;
    let requested = requested_members(ctx)?;

    let detail = if requested.is_empty() {
        match ctx.state.shares.remove(&share_name) {
            Some(_) => format!("Share {share_name} removed successfully"),
            None => format!("Share {share_name} does not exist; nothing to remove"),
        }
    } else {
        match ctx.state.shares.get_mut(&share_name) {
            Some(attrs) => {
                let mut members = share_members(attrs);
                members.retain(|m| !requested.contains(m));
                set_share_members(attrs, &members);
                format!("Members removed from share {share_name}")
            }
            None => format!("Share {share_name} does not exist; nothing to remove"),
        }
    };
    Ok(HandlerReply::ok(json!({ "detail": detail })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testkit::Harness;

    const APPEND: &str = "/api/samba/config/append/";
    const REMOVE: &str = "/api/samba/config/remove/";

    fn post(h: &mut Harness, handler: crate::router::dispatch::Handler, t: &str, body: Value) -> Result<HandlerReply> {
        h.call(handler, t, "POST", t, Some(body))
    }

    #[test]
    fn members_parse_from_string_or_array() {
        let mut attrs = Attributes::new();
        attrs.insert(VALID_USERS.into(), Value::from("admin, alice  @staff"));
        assert_eq!(share_members(&attrs), ["admin", "alice", "@staff"]);
        attrs.insert(VALID_USERS.into(), json!(["bob"]));
        assert_eq!(share_members(&attrs), ["bob"]);
    }

    #[test]
    fn append_creates_share_named_after_path() {
        let mut h = Harness::new();
        let reply = post(
            &mut h,
            append_share,
            APPEND,
            json!({"full_path": "/tank/projects/", "valid_users": ["alice"], "valid_groups": "staff"}),
        )
        .unwrap();
        assert_eq!(reply.status, 201);
        let share = &h.state.shares["projects"];
        assert_eq!(share["path"], "/tank/projects/");
        assert_eq!(share_members(share), ["alice", "@staff"]);
    }

    #[test]
    fn append_to_existing_share_skips_duplicates() {
        let mut h = Harness::new();
        post(
            &mut h,
            append_share,
            APPEND,
            json!({"full_path": "/tank/data", "valid_users": "alice bob"}),
        )
        .unwrap();
        assert_eq!(
            share_members(&h.state.shares["data"]),
            ["admin", "alice", "@staff", "bob"]
        );
    }

    #[test]
    fn append_requires_absolute_path() {
        let mut h = Harness::new();
        let err = post(&mut h, append_share, APPEND, json!({"full_path": "tank/x"})).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn remove_members_or_whole_share() {
        let mut h = Harness::new();
        h.call(
            remove_share,
            REMOVE,
            "DELETE",
            REMOVE,
            Some(json!({"share_name": "data", "valid_users": ["alice"]})),
        )
        .unwrap();
        assert_eq!(share_members(&h.state.shares["data"]), ["admin", "@staff"]);

        h.call(
            remove_share,
            REMOVE,
            "DELETE",
            REMOVE,
            Some(json!({"share_name": "data"})),
        )
        .unwrap();
        assert!(!h.state.shares.contains_key("data"));

        let before = h.state.clone();
        let reply = h
            .call(
                remove_share,
                REMOVE,
                "DELETE",
                REMOVE,
                Some(json!({"share_name": "data"})),
            )
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(h.state, before);
    }

    #[test]
    fn add_user_links_os_account() {
        let mut h = Harness::new();
        let t = "/api/samba/user/add/";
        let reply = post(&mut h, add_user, t, json!({"username": "bob", "password": "pw"})).unwrap();
        assert_eq!(reply.status, 201);
        assert!(h.state.os_users["bob"].has_samba_user);
        assert!(!h.state.samba_users["bob"].disabled);

        let err = post(&mut h, add_user, t, json!({"username": "bob", "password": "pw"})).unwrap_err();
        assert_eq!(err.http_status(), 409);
        let err = post(&mut h, add_user, t, json!({"username": "ghost", "password": "pw"})).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn enable_defaults_to_true_and_accepts_false() {
        let mut h = Harness::new();
        let t = "/api/samba/user/enable/";
        post(&mut h, enable_user, t, json!({"username": "carol"})).unwrap();
        assert!(!h.state.samba_users["carol"].disabled);
        post(&mut h, enable_user, t, json!({"username": "carol", "enable": "false"})).unwrap();
        assert!(h.state.samba_users["carol"].disabled);
        let err = post(&mut h, enable_user, t, json!({"username": "zed"})).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn password_change_touches_timestamp() {
        let mut h = Harness::new();
        let t = "/api/samba/user/passwd/";
        let before = h.state.samba_users["alice"].attributes["password_last_set"].clone();
        post(&mut h, change_password, t, json!({"username": "alice", "password": "n3w"})).unwrap();
        assert_ne!(h.state.samba_users["alice"].attributes["password_last_set"], before);
        let err = post(&mut h, change_password, t, json!({"username": "alice"})).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
