//! systemd-style service listing and control actions.

use serde_json::json;

use crate::core::errors::{Result, SimError};
use crate::handlers::required_str;
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl ServiceAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            _ => None,
        }
    }

    fn apply(self, service: &mut Service) {
        match self {
            Self::Start | Self::Restart => {
                service.active_state = "active".to_string();
                service.sub_state = "running".to_string();
            }
            Self::Stop => {
                service.active_state = "inactive".to_string();
                service.sub_state = "dead".to_string();
            }
            Self::Enable => service.enabled = true,
            Self::Disable => service.enabled = false,
        }
    }

    const fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
            Self::Enable => "enabled",
            Self::Disable => "disabled",
        }
    }
}

/// `GET /api/service/`
pub fn list(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    Ok(HandlerReply::ok(json!({ "data": ctx.state.services })))
}

/// `POST /api/service/` with `{service, action}`.
pub fn action(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let unit = required_str(ctx, "service")?;
    let raw_action = required_str(ctx, "action")?;
    let action = ServiceAction::parse(&raw_action)
        .ok_or_else(|| SimError::validation(format!("Invalid action: {raw_action}")))?;

    let service = ctx
        .state
        .services
        .get_mut(&unit)
        .ok_or_else(|| SimError::not_found(format!("Service {unit} not found")))?;
    action.apply(service);

    Ok(HandlerReply::ok(json!({
        "detail": format!("Service {unit} {}", action.past_tense()),
        "data": ctx.state.services,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testkit::Harness;
    use serde_json::Value;

    const T: &str = "/api/service/";

    fn act(h: &mut Harness, body: Value) -> Result<HandlerReply> {
        h.call(action, T, "POST", T, Some(body))
    }

    #[test]
    fn stop_then_start_transitions_state() {
        let mut h = Harness::new();
        let reply = act(&mut h, json!({"service": "smbd", "action": "stop"})).unwrap();
        assert_eq!(reply.body["data"]["smbd"]["active_state"], "inactive");
        assert_eq!(h.state.services["smbd"].sub_state, "dead");

        act(&mut h, json!({"service": "smbd", "action": "start"})).unwrap();
        let smbd = &h.state.services["smbd"];
        assert_eq!(smbd.active_state, "active");
        assert_eq!(smbd.sub_state, "running");
    }

    #[test]
    fn enable_and_disable_toggle_only_the_flag() {
        let mut h = Harness::new();
        let before = h.state.services["nfs-server"].clone();
        act(&mut h, json!({"service": "nfs-server", "action": "enable"})).unwrap();
        let after = &h.state.services["nfs-server"];
        assert!(after.enabled);
        assert_eq!(after.active_state, before.active_state);
        act(&mut h, json!({"service": "nfs-server", "action": "disable"})).unwrap();
        assert!(!h.state.services["nfs-server"].enabled);
    }

    #[test]
    fn invalid_action_and_unknown_service() {
        let mut h = Harness::new();
        let err = act(&mut h, json!({"service": "smbd", "action": "explode"})).unwrap_err();
        assert_eq!(err.http_status(), 400);
        let err = act(&mut h, json!({"service": "nope", "action": "stop"})).unwrap_err();
        assert_eq!(err.http_status(), 404);
        let err = act(&mut h, json!({"action": "stop"})).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn list_is_keyed_by_unit() {
        let mut h = Harness::new();
        let reply = h.call(list, T, "GET", T, None).unwrap();
        assert_eq!(reply.body["data"]["ssh"]["unit"], "ssh");
    }
}
