//! Network interfaces: live bandwidth and IPv4 address edits.

use std::net::Ipv4Addr;

use serde_json::json;

use crate::core::errors::{Result, SimError};
use crate::handlers::required_str;
use crate::router::dispatch::{HandlerReply, RequestContext};
use crate::store::model::InterfaceAddress;
use crate::telemetry::network::advance_interface;

const AF_INET: &str = "AF_INET";

/// `GET /api/net/`
pub fn list(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let telemetry = ctx.telemetry;
    for iface in ctx.state.interfaces.values_mut() {
        advance_interface(iface, &telemetry.network, ctx.rng);
    }
    Ok(HandlerReply::ok(json!({ "interfaces": ctx.state.interfaces })))
}

/// `POST /api/net/nicfile/{iface}/ip/edit/`: replace the interface's IPv4 entry.
pub fn edit_ip(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let name = ctx.params.get("iface").unwrap_or_default().to_string();
    let ip = parse_ipv4(&required_str(ctx, "ip")?, "ip")?;
    let netmask = parse_ipv4(&required_str(ctx, "netmask")?, "netmask")?;
    if !is_contiguous_mask(netmask) {
        return Err(SimError::validation(format!("Invalid netmask: {netmask}")));
    }

    let iface = ctx
        .state
        .interfaces
        .get_mut(&name)
        .ok_or_else(|| SimError::not_found(format!("Interface {name} not found")))?;

    let broadcast = Ipv4Addr::from(u32::from(ip) | !u32::from(netmask));
    let entry = InterfaceAddress {
        family: AF_INET.to_string(),
        address: ip.to_string(),
        netmask: Some(netmask.to_string()),
        broadcast: Some(broadcast.to_string()),
    };
    match iface.addresses.iter_mut().find(|a| a.family == AF_INET) {
        Some(existing) => *existing = entry,
        None => iface.addresses.push(entry),
    }

    Ok(HandlerReply::ok(json!({
        "detail": format!("IP address of {name} updated to {ip}/{netmask}")
    })))
}

fn parse_ipv4(raw: &str, field: &str) -> Result<Ipv4Addr> {
    raw.parse()
        .map_err(|_| SimError::validation(format!("Invalid {field}: {raw}")))
}

fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits.leading_ones() + bits.trailing_zeros() == 32
}
