//! Route table and dispatcher: first registered match wins.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::core::config::TelemetryConfig;
use crate::core::errors::{Result, SimError};
use crate::router::pattern::{PathParams, RoutePattern};
use crate::store::state::{Store, SystemState};

/// Base used to resolve path-only request URLs.
static SIMULATOR_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://simulator.invalid/").expect("static base url"));

/// Outgoing request as the HTTP client describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRequest {
    pub method: String,
    /// Absolute URL or path with optional query string.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl SimRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new("POST", url).with_body(body)
    }

    #[must_use]
    pub fn delete(url: impl Into<String>, body: Value) -> Self {
        Self::new("DELETE", url).with_body(body)
    }
}

/// Response in the shape the HTTP client expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// What a handler returns on success.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReply {
    pub status: u16,
    pub body: Value,
}

impl HandlerReply {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    #[must_use]
    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }
}

/// Everything a handler may look at or touch during one invocation.
pub struct RequestContext<'a> {
    pub request: &'a SimRequest,
    pub path: &'a str,
    pub query: &'a BTreeMap<String, String>,
    pub params: &'a PathParams,
    pub telemetry: &'a TelemetryConfig,
    pub state: &'a mut SystemState,
    pub rng: &'a mut StdRng,
}

pub type Handler = fn(&mut RequestContext<'_>) -> Result<HandlerReply>;

/// One row of the route table before compilation.
#[derive(Clone, Copy)]
pub struct RouteSpec {
    pub method: &'static str,
    pub template: &'static str,
    pub name: &'static str,
    pub handler: Handler,
}

struct Route {
    method: &'static str,
    pattern: RoutePattern,
    name: &'static str,
    handler: Handler,
}

/// Summary row for listing the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub template: String,
    pub name: &'static str,
}

/// Ordered, compiled route table.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile `specs` in order.
    ///
    /// Two routes with the same method and the same path shape, or the same
    /// name, are a configuration error.
    pub fn compile(specs: &[RouteSpec]) -> Result<Self> {
        let mut seen_shapes = HashSet::new();
        let mut seen_names = HashSet::new();
        let mut routes = Vec::with_capacity(specs.len());
        for spec in specs {
            let pattern = RoutePattern::compile(spec.template)?;
            let method = spec.method;
            if !seen_shapes.insert((method.to_ascii_uppercase(), pattern.shape())) {
                return Err(SimError::RouteConflict {
                    details: format!("duplicate route {method} {}", spec.template),
                });
            }
            if !seen_names.insert(spec.name) {
                return Err(SimError::RouteConflict {
                    details: format!("duplicate route name {:?}", spec.name),
                });
            }
            routes.push(Route {
                method,
                pattern,
                name: spec.name,
                handler: spec.handler,
            });
        }
        Ok(Self { routes })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[must_use]
    pub fn describe(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|r| RouteInfo {
                method: r.method,
                template: r.pattern.template().to_string(),
                name: r.name,
            })
            .collect()
    }

    fn find(&self, method: &str, path: &str) -> Option<(&Route, PathParams)> {
        self.routes.iter().find_map(|route| {
            if !route.method.eq_ignore_ascii_case(method) {
                return None;
            }
            route.pattern.matches(path).map(|params| (route, params))
        })
    }
}

/// Result of one dispatch, with the matched route kept for logging.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub route: Option<&'static str>,
    pub path: String,
    pub result: Result<SimResponse>,
}

pub struct Dispatcher {
    table: RouteTable,
    telemetry: TelemetryConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable, telemetry: TelemetryConfig) -> Self {
        Self { table, telemetry }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Match `request`, run its handler under the store lock, and shape the reply.
    ///
    /// Handler errors pass through unchanged.
    pub fn dispatch(&self, store: &Store, request: &SimRequest) -> DispatchOutcome {
        let (path, query) = match split_target(&request.url) {
            Ok(target) => target,
            Err(err) => {
                return DispatchOutcome {
                    route: None,
                    path: request.url.clone(),
                    result: Err(err),
                };
            }
        };

        let Some((route, params)) = self.table.find(&request.method, &path) else {
            let err = SimError::Unrouted {
                method: request.method.to_ascii_uppercase(),
                path: path.clone(),
            };
            return DispatchOutcome {
                route: None,
                path,
                result: Err(err),
            };
        };

        let reply = store.with_state(|state, rng| {
            let mut ctx = RequestContext {
                request,
                path: &path,
                query: &query,
                params: &params,
                telemetry: &self.telemetry,
                state,
                rng,
            };
            (route.handler)(&mut ctx)
        });

        let result = reply.map(|reply| {
            let mut headers = BTreeMap::new();
            headers.insert("content-type".to_string(), "application/json".to_string());
            headers.insert("x-scsim-route".to_string(), route.name.to_string());
            SimResponse {
                status: reply.status,
                status_text: status_text(reply.status).to_string(),
                headers,
                body: reply.body,
            }
        });
        DispatchOutcome {
            route: Some(route.name),
            path,
            result,
        }
    }
}

/// Path and decoded query parameters of a request URL. Later duplicates win.
pub fn split_target(raw: &str) -> Result<(String, BTreeMap<String, String>)> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => SIMULATOR_BASE
            .join(raw)
            .map_err(|e| SimError::validation(format!("Malformed request URL {raw:?}: {e}")))?,
        Err(e) => {
            return Err(SimError::validation(format!(
                "Malformed request URL {raw:?}: {e}"
            )));
        }
    };
    let query = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok((url.path().to_string(), query))
}

#[must_use]
pub const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "",
    }
}
