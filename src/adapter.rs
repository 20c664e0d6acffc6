//! Transport entry point: the one place simulator errors become transport errors.
//!
//! A [`Simulator`] owns the store, the compiled route table and the request
//! log. Callers that want a process-wide instance use [`shared`].

#![allow(missing_docs)]

use std::sync::OnceLock;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;

use crate::core::config::SimConfig;
use crate::core::errors::{Result, SimError};
use crate::handlers::ROUTES;
use crate::logger::RequestLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::logger::stats::{RequestStats, StatsSnapshot};
use crate::router::dispatch::{
    DispatchOutcome, Dispatcher, RouteInfo, RouteTable, SimRequest, SimResponse,
};
use crate::store::baseline;
use crate::store::state::{Store, SystemState};

/// Rejection seen by a transport caller, shaped like a real backend failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP {status}: {message}")]
pub struct TransportError {
    pub status: u16,
    pub message: String,
    /// `{detail}` envelope.
    pub body: Value,
}

impl From<&SimError> for TransportError {
    fn from(err: &SimError) -> Self {
        Self {
            status: err.http_status(),
            message: err.detail(),
            body: err.envelope(),
        }
    }
}

/// Anything that can carry a request to a management API.
pub trait Transport {
    fn send(&self, request: &SimRequest) -> std::result::Result<SimResponse, TransportError>;
}

pub struct Simulator {
    config: SimConfig,
    store: Store,
    dispatcher: Dispatcher,
    log: RequestLog,
    stats: RequestStats,
}

impl Simulator {
    /// Validate `config`, load the baseline and compile the route table.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let baseline = match &config.simulator.baseline_file {
            Some(path) => baseline::load(path)?,
            None => baseline::builtin()?,
        };
        let table = RouteTable::compile(ROUTES)?;
        let dispatcher = Dispatcher::new(table, config.telemetry.clone());
        let log = RequestLog::from_config(&config.logging);

        let sim = Self {
            store: Store::new(baseline, config.simulator.seed),
            dispatcher,
            log,
            stats: RequestStats::new(),
            config,
        };
        let mut entry = LogEntry::new(EventType::SimulatorStart, Severity::Info);
        entry.details = Some(format!(
            "routes={} seed={} config_hash={}",
            sim.dispatcher.table().len(),
            sim.config
                .simulator
                .seed
                .map_or_else(|| "random".to_string(), |s| s.to_string()),
            sim.config.stable_hash()?,
        ));
        sim.log.write(&entry);
        Ok(sim)
    }

    /// Default configuration with a fixed RNG seed.
    pub fn seeded(seed: u64) -> Result<Self> {
        let mut config = SimConfig::default();
        config.simulator.seed = Some(seed);
        Self::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Deep copy of the live state.
    #[must_use]
    pub fn snapshot(&self) -> SystemState {
        self.store.snapshot()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.dispatcher.table().describe()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch one request and translate failures into [`TransportError`].
    pub fn dispatch(&self, request: &SimRequest) -> std::result::Result<SimResponse, TransportError> {
        let started = Instant::now();
        let outcome = self.dispatcher.dispatch(&self.store, request);
        let elapsed = started.elapsed();
        self.record(request, &outcome, elapsed);

        outcome.result.map_err(|err| {
            if !err.is_request_error() {
                eprintln!("[SCSIM-DISPATCH] internal failure: {err}");
            }
            TransportError::from(&err)
        })
    }

    /// Restore the baseline. Call between requests, never during one.
    pub fn reset(&self) {
        self.store.reset();
        self.stats.record_reset();
        self.log
            .write(&LogEntry::new(EventType::StoreReset, Severity::Info));
    }

    fn record(&self, request: &SimRequest, outcome: &DispatchOutcome, elapsed: std::time::Duration) {
        let (status, failure) = match &outcome.result {
            Ok(response) => (response.status, None),
            Err(err) => (err.http_status(), Some(err)),
        };
        self.stats
            .record(outcome.route, status, failure.is_some(), elapsed);

        if !self.log.is_enabled() {
            return;
        }
        let severity = match failure {
            None => Severity::Info,
            Some(err) if err.is_request_error() => Severity::Warning,
            Some(_) => Severity::Error,
        };
        let mut entry = LogEntry::new(EventType::Request, severity);
        entry.method = Some(request.method.to_ascii_uppercase());
        entry.path = Some(outcome.path.clone());
        entry.route = outcome.route.map(str::to_string);
        entry.status = Some(status);
        entry.duration_us = Some(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
        if let Some(err) = failure {
            entry.error_code = Some(err.code().to_string());
            entry.error_message = Some(err.detail());
        }
        self.log.write(&entry);
    }
}

impl Transport for Simulator {
    fn send(&self, request: &SimRequest) -> std::result::Result<SimResponse, TransportError> {
        self.dispatch(request)
    }
}

static SHARED: OnceLock<Simulator> = OnceLock::new();

/// Process-wide simulator, built on first use from the default config path.
pub fn shared() -> Result<&'static Simulator> {
    if let Some(sim) = SHARED.get() {
        return Ok(sim);
    }
    let sim = Simulator::new(SimConfig::load(None)?)?;
    Ok(SHARED.get_or_init(|| sim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sim() -> Simulator {
        Simulator::seeded(11).expect("simulator")
    }

    #[test]
    fn success_carries_route_header() {
        let sim = sim();
        let response = sim.dispatch(&SimRequest::get("/api/zpool/")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers["x-scsim-route"], "pool_list");
        assert_eq!(response.headers["content-type"], "application/json");
    }

    #[test]
    fn unrouted_request_is_offline_404() {
        let sim = sim();
        let err = sim.dispatch(&SimRequest::get("/api/nothing/here/")).unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.body["detail"], crate::core::errors::OFFLINE_UNSUPPORTED);
        assert_eq!(err.body["path"], "/api/nothing/here/");
    }

    #[test]
    fn domain_errors_become_transport_errors() {
        let sim = sim();
        let err = sim
            .dispatch(&SimRequest::post("/api/zpool/create/", json!({})))
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "pool_name is required");
        assert_eq!(err.body, json!({"detail": "pool_name is required"}));
    }

    #[test]
    fn stats_track_dispatches_and_resets() {
        let sim = sim();
        sim.dispatch(&SimRequest::get("/api/cpu/")).unwrap();
        let _ = sim.dispatch(&SimRequest::get("/nope"));
        sim.reset();
        let stats = sim.stats();
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.resets, 1);
        assert_eq!(stats.routes["cpu"].calls, 1);
    }

    #[test]
    fn request_log_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");
        let mut config = SimConfig::default();
        config.simulator.seed = Some(1);
        config.logging.enabled = true;
        config.logging.jsonl_log = path.clone();
        let sim = Simulator::new(config).unwrap();
        sim.dispatch(&SimRequest::get("/api/memory/")).unwrap();
        let _ = sim.dispatch(&SimRequest::delete("/api/zpool/delete/", json!({})));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "simulator_start");
        assert_eq!(lines[1]["route"], "memory");
        assert_eq!(lines[2]["status"], 400);
        assert_eq!(lines[2]["error_code"], "SIM-1001");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimConfig::default();
        config.telemetry.cpu.min = 80.0;
        config.telemetry.cpu.max = 10.0;
        assert!(matches!(
            Simulator::new(config),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn transport_trait_object_works() {
        let sim = sim();
        let transport: &dyn Transport = &sim;
        let response = transport.send(&SimRequest::get("/api/memory/")).unwrap();
        assert!(response.body["total"].as_u64().unwrap() > 0);
    }
}
