#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use storage_console_sim::adapter::{Simulator, TransportError};
use storage_console_sim::router::dispatch::{SimRequest, SimResponse};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_scsim") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "scsim.exe" } else { "scsim" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve scsim binary path for integration test"),
    }
}

/// Run the CLI with an isolated HOME so no user config leaks in.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("scsim-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");
    let home = root.join(format!("home-{}-{}", sanitize(case_name), now_millis()));
    fs::create_dir_all(&home).expect("create isolated home");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("HOME", &home)
        .env_remove("SCSIM_OUTPUT_FORMAT")
        .env_remove("SCSIM_SEED")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute scsim command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn simulator() -> Simulator {
    Simulator::seeded(42).expect("seeded simulator")
}

pub fn get(sim: &Simulator, url: &str) -> Result<SimResponse, TransportError> {
    sim.dispatch(&SimRequest::get(url))
}

pub fn post(sim: &Simulator, url: &str, body: Value) -> Result<SimResponse, TransportError> {
    sim.dispatch(&SimRequest::post(url, body))
}

pub fn delete(sim: &Simulator, url: &str, body: Value) -> Result<SimResponse, TransportError> {
    sim.dispatch(&SimRequest::delete(url, body))
}

/// Names in the pool capacity listing.
pub fn pool_names(sim: &Simulator) -> Vec<String> {
    let response = get(sim, "/api/zpool/").expect("pool list");
    response.body["data"]
        .as_array()
        .expect("pool array")
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect()
}
