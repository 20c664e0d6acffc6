//! Request activity log (JSONL with graceful degradation) and dispatch counters.

pub mod jsonl;
pub mod stats;

use parking_lot::Mutex;

use crate::core::config::LoggingConfig;
use crate::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry};

/// Optional JSONL sink shared by every dispatch of one simulator.
pub struct RequestLog {
    writer: Option<Mutex<JsonlWriter>>,
}

impl RequestLog {
    /// A log that drops every entry.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { writer: None }
    }

    #[must_use]
    pub fn from_config(cfg: &LoggingConfig) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        Self {
            writer: Some(Mutex::new(JsonlWriter::open(JsonlConfig::from(cfg)))),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn write(&self, entry: &LogEntry) {
        if let Some(writer) = &self.writer {
            writer.lock().write_entry(entry);
        }
    }
}
