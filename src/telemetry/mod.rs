//! Telemetry synthesizers: bounded walks and counters that keep live metrics plausible.
//!
//! Each domain module reads the current values from the state, advances them
//! one step, and writes them back. Primary fields are walked; dependent fields
//! are recomputed from them so totals stay consistent.

pub mod disk;
pub mod host;
pub mod network;
pub mod pool;
pub mod quantity;
pub mod walk;
