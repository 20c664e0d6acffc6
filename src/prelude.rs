//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use storage_console_sim::prelude::*;
//! ```

// Core
pub use crate::core::config::SimConfig;
pub use crate::core::errors::{Result, SimError};

// Adapter
pub use crate::adapter::{Simulator, Transport, TransportError, shared};

// Routing
pub use crate::router::dispatch::{SimRequest, SimResponse};

// State
pub use crate::store::state::{Store, SystemState};

// Telemetry
pub use crate::telemetry::quantity::Quantity;
pub use crate::telemetry::walk::{CounterRange, WalkBounds, bounded_walk, counter_increment};
