#![forbid(unsafe_code)]

//! Storage console simulator (scsim): an in-process stand-in for a storage
//! appliance management API.
//!
//! Three parts:
//! 1. **Route dispatcher** matches requests against an ordered route table
//! 2. **Resource store** holds pools, volumes, shares and users, resettable to a baseline
//! 3. **Telemetry synthesizers** keep CPU, memory, disk, network and pool metrics moving
//!
//! # Library usage
//!
//! ```rust,no_run
//! use storage_console_sim::prelude::*;
//!
//! let sim = Simulator::seeded(7)?;
//! let pools = sim.dispatch(&SimRequest::get("/api/zpool/"));
//! # Ok::<(), SimError>(())
//! ```

pub mod prelude;

pub mod adapter;
pub mod core;
pub mod handlers;
pub mod logger;
pub mod router;
pub mod store;
pub mod telemetry;
