//! Resource state: typed records, the baseline fixture, and the resettable store.

pub mod baseline;
pub mod model;
pub mod state;
