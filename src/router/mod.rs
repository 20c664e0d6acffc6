//! Request routing: path templates and the ordered dispatcher.

pub mod dispatch;
pub mod pattern;

pub use dispatch::{Dispatcher, RouteTable, SimRequest, SimResponse};
