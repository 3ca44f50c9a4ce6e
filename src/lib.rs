//! ACARS bridge - log-parsing engine with per-flight state aggregation
//!
//! This library parses textual ACARS datalink logs into per-flight message
//! histories and position fixes, and exposes the aggregated state to a small
//! HTTP query layer.

pub mod coordinates;
pub mod log_watcher;
pub mod parser;
pub mod state;
pub mod web;

pub use coordinates::Fix;
pub use parser::LogParser;
pub use state::AircraftStateStore;
