//! Per-flight aggregated state shared between the parser and the query layer
//!
//! One writer (the log poll task) and any number of HTTP readers share the
//! store. A single coarse `RwLock` around the whole map is plenty at one
//! writer cycle per poll interval, and it guarantees readers always see a
//! whole fix, never half of one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::coordinates::Fix;

/// Placeholder registration used when a Flight ID line carries no tail number.
pub const UNKNOWN_REGISTRATION: &str = "???";

/// Everything we know about one flight, keyed by its flight identifier.
#[derive(Debug, Clone)]
pub struct FlightState {
    /// Tail number from the first Flight ID line that carried one.
    pub registration: String,
    /// Committed message blocks, append-only, in commit order.
    pub messages: Vec<String>,
    /// Refreshed every time the identity is (re)bound.
    pub last_seen: DateTime<Utc>,
    /// Last decoded position, overwritten whole on each update.
    pub fix: Option<Fix>,
}

/// Summary record served at `/data.json`.
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub flight: String,
    pub reg: String,
    pub msgs_count: usize,
    /// Epoch seconds.
    pub last_seen: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Process-wide flight map. Entries are never evicted; see DESIGN.md for the
/// growth discussion.
#[derive(Debug, Default)]
pub struct AircraftStateStore {
    flights: RwLock<HashMap<String, FlightState>>,
}

impl AircraftStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the flight if it is unknown. An existing flight keeps its
    /// original registration.
    pub async fn ensure_flight(&self, flight: &str, registration: &str) {
        let mut flights = self.flights.write().await;
        flights
            .entry(flight.to_string())
            .or_insert_with(|| FlightState {
                registration: registration.to_string(),
                messages: Vec::new(),
                last_seen: Utc::now(),
                fix: None,
            });
    }

    pub async fn refresh_last_seen(&self, flight: &str) {
        if let Some(state) = self.flights.write().await.get_mut(flight) {
            state.last_seen = Utc::now();
        }
    }

    /// Overwrite the flight's fix with a complete lat/lon pair.
    pub async fn set_fix(&self, flight: &str, latitude: f64, longitude: f64) {
        if let Some(state) = self.flights.write().await.get_mut(flight) {
            state.fix = Some(Fix {
                latitude,
                longitude,
            });
        }
    }

    pub async fn append_history(&self, flight: &str, block_text: String) {
        if let Some(state) = self.flights.write().await.get_mut(flight) {
            state.messages.push(block_text);
        }
    }

    /// Summaries of every known flight, in unspecified order.
    pub async fn list_summaries(&self) -> Vec<FlightSummary> {
        let flights = self.flights.read().await;
        flights
            .iter()
            .map(|(flight, state)| {
                // A fix with either axis at exactly 0.0 is reported as
                // absent. This matches the feed consumers' presence check
                // and is pinned by tests.
                let (lat, lon) = match state.fix {
                    Some(fix) if fix.latitude != 0.0 && fix.longitude != 0.0 => {
                        (Some(fix.latitude), Some(fix.longitude))
                    }
                    _ => (None, None),
                };
                FlightSummary {
                    flight: flight.clone(),
                    reg: state.registration.clone(),
                    msgs_count: state.messages.len(),
                    last_seen: state.last_seen.timestamp_millis() as f64 / 1000.0,
                    lat,
                    lon,
                }
            })
            .collect()
    }

    /// Committed block texts for one flight, oldest first. Unknown flights
    /// yield an empty list, not an error.
    pub async fn get_history(&self, flight: &str) -> Vec<String> {
        self.flights
            .read()
            .await
            .get(flight)
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }
}
