//! Line-oriented ACARS log parser
//!
//! Groups raw log lines into message blocks, binds each block to a flight
//! identity, and harvests position reports along the way. A block runs from
//! a `SOURCE:` line to the first line carrying a bracketed timestamp; it is
//! committed to the bound flight's history only if both markers and an
//! identity were seen. A new `SOURCE:` before the terminator discards the
//! unfinished block.
//!
//! Parser state is an explicit value rather than process globals, so a
//! snapshot can be parsed with nothing but a parser and a store.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::coordinates;
use crate::state::{AircraftStateStore, UNKNOWN_REGISTRATION};

/// Marker opening a message block.
const BLOCK_START: &str = "SOURCE:";

/// Substring marking an identity line.
const FLIGHT_ID_MARKER: &str = "Flight ID:";

static BLOCK_TERMINATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+\]").unwrap());

/// A block that has seen its `SOURCE:` marker but not yet its terminator.
#[derive(Debug)]
struct OpenBlock {
    /// Trimmed lines buffered since the `SOURCE:` marker, inclusive.
    lines: Vec<String>,
    /// Flight identity bound by the most recent Flight ID line, if any.
    flight: Option<String>,
}

/// Two-state block assembler: `block` is `None` outside a block, `Some`
/// while one is open.
#[derive(Debug, Default)]
pub struct LogParser {
    block: Option<OpenBlock>,
}

/// Extract `(flight, registration)` from an identity line.
///
/// The line is split on whitespace; the token after the literal `ID:` token
/// is the flight identifier and the token two past the identifier is the
/// registration (`???` when absent). Lines without an `ID:` token, or with
/// nothing after it, yield nothing.
pub fn parse_flight_identity(line: &str) -> Option<(String, String)> {
    if !line.contains(FLIGHT_ID_MARKER) {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let id_index = tokens.iter().position(|token| *token == "ID:")?;
    let flight = tokens.get(id_index + 1)?;
    let registration = tokens
        .get(id_index + 3)
        .copied()
        .unwrap_or(UNKNOWN_REGISTRATION);

    Some((flight.to_string(), registration.to_string()))
}

impl LogParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one whole snapshot through the parser in file order.
    pub async fn process_snapshot(&mut self, store: &AircraftStateStore, text: &str) {
        for line in text.lines() {
            self.process_line(store, line).await;
        }
    }

    /// Process a single raw log line, updating the store as needed.
    pub async fn process_line(&mut self, store: &AircraftStateStore, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        // A new SOURCE: marker always opens a fresh block; an unfinished one
        // is dropped without being committed anywhere.
        if trimmed.starts_with(BLOCK_START) {
            if let Some(unfinished) = self.block.take() {
                trace!(
                    buffered = unfinished.lines.len(),
                    "discarding unterminated block"
                );
            }
            self.block = Some(OpenBlock {
                lines: vec![trimmed.to_string()],
                flight: None,
            });
            return;
        }

        let Some(block) = self.block.as_mut() else {
            return;
        };
        block.lines.push(trimmed.to_string());

        // Identity binding: a later Flight ID line within the same block
        // rebinds it for the lines that follow.
        if let Some((flight, registration)) = parse_flight_identity(trimmed) {
            store.ensure_flight(&flight, &registration).await;
            store.refresh_last_seen(&flight).await;
            block.flight = Some(flight);
        }

        // Position reports only count once the block is bound to a flight.
        if let Some(flight) = block.flight.clone() {
            for fix in coordinates::decode_position_reports(trimmed) {
                store.set_fix(&flight, fix.latitude, fix.longitude).await;
            }
        }

        let terminated = block.flight.is_some() && BLOCK_TERMINATOR_RE.is_match(trimmed);
        if terminated
            && let Some(finished) = self.block.take()
            && let Some(flight) = finished.flight
        {
            store.append_history(&flight, finished.lines.join("\n")).await;
            debug!(%flight, lines = finished.lines.len(), "committed message block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flight_identity() {
        let (flight, reg) =
            parse_flight_identity("AC 1 Flight ID: AB123 REG N123DE more").unwrap();
        assert_eq!(flight, "AB123");
        assert_eq!(reg, "N123DE");
    }

    #[test]
    fn test_parse_flight_identity_missing_registration() {
        let (flight, reg) = parse_flight_identity("Flight ID: AB123").unwrap();
        assert_eq!(flight, "AB123");
        assert_eq!(reg, UNKNOWN_REGISTRATION);
    }

    #[test]
    fn test_parse_flight_identity_no_id_token() {
        // Marker present but no standalone "ID:" token after splitting
        assert!(parse_flight_identity("some chatter without the marker").is_none());
        assert!(parse_flight_identity("Flight ID:AB123 glued together").is_none());
    }

    #[test]
    fn test_parse_flight_identity_id_token_last() {
        assert!(parse_flight_identity("Flight ID:").is_none());
    }

    #[tokio::test]
    async fn test_single_block_commit() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
Flight ID: AB123 REG N123DE
position 4312.50N,07530.25W enroute
[2024-01-01 00:00:01.000] received
";
        parser.process_snapshot(&store, snapshot).await;

        let history = store.get_history("AB123").await;
        assert_eq!(history.len(), 1);
        assert!(history[0].starts_with("SOURCE: VHF-1"));
        assert!(history[0].ends_with("[2024-01-01 00:00:01.000] received"));

        let summaries = store.list_summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].reg, "N123DE");
        let lat = summaries[0].lat.unwrap();
        let lon = summaries[0].lon.unwrap();
        assert!((lat - (43.0 + 12.50 / 60.0)).abs() < 1e-9);
        assert!((lon + (75.0 + 30.25 / 60.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restarted_block_is_discarded() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
Flight ID: LOST99 REG N999XX
SOURCE: VHF-2
Flight ID: KEPT11 REG N111YY
[2024-01-01 00:00:02.000]
";
        parser.process_snapshot(&store, snapshot).await;

        // The first block never saw a terminator, so nothing was committed
        // for it; its flight exists (identity was bound) but has no history.
        assert!(store.get_history("LOST99").await.is_empty());

        let history = store.get_history("KEPT11").await;
        assert_eq!(history.len(), 1);
        assert!(!history[0].contains("LOST99"));
    }

    #[tokio::test]
    async fn test_terminator_without_identity_does_not_commit() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
no identity anywhere
[2024-01-01 00:00:03.000]
";
        parser.process_snapshot(&store, snapshot).await;
        assert!(store.list_summaries().await.is_empty());
    }

    #[tokio::test]
    async fn test_lines_outside_blocks_are_ignored() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
Flight ID: ORPHAN1 REG N000AA
[2024-01-01 00:00:04.000]
";
        parser.process_snapshot(&store, snapshot).await;
        assert!(store.list_summaries().await.is_empty());
    }

    #[tokio::test]
    async fn test_coordinates_before_binding_are_ignored() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
position 4312.50N,07530.25W seen before identity
Flight ID: AB123 REG N123DE
[2024-01-01 00:00:05.000]
";
        parser.process_snapshot(&store, snapshot).await;

        let summaries = store.list_summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].lat, None);
        assert_eq!(summaries[0].lon, None);
    }

    #[tokio::test]
    async fn test_rebinding_within_block_later_wins() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
Flight ID: FIRST1 REG N100AA
Flight ID: SECOND2 REG N200BB
4312.50N,07530.25W
[2024-01-01 00:00:06.000]
";
        parser.process_snapshot(&store, snapshot).await;

        // Both flights exist, but the fix and the block go to the later one.
        assert!(store.get_history("FIRST1").await.is_empty());
        assert_eq!(store.get_history("SECOND2").await.len(), 1);

        let summaries = store.list_summaries().await;
        let first = summaries.iter().find(|s| s.flight == "FIRST1").unwrap();
        let second = summaries.iter().find(|s| s.flight == "SECOND2").unwrap();
        assert_eq!(first.lat, None);
        assert!(second.lat.is_some());
    }

    #[tokio::test]
    async fn test_unmatched_coordinate_text_leaves_fix_unchanged() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1
Flight ID: AB123 REG N123DE
4312.50N,07530.25W
POSN1234W123456 garbled report
[2024-01-01 00:00:07.000]
";
        parser.process_snapshot(&store, snapshot).await;

        let summaries = store.list_summaries().await;
        let lat = summaries[0].lat.unwrap();
        assert!((lat - (43.0 + 12.50 / 60.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reparsing_appends_duplicate_history() {
        // Whole-snapshot re-scans re-commit every block each cycle. This is
        // the current, documented behavior; de-duplication would make this
        // test fail visibly.
        let store = AircraftStateStore::new();
        let snapshot = "\
SOURCE: VHF-1
Flight ID: AB123 REG N123DE
[2024-01-01 00:00:08.000]
";
        for _ in 0..2 {
            let mut parser = LogParser::new();
            parser.process_snapshot(&store, snapshot).await;
        }
        assert_eq!(store.get_history("AB123").await.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_lines_do_not_change_state() {
        let store = AircraftStateStore::new();
        let mut parser = LogParser::new();
        let snapshot = "\
SOURCE: VHF-1

Flight ID: AB123 REG N123DE
   \t
[2024-01-01 00:00:09.000]
";
        parser.process_snapshot(&store, snapshot).await;

        let history = store.get_history("AB123").await;
        assert_eq!(history.len(), 1);
        // blank lines are not buffered
        assert_eq!(history[0].lines().count(), 3);
    }
}
