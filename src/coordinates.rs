//! Coordinate decoding for ACARS position reports
//!
//! ACARS messages carry positions in several incompatible textual encodings:
//! - Legacy degrees + decimal minutes with adjoining hemisphere letters
//!   (`4312.50N,07530.25W`)
//! - Compact digit runs (`431712N0753045W`), where the run may encode
//!   degrees+minutes+seconds, degrees+minutes, or thousandths of a degree
//! - `POS`-prefixed fixed-width runs (`POSN43171W075304`)
//!
//! Each format is an independent matcher returning a whole [`Fix`] or
//! nothing. A fix is only produced when both axes decode, so a garbled
//! longitude can never pair with a valid latitude.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A decoded position in signed decimal degrees (negative = south/west).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Degree digits at the front of a latitude token.
const LAT_DEGREE_DIGITS: usize = 2;
/// Degree digits at the front of a longitude token.
const LON_DEGREE_DIGITS: usize = 3;

static LEGACY_DEG_MIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})(\d{2}\.\d+)([NS]),(\d{3})(\d{2}\.\d+)([EW])").unwrap());

static COMPACT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4,6})([NS])(\d{5,7})([EW])").unwrap());

static POS_PREFIXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"POS([NS])(\d{5})([EW])(\d{6})").unwrap());

/// Decode a raw digit run into decimal degrees.
///
/// Three sub-encodings are tried in a fixed order; the order matters and is
/// part of the wire contract:
/// 1. 5 or 6 digits, no decimal point: thousandths of a degree
///    (`15544` -> 15.544)
/// 2. at least `degree_digits` + 4 digits: degrees, two minute digits, and
///    the remainder as (possibly fractional) seconds
/// 3. at least `degree_digits` + 2 digits: degrees and the remainder as
///    fractional minutes
///
/// Anything shorter fails to decode. The hemisphere letter negates the
/// result for `S` and `W`.
pub fn decode_token(value: &str, hemisphere: char, degree_digits: usize) -> Option<f64> {
    let mut decimal = None;

    if (value.len() == 5 || value.len() == 6) && !value.contains('.') {
        decimal = value.parse::<i64>().ok().map(|v| v as f64 / 1000.0);
    }

    if decimal.is_none() && value.len() >= degree_digits + 4 {
        let degrees: u32 = value[..degree_digits].parse().ok()?;
        let minutes: u32 = value[degree_digits..degree_digits + 2].parse().ok()?;
        let seconds: f64 = if value.len() > degree_digits + 2 {
            value[degree_digits + 2..].parse().ok()?
        } else {
            0.0
        };
        decimal = Some(degrees as f64 + minutes as f64 / 60.0 + seconds / 3600.0);
    }

    if decimal.is_none() && value.len() >= degree_digits + 2 {
        let degrees: u32 = value[..degree_digits].parse().ok()?;
        let minutes: f64 = value[degree_digits..].parse().ok()?;
        decimal = Some(degrees as f64 + minutes as f64 / 60.0);
    }

    let decimal = decimal?;
    Some(if matches!(hemisphere, 'S' | 'W') {
        -decimal
    } else {
        decimal
    })
}

/// Format A: `DDMM.mm[NS],DDDMM.mm[EW]` (degrees + decimal minutes).
pub fn match_legacy_degrees_minutes(line: &str) -> Option<Fix> {
    let caps = LEGACY_DEG_MIN_RE.captures(line)?;

    let lat_degrees: f64 = caps[1].parse().ok()?;
    let lat_minutes: f64 = caps[2].parse().ok()?;
    let lon_degrees: f64 = caps[4].parse().ok()?;
    let lon_minutes: f64 = caps[5].parse().ok()?;

    let mut latitude = lat_degrees + lat_minutes / 60.0;
    let mut longitude = lon_degrees + lon_minutes / 60.0;
    if &caps[3] == "S" {
        latitude = -latitude;
    }
    if &caps[6] == "W" {
        longitude = -longitude;
    }

    Some(Fix {
        latitude,
        longitude,
    })
}

/// Format B: `D{4,6}[NS]D{5,7}[EW]` (compact digit runs).
pub fn match_compact_digit_run(line: &str) -> Option<Fix> {
    let caps = COMPACT_RUN_RE.captures(line)?;

    let latitude = decode_token(&caps[1], caps[2].chars().next()?, LAT_DEGREE_DIGITS)?;
    let longitude = decode_token(&caps[3], caps[4].chars().next()?, LON_DEGREE_DIGITS)?;

    Some(Fix {
        latitude,
        longitude,
    })
}

/// Format C: `POS[NS]DDDDD[EW]DDDDDD` (fixed-width digit runs).
pub fn match_pos_prefixed(line: &str) -> Option<Fix> {
    let caps = POS_PREFIXED_RE.captures(line)?;

    let latitude = decode_token(&caps[2], caps[1].chars().next()?, LAT_DEGREE_DIGITS)?;
    let longitude = decode_token(&caps[4], caps[3].chars().next()?, LON_DEGREE_DIGITS)?;

    Some(Fix {
        latitude,
        longitude,
    })
}

/// All position reports found on a line, in pattern order (A, B, C).
///
/// A line can match more than one format; the caller applies them in order
/// so the last match wins.
pub fn decode_position_reports(line: &str) -> Vec<Fix> {
    [
        match_legacy_degrees_minutes(line),
        match_compact_digit_run(line),
        match_pos_prefixed(line),
    ]
    .into_iter()
    .flatten()
    .collect()
}
