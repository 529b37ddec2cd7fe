//! Recovering the id of a freshly inserted location.
//!
//! Inserts use `Prefer: return=minimal`, so the backend never tells us what
//! it stored. Callers that need the row re-fetch the collection and look for
//! the newest location at the submitted coordinates.

use crate::models::LocationRecord;

/// Maximum per-axis difference, in degrees, for two positions to match
pub const COORDINATE_TOLERANCE: f64 = 0.0001;

/// True if both axes differ by less than [`COORDINATE_TOLERANCE`]
pub fn same_position(location: &LocationRecord, latitude: f64, longitude: f64) -> bool {
    (location.latitude - latitude).abs() < COORDINATE_TOLERANCE
        && (location.longitude - longitude).abs() < COORDINATE_TOLERANCE
}

/// Newest location (by `created_at`) at the given position, if any
pub fn find_recent_match(
    locations: &[LocationRecord],
    latitude: f64,
    longitude: f64,
) -> Option<&LocationRecord> {
    let mut newest_first: Vec<&LocationRecord> = locations.iter().collect();
    newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    newest_first.into_iter().find(|candidate| {
        log::debug!(
            "Checking location {} ({}, {}) created {}",
            candidate.id,
            candidate.latitude,
            candidate.longitude,
            candidate.created_at_string()
        );
        same_position(candidate, latitude, longitude)
    })
}
