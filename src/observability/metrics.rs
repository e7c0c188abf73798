//! Internal counters.
//!
//! # Metrics
//! - `usage_observations_recorded_total` (counter): rows emitted, by origin
//! - `usage_observations_dropped_total` (counter): requests with no row, by reason
//! - `usage_response_decode_failures_total` (counter): swallowed decode errors
//! - `usage_rows_folded_total` (counter): aggregator rows counted, by origin
//! - `usage_rows_skipped_total` (counter): aggregator rows skipped, by reason

use metrics::counter;

use crate::observation::Origin;

pub fn record_observation(origin: Origin) {
    counter!("usage_observations_recorded_total", "origin" => origin.as_str()).increment(1);
}

pub fn record_dropped(reason: &'static str) {
    counter!("usage_observations_dropped_total", "reason" => reason).increment(1);
}

pub fn record_decode_failure(protocol: &str) {
    counter!("usage_response_decode_failures_total", "protocol" => protocol.to_string())
        .increment(1);
}

pub fn record_folded(origin: Origin) {
    counter!("usage_rows_folded_total", "origin" => origin.as_str()).increment(1);
}

pub fn record_skipped(reason: &'static str) {
    counter!("usage_rows_skipped_total", "reason" => reason).increment(1);
}
