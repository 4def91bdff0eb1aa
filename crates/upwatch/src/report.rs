//! Report and persistable-state snapshots.

use serde::{Deserialize, Serialize};

use crate::config::{Expectation, HttpMethod, MonitorConfig, ProbeOptions};

/// Canonical persistable snapshot of a monitor's configuration and
/// counters.
///
/// Feed it back as the `prior` argument of [`crate::Monitor::new`] to
/// reconstruct the monitor. Transient fields (the timer handle) are
/// excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub id: Option<String>,
    pub title: String,
    /// Epoch milliseconds; set once at first initialization.
    pub created_at: Option<i64>,
    pub is_up: bool,
    pub website: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub total_requests: u64,
    pub total_down_times: u64,
    pub outages: u64,
    pub downtime_ms: u64,
    pub last_down_time: Option<i64>,
    pub last_request: Option<i64>,
    pub started_at: Option<i64>,
    pub interval: u64,
    pub paused: bool,
    pub method: HttpMethod,
    pub ignore_ssl: bool,
    pub probe_options: ProbeOptions,
    pub expect: Expectation,
    pub config: MonitorConfig,
}

/// Derived statistics computed on demand from the accumulated counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub total_requests: u64,
    pub total_down_times: u64,
    /// RFC 3339 timestamp of the last down classification, if any.
    pub last_down_time: Option<String>,
    /// RFC 3339 timestamp of the last probe dispatch, if any.
    pub last_request: Option<String>,
    /// Last observed status code.
    pub status: Option<u16>,
    pub outages: u64,
    /// Accumulated downtime in seconds.
    pub downtime_secs: f64,
    /// Percentage of probes not classified as outages; `None` (undefined)
    /// until at least one probe has been dispatched.
    pub availability: Option<f64>,
    /// Whole seconds of uptime since the monitor was started.
    pub uptime_secs: i64,
    /// Rolling response-time value (see the transition engine notes).
    pub response_time: f64,
    /// Probe dispatch timestamps, oldest first.
    pub history: Vec<i64>,
}

/// Format an epoch-milliseconds timestamp as RFC 3339, when representable.
pub(crate) fn format_timestamp(epoch_ms: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(epoch_ms).map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_timestamp_produces_rfc3339() {
        let formatted = format_timestamp(0).expect("epoch is representable");
        assert!(formatted.starts_with("1970-01-01T00:00:00"));
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = MonitorState {
            id: Some("abc123".into()),
            title: "example".into(),
            created_at: Some(1_000),
            is_up: true,
            website: Some("https://example.com".into()),
            address: None,
            port: None,
            total_requests: 7,
            total_down_times: 2,
            outages: 2,
            downtime_ms: 5_500,
            last_down_time: Some(9_000),
            last_request: Some(10_000),
            started_at: Some(500),
            interval: 5,
            paused: false,
            method: HttpMethod::Get,
            ignore_ssl: false,
            probe_options: ProbeOptions::default(),
            expect: Expectation::default(),
            config: MonitorConfig::default(),
        };

        let json = serde_json::to_string(&state).expect("serialize");
        let back: MonitorState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }
}
