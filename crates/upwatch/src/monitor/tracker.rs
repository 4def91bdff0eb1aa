//! Up/down transition engine and counter bookkeeping.
//!
//! This is a pure state machine: all methods take the current time as an
//! argument, which keeps the downtime-window arithmetic deterministic under
//! test. Out-of-order probe completions are safe because transitions only
//! use "now" and the counters, never the dispatch order.

use std::collections::VecDeque;

use crate::config::Expectation;
use crate::probe::{ProbeOutcome, ProbeTarget};
use crate::report::MonitorState;

/// How a completed probe was classified, and which notification it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Up,
    /// Completed at the transport level but failed the expectation.
    Down,
    Timeout,
    TransportError,
}

impl Verdict {
    pub(crate) fn is_up(self) -> bool {
        matches!(self, Verdict::Up)
    }
}

/// Classify a completed probe against the configured expectation.
///
/// HTTP: up iff every configured criterion holds (status equality when
/// `status_code` is set, body containment when `content_search` is set);
/// with no criteria configured, up iff status == 200. TCP: connect success
/// is up. Failures map to `Timeout` or `TransportError` in that priority.
pub(crate) fn classify(
    outcome: &ProbeOutcome,
    target: &ProbeTarget,
    expect: &Expectation,
) -> Verdict {
    let reply = match outcome {
        Ok(reply) => reply,
        Err(failure) => {
            return if failure.is_timeout() { Verdict::Timeout } else { Verdict::TransportError };
        },
    };

    match target {
        ProbeTarget::Address { .. } => Verdict::Up,
        ProbeTarget::Website { .. } => {
            if expect.status_code.is_none() && expect.content_search.is_none() {
                return if reply.status_code == Some(200) { Verdict::Up } else { Verdict::Down };
            }

            let mut up = true;
            if let Some(want) = expect.status_code {
                up = up && reply.status_code == Some(want);
            }
            if let Some(needle) = &expect.content_search {
                up = up
                    && reply.body.as_deref().map(|body| body.contains(needle)).unwrap_or(false);
            }
            if up {
                Verdict::Up
            } else {
                Verdict::Down
            }
        },
    }
}

/// Liveness state plus the monotonically accumulated counters.
#[derive(Debug, Clone)]
pub(crate) struct StatsTracker {
    pub is_up: bool,
    pub was_down_last_check: bool,
    pub is_first_probe: bool,
    pub total_requests: u64,
    pub total_down_times: u64,
    pub outages: u64,
    pub downtime_ms: u64,
    pub last_down_time: Option<i64>,
    pub last_request: Option<i64>,
    pub started_at: Option<i64>,
    pub status: Option<u16>,
    pub response_time: f64,
    pub history: VecDeque<i64>,
    history_limit: Option<usize>,
}

impl StatsTracker {
    pub(crate) fn new(history_limit: Option<usize>) -> Self {
        Self {
            is_up: true,
            was_down_last_check: false,
            is_first_probe: true,
            total_requests: 0,
            total_down_times: 0,
            outages: 0,
            downtime_ms: 0,
            last_down_time: None,
            last_request: None,
            started_at: None,
            status: None,
            response_time: 0.0,
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Rebuild counters from a persisted snapshot.
    pub(crate) fn restore(prior: Option<&MonitorState>, history_limit: Option<usize>) -> Self {
        let mut tracker = Self::new(history_limit);
        if let Some(prior) = prior {
            tracker.is_up = prior.is_up;
            tracker.total_requests = prior.total_requests;
            tracker.total_down_times = prior.total_down_times;
            tracker.outages = prior.outages;
            tracker.downtime_ms = prior.downtime_ms;
            tracker.last_down_time = prior.last_down_time;
            tracker.last_request = prior.last_request;
            tracker.started_at = prior.started_at;
        }
        tracker
    }

    /// Bookkeeping at probe dispatch: request count, last-request stamp and
    /// the history entry.
    pub(crate) fn record_dispatch(&mut self, now_ms: i64) {
        self.total_requests += 1;
        self.last_request = Some(now_ms);
        self.history.push_back(now_ms);
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Apply a classified probe completion: run the up/down transition and
    /// update the report-only fields.
    pub(crate) fn apply(
        &mut self,
        verdict: Verdict,
        elapsed_ms: u64,
        status_code: Option<u16>,
        now_ms: i64,
    ) {
        if verdict.is_up() {
            self.up(now_ms);
        } else {
            self.down(now_ms);
        }

        self.status = status_code;
        // Intentional recurrence, not an arithmetic mean: kept for
        // behavioral compatibility of reported values.
        if self.total_requests > 0 {
            self.response_time =
                (self.response_time + elapsed_ms as f64) / self.total_requests as f64;
        }
    }

    fn down(&mut self, now_ms: i64) {
        self.is_up = false;
        self.total_down_times += 1;
        self.outages += 1;

        if self.was_down_last_check {
            // Extend the current outage window.
            if let Some(last) = self.last_down_time {
                self.downtime_ms += (now_ms - last).max(0) as u64;
            }
        } else {
            self.was_down_last_check = true;
        }
        self.last_down_time = Some(now_ms);

        if self.is_first_probe {
            // Charge the gap between scheduling start and the first result.
            if let Some(started) = self.started_at {
                self.downtime_ms += (now_ms - started).max(0) as u64;
            }
            self.is_first_probe = false;
        }
    }

    fn up(&mut self, now_ms: i64) {
        self.is_up = true;
        if self.was_down_last_check {
            // Close the outage window.
            if let Some(last) = self.last_down_time {
                self.downtime_ms += (now_ms - last).max(0) as u64;
            }
            self.was_down_last_check = false;
        }
        self.is_first_probe = false;
    }

    /// Percentage of probes not classified as outages; undefined until the
    /// first dispatch.
    pub(crate) fn availability(&self) -> Option<f64> {
        if self.total_requests == 0 {
            None
        } else {
            Some(100.0 - (self.outages as f64 / self.total_requests as f64) * 100.0)
        }
    }

    /// Whole seconds of uptime since the monitor started.
    pub(crate) fn uptime_secs(&self, now_ms: i64) -> i64 {
        match self.started_at {
            Some(started) => ((now_ms - started) - self.downtime_ms as i64) / 1_000,
            None => 0,
        }
    }
}
