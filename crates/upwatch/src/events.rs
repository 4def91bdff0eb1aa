//! Typed state-change notifications.
//!
//! Every probe completion and lifecycle change produces exactly one
//! [`MonitorEvent`], fanned out to all current subscribers in processing
//! order. Events are the sole error-reporting channel: nothing is thrown
//! through the caller.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::report::MonitorState;

/// Payload describing the probe (or synthetic response) behind an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub status_code: Option<u16>,
    pub target: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// A state-change notification delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MonitorEvent {
    /// Probe classified the target as healthy.
    Up { response: ResponseData, state: MonitorState },
    /// Probe completed but failed the configured expectation.
    Down { response: ResponseData, state: MonitorState },
    /// Probe timed out.
    Timeout { error: String, response: ResponseData, state: MonitorState },
    /// Transport failure, or a configuration error at construction time
    /// (in which case there is no response payload).
    Error { error: String, response: Option<ResponseData>, state: MonitorState },
    /// The monitor was stopped.
    Stop { response: ResponseData, state: MonitorState },
}

impl MonitorEvent {
    /// The state snapshot carried by the event.
    pub fn state(&self) -> &MonitorState {
        match self {
            MonitorEvent::Up { state, .. }
            | MonitorEvent::Down { state, .. }
            | MonitorEvent::Timeout { state, .. }
            | MonitorEvent::Error { state, .. }
            | MonitorEvent::Stop { state, .. } => state,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::Up { .. } => "up",
            MonitorEvent::Down { .. } => "down",
            MonitorEvent::Timeout { .. } => "timeout",
            MonitorEvent::Error { .. } => "error",
            MonitorEvent::Stop { .. } => "stop",
        }
    }
}

/// Fans events out to any number of subscribers.
///
/// A construction-time configuration error is recorded and replayed to each
/// new subscriber, since subscribers can only attach after construction.
#[derive(Default)]
pub(crate) struct Notifier {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<MonitorEvent>>>,
    replay: Mutex<Option<MonitorEvent>>,
}

impl Notifier {
    /// Register a new subscriber.
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(event) = self.replay.lock().unwrap().clone() {
            let _ = tx.send(event);
        }
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, pruning closed ones.
    pub(crate) fn emit(&self, event: MonitorEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Record the construction-time error event replayed to new
    /// subscribers.
    pub(crate) fn record_replay(&self, event: MonitorEvent) {
        *self.replay.lock().unwrap() = Some(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Expectation, HttpMethod, MonitorConfig, ProbeOptions};

    fn dummy_state() -> MonitorState {
        MonitorState {
            id: None,
            title: String::new(),
            created_at: Some(0),
            is_up: true,
            website: Some("https://example.com".into()),
            address: None,
            port: None,
            total_requests: 0,
            total_down_times: 0,
            outages: 0,
            downtime_ms: 0,
            last_down_time: None,
            last_request: None,
            started_at: None,
            interval: 5,
            paused: false,
            method: HttpMethod::Get,
            ignore_ssl: false,
            probe_options: ProbeOptions::default(),
            expect: Expectation::default(),
            config: MonitorConfig::default(),
        }
    }

    fn dummy_up() -> MonitorEvent {
        MonitorEvent::Up {
            response: ResponseData {
                status_code: Some(200),
                target: "https://example.com".into(),
                elapsed_ms: 12,
                port: None,
            },
            state: dummy_state(),
        }
    }

    #[tokio::test]
    async fn events_fan_out_to_all_subscribers() {
        let notifier = Notifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.emit(dummy_up());

        assert_eq!(first.recv().await.unwrap().kind(), "up");
        assert_eq!(second.recv().await.unwrap().kind(), "up");
    }

    #[tokio::test]
    async fn recorded_error_replays_to_late_subscribers() {
        let notifier = Notifier::default();
        notifier.record_replay(MonitorEvent::Error {
            error: "bad config".into(),
            response: None,
            state: dummy_state(),
        });

        let mut rx = notifier.subscribe();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "error");
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let notifier = Notifier::default();
        let rx = notifier.subscribe();
        drop(rx);

        notifier.emit(dummy_up());
        assert!(notifier.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn event_kind_serializes_as_tag() {
        let json = serde_json::to_string(&dummy_up()).unwrap();
        assert!(json.contains("\"kind\":\"up\""));
    }
}
