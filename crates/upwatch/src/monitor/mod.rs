//! The monitor entity: configuration merging, the start/stop/pause/resume/
//! restart lifecycle, probe dispatch and the query surface.

mod scheduler;
mod tracker;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{MonitorOptions, Settings};
use crate::error::ConfigError;
use crate::events::{MonitorEvent, Notifier, ResponseData};
use crate::probe::{DefaultProber, ProbeOutcome, ProbeTarget, Prober};
use crate::report::{format_timestamp, MonitorState, Report};
use tracker::{classify, StatsTracker, Verdict};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single-target availability monitor.
///
/// One instance per monitored target, exclusively owned by its creator.
/// All mutation happens through probe completions and the lifecycle calls;
/// `report()` and `state()` are side-effect-free reads. Lifecycle calls
/// must run inside a Tokio runtime since they arm timer tasks.
pub struct Monitor {
    core: Arc<MonitorCore>,
}

/// Shared state between the monitor handle, its timer task and in-flight
/// probe tasks.
pub(crate) struct MonitorCore {
    inner: Mutex<Inner>,
    notifier: Notifier,
    prober: Arc<dyn Prober>,
}

struct Inner {
    settings: Settings,
    tracker: StatsTracker,
    config_error: Option<ConfigError>,
    /// Present iff a timer is armed. The single slot is what structurally
    /// prevents two concurrent timers: arming always replaces and aborts.
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Create a monitor from options merged over an optional prior state,
    /// probing with the built-in HTTP/TCP capability.
    ///
    /// Construction never fails: a configuration error (both or neither
    /// target set, zero interval) is recorded, delivered as an `Error`
    /// event to every subscriber, and leaves the monitor inert.
    pub fn new(options: MonitorOptions, prior: Option<MonitorState>) -> Self {
        Self::build(options, prior, |settings| {
            Arc::new(DefaultProber::new(&settings.probe_options)) as Arc<dyn Prober>
        })
    }

    /// Create a monitor with an injected probe capability.
    pub fn with_prober(
        options: MonitorOptions,
        prior: Option<MonitorState>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self::build(options, prior, move |_| prober)
    }

    fn build(
        options: MonitorOptions,
        prior: Option<MonitorState>,
        make_prober: impl FnOnce(&Settings) -> Arc<dyn Prober>,
    ) -> Self {
        let (settings, config_error) = Settings::merge(&options, prior.as_ref(), now_ms());
        let tracker = StatsTracker::restore(prior.as_ref(), settings.config.history_limit);
        let prober = make_prober(&settings);
        let automatic_start = settings.automatic_start;

        let core = Arc::new(MonitorCore {
            inner: Mutex::new(Inner { settings, tracker, config_error, handle: None }),
            notifier: Notifier::default(),
            prober,
        });
        let monitor = Monitor { core };

        if let Some(error) = config_error {
            warn!("monitor configuration error: {error}");
            let state = monitor.state();
            monitor.core.notifier.record_replay(MonitorEvent::Error {
                error: error.to_string(),
                response: None,
                state,
            });
        } else if automatic_start {
            monitor.start();
        }

        monitor
    }

    /// Register an observer; returns the receiving end of the event
    /// channel. A recorded construction-time configuration error is
    /// replayed to every new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitorEvent> {
        self.core.notifier.subscribe()
    }

    /// Arm the probe timer: one immediate probe, then one per interval.
    ///
    /// Replaces (and cancels) any previously armed timer, so at most one is
    /// ever active. No-op on a monitor with a configuration error.
    pub fn start(&self) {
        let mut inner = self.core.inner.lock().unwrap();
        if let Some(error) = inner.config_error {
            warn!("start ignored: {error}");
            return;
        }

        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }

        inner.tracker.started_at = Some(now_ms());
        let period = inner.settings.period();
        info!("monitoring {} every {:?}", inner.settings.target_label(), period);
        inner.handle = Some(scheduler::spawn_timer(self.core.clone(), period));
    }

    /// Cancel the timer and emit a `Stop` notification with a synthetic
    /// ok/0ms response. Cancelling an already-stopped monitor is a no-op;
    /// in-flight probes are not recalled and their results still apply.
    /// Like every lifecycle call, a no-op on a config-errored monitor.
    pub fn stop(&self) {
        let event = {
            let mut inner = self.core.inner.lock().unwrap();
            if let Some(error) = inner.config_error {
                warn!("stop ignored: {error}");
                return;
            }
            if let Some(handle) = inner.handle.take() {
                handle.abort();
            }
            let response = ResponseData {
                status_code: Some(200),
                target: inner.settings.target_label(),
                elapsed_ms: 0,
                port: inner.settings.port,
            };
            info!("{} has stopped", inner.settings.display_name());
            MonitorEvent::Stop { response, state: build_state(&inner.settings, &inner.tracker) }
        };
        self.core.notifier.emit(event);
    }

    /// Cancel the timer if armed and mark the monitor paused. Counters are
    /// left untouched.
    pub fn pause(&self) {
        let mut inner = self.core.inner.lock().unwrap();
        if let Some(error) = inner.config_error {
            warn!("pause ignored: {error}");
            return;
        }
        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }
        inner.settings.paused = true;
        info!("{} has paused", inner.settings.display_name());
    }

    /// Clear the paused flag and re-arm the timer at the original interval.
    pub fn resume(&self) {
        {
            let mut inner = self.core.inner.lock().unwrap();
            if let Some(error) = inner.config_error {
                warn!("resume ignored: {error}");
                return;
            }
            inner.settings.paused = false;
            info!("{} has resumed", inner.settings.display_name());
        }
        self.start();
    }

    /// Alias of [`Monitor::resume`].
    pub fn unpause(&self) {
        self.resume();
    }

    /// Stop, then start again. The prior timer is fully cancelled before
    /// the new one is armed.
    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    /// Derived statistics computed from the current counters.
    pub fn report(&self) -> Report {
        let inner = self.core.inner.lock().unwrap();
        let tracker = &inner.tracker;
        Report {
            total_requests: tracker.total_requests,
            total_down_times: tracker.total_down_times,
            last_down_time: tracker.last_down_time.and_then(format_timestamp),
            last_request: tracker.last_request.and_then(format_timestamp),
            status: tracker.status,
            outages: tracker.outages,
            downtime_secs: tracker.downtime_ms as f64 / 1_000.0,
            availability: tracker.availability(),
            uptime_secs: tracker.uptime_secs(now_ms()),
            response_time: tracker.response_time,
            history: tracker.history.iter().copied().collect(),
        }
    }

    /// Canonical persistable snapshot; excludes the timer handle.
    pub fn state(&self) -> MonitorState {
        let inner = self.core.inner.lock().unwrap();
        build_state(&inner.settings, &inner.tracker)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        // Release the timer so the shared core does not outlive its owner.
        if let Ok(mut inner) = self.core.inner.lock() {
            if let Some(handle) = inner.handle.take() {
                handle.abort();
            }
        }
    }
}

impl MonitorCore {
    /// One scheduler tick: bump the dispatch counters and fire the probe
    /// without blocking the timer.
    pub(crate) fn dispatch_probe(core: &Arc<Self>) {
        let target = {
            let mut inner = core.inner.lock().unwrap();
            inner.tracker.record_dispatch(now_ms());
            build_target(&inner.settings)
        };
        let Some(target) = target else { return };

        let core = core.clone();
        tokio::spawn(async move {
            let outcome = core.prober.probe(&target).await;
            core.complete_probe(&target, outcome);
        });
    }

    /// Apply a completed probe: classify, run the transition, emit exactly
    /// one notification. Also runs for results landing after stop/pause.
    fn complete_probe(&self, target: &ProbeTarget, outcome: ProbeOutcome) {
        let event = {
            let mut inner = self.inner.lock().unwrap();
            let verdict = classify(&outcome, target, &inner.settings.expect);
            let (elapsed_ms, status_code) = match &outcome {
                Ok(reply) => (reply.elapsed_ms, reply.status_code),
                Err(failure) => (failure.elapsed_ms(), None),
            };
            let error_message = outcome.err().map(|failure| failure.to_string());

            inner.tracker.apply(verdict, elapsed_ms, status_code, now_ms());

            let response = ResponseData {
                status_code,
                target: target.label().to_string(),
                elapsed_ms,
                port: target.port(),
            };
            let state = build_state(&inner.settings, &inner.tracker);

            match verdict {
                Verdict::Up => MonitorEvent::Up { response, state },
                Verdict::Down => MonitorEvent::Down { response, state },
                Verdict::Timeout => MonitorEvent::Timeout {
                    error: error_message.unwrap_or_default(),
                    response,
                    state,
                },
                Verdict::TransportError => MonitorEvent::Error {
                    error: error_message.unwrap_or_default(),
                    response: Some(response),
                    state,
                },
            }
        };
        self.notifier.emit(event);
    }
}

fn build_target(settings: &Settings) -> Option<ProbeTarget> {
    if let Some(url) = &settings.website {
        Some(ProbeTarget::Website {
            url: url.clone(),
            method: settings.method,
            options: settings.probe_options.clone(),
        })
    } else {
        settings.address.as_ref().map(|host| ProbeTarget::Address {
            host: host.clone(),
            port: settings.port,
            options: settings.probe_options.clone(),
        })
    }
}

fn build_state(settings: &Settings, tracker: &StatsTracker) -> MonitorState {
    MonitorState {
        id: settings.id.clone(),
        title: settings.title.clone(),
        created_at: settings.created_at,
        is_up: tracker.is_up,
        website: settings.website.clone(),
        address: settings.address.clone(),
        port: settings.port,
        total_requests: tracker.total_requests,
        total_down_times: tracker.total_down_times,
        outages: tracker.outages,
        downtime_ms: tracker.downtime_ms,
        last_down_time: tracker.last_down_time,
        last_request: tracker.last_request,
        started_at: tracker.started_at,
        interval: settings.interval,
        paused: settings.paused,
        method: settings.method,
        ignore_ssl: settings.ignore_ssl,
        probe_options: settings.probe_options.clone(),
        expect: settings.expect.clone(),
        config: settings.config.clone(),
    }
}

#[cfg(test)]
pub(crate) fn state_snapshot_for_tests(settings: &Settings) -> MonitorState {
    build_state(settings, &StatsTracker::new(settings.config.history_limit))
}
