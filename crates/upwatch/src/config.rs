//! Monitor configuration: options, nested patches and the merge rules that
//! produce the canonical starting state.
//!
//! Precedence is defaults < prior state < options; the nested `config`,
//! `probe_options` and `expect` objects merge key-by-key so a partial
//! override never erases sibling keys.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::report::MonitorState;

/// Unit for the probe interval.
///
/// The set is exhaustive: an unrecognized unit in persisted state fails
/// deserialization instead of silently defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    /// Convert an interval value in this unit to milliseconds.
    pub fn to_millis(self, interval: u64) -> u64 {
        match self {
            IntervalUnit::Milliseconds => interval,
            IntervalUnit::Seconds => interval * 1_000,
            IntervalUnit::Minutes => interval * 60_000,
            IntervalUnit::Hours => interval * 3_600_000,
        }
    }
}

/// HTTP method used for website probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

/// Success criteria for HTTP probes.
///
/// A probe is classified up iff every configured criterion holds. With no
/// criteria configured at all, classification falls back to
/// "status code == 200".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Expected status code, when set.
    pub status_code: Option<u16>,
    /// Substring that must appear in the response body, when set.
    pub content_search: Option<String>,
}

impl Default for Expectation {
    fn default() -> Self {
        Self { status_code: Some(200), content_search: None }
    }
}

/// Transport-level probe overrides, propagated to the probe capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOptions {
    /// Skip TLS certificate identity verification (`ignore_ssl`).
    pub accept_invalid_certs: bool,
    /// Per-probe timeout in seconds; probers apply their own default when
    /// unset.
    pub timeout_secs: Option<u64>,
}

/// Scheduling and bookkeeping knobs (the nested `config` object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub interval_unit: IntervalUnit,
    /// Assign a fresh random id at construction.
    pub generate_id: bool,
    /// Keep only the last N probe timestamps in the history; `None` keeps
    /// everything for the lifetime of the process.
    pub history_limit: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_unit: IntervalUnit::Minutes, generate_id: true, history_limit: None }
    }
}

/// Partial override for [`MonitorConfig`]; unset fields keep their current
/// value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub interval_unit: Option<IntervalUnit>,
    pub generate_id: Option<bool>,
    pub history_limit: Option<usize>,
}

/// Partial override for [`ProbeOptions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeOptionsPatch {
    pub accept_invalid_certs: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Construction options for a [`crate::Monitor`]. Every field is optional;
/// unset fields fall back to the prior state (when given) and then to the
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorOptions {
    pub id: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub interval: Option<u64>,
    pub method: Option<HttpMethod>,
    pub automatic_start: Option<bool>,
    pub ignore_ssl: Option<bool>,
    pub expect: Option<Expectation>,
    pub probe_options: Option<ProbeOptionsPatch>,
    pub config: Option<ConfigPatch>,
}

impl MonitorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the website URL to monitor (mutually exclusive with an address).
    pub fn with_website(mut self, url: impl Into<String>) -> Self {
        self.website = Some(url.into());
        self
    }

    /// Set the host address to monitor (mutually exclusive with a website).
    pub fn with_address(mut self, host: impl Into<String>) -> Self {
        self.address = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Supply an explicit id; this also disables id generation, which would
    /// otherwise replace it.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.config.get_or_insert_with(ConfigPatch::default).generate_id = Some(false);
        self
    }

    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_interval_unit(mut self, unit: IntervalUnit) -> Self {
        self.config.get_or_insert_with(ConfigPatch::default).interval_unit = Some(unit);
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_automatic_start(mut self, enable: bool) -> Self {
        self.automatic_start = Some(enable);
        self
    }

    pub fn with_ignore_ssl(mut self, enable: bool) -> Self {
        self.ignore_ssl = Some(enable);
        self
    }

    /// Expect a specific status code on HTTP probes.
    pub fn with_expect_status(mut self, status_code: u16) -> Self {
        self.expect.get_or_insert_with(empty_expectation).status_code = Some(status_code);
        self
    }

    /// Expect a substring in the response body on HTTP probes.
    pub fn with_expect_content(mut self, needle: impl Into<String>) -> Self {
        self.expect.get_or_insert_with(empty_expectation).content_search = Some(needle.into());
        self
    }

    /// Bound the probe-timestamp history to the last `limit` entries.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.config.get_or_insert_with(ConfigPatch::default).history_limit = Some(limit);
        self
    }
}

fn empty_expectation() -> Expectation {
    Expectation { status_code: None, content_search: None }
}

/// Fully merged monitor settings after precedence resolution.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub id: Option<String>,
    pub title: String,
    pub created_at: Option<i64>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub interval: u64,
    pub method: HttpMethod,
    pub automatic_start: bool,
    pub paused: bool,
    pub ignore_ssl: bool,
    pub expect: Expectation,
    pub probe_options: ProbeOptions,
    pub config: MonitorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            created_at: None,
            website: None,
            address: None,
            port: None,
            interval: 5,
            method: HttpMethod::Get,
            automatic_start: false,
            paused: false,
            ignore_ssl: false,
            expect: Expectation::default(),
            probe_options: ProbeOptions::default(),
            config: MonitorConfig::default(),
        }
    }
}

impl Settings {
    /// Merge defaults, an optional prior state and construction options
    /// into the canonical starting state.
    ///
    /// Returns the merged settings together with the configuration error to
    /// report, if any. Construction never fails outright; a monitor with an
    /// error stays inert.
    pub(crate) fn merge(
        options: &MonitorOptions,
        prior: Option<&MonitorState>,
        now_ms: i64,
    ) -> (Self, Option<ConfigError>) {
        let mut merged = Settings::default();

        if let Some(prior) = prior {
            merged.id = prior.id.clone();
            merged.title = prior.title.clone();
            merged.created_at = prior.created_at;
            merged.website = prior.website.clone();
            merged.address = prior.address.clone();
            merged.port = prior.port;
            merged.interval = prior.interval;
            merged.paused = prior.paused;
            merged.method = prior.method;
            merged.ignore_ssl = prior.ignore_ssl;
            merged.expect = prior.expect.clone();
            merged.probe_options = prior.probe_options.clone();
            merged.config = prior.config.clone();
        }

        if let Some(id) = &options.id {
            merged.id = Some(id.clone());
        }
        if let Some(title) = &options.title {
            merged.title = title.clone();
        }
        if let Some(website) = &options.website {
            merged.website = Some(website.clone());
        }
        if let Some(address) = &options.address {
            merged.address = Some(address.clone());
        }
        if let Some(port) = options.port {
            merged.port = Some(port);
        }
        if let Some(interval) = options.interval {
            merged.interval = interval;
        }
        if let Some(method) = options.method {
            merged.method = method;
        }
        if let Some(auto) = options.automatic_start {
            merged.automatic_start = auto;
        }
        if let Some(ignore) = options.ignore_ssl {
            merged.ignore_ssl = ignore;
        }
        if let Some(expect) = &options.expect {
            if expect.status_code.is_some() {
                merged.expect.status_code = expect.status_code;
            }
            if expect.content_search.is_some() {
                merged.expect.content_search = expect.content_search.clone();
            }
        }
        if let Some(patch) = &options.probe_options {
            if let Some(accept) = patch.accept_invalid_certs {
                merged.probe_options.accept_invalid_certs = accept;
            }
            if let Some(timeout) = patch.timeout_secs {
                merged.probe_options.timeout_secs = Some(timeout);
            }
        }
        if let Some(patch) = &options.config {
            if let Some(unit) = patch.interval_unit {
                merged.config.interval_unit = unit;
            }
            if let Some(generate) = patch.generate_id {
                merged.config.generate_id = generate;
            }
            if let Some(limit) = patch.history_limit {
                merged.config.history_limit = Some(limit);
            }
        }

        if merged.config.generate_id {
            merged.id = Some(generate_id());
        }
        if merged.created_at.is_none() {
            merged.created_at = Some(now_ms);
        }
        if merged.ignore_ssl {
            merged.probe_options.accept_invalid_certs = true;
        }

        let error = if merged.website.is_some() && merged.address.is_some() {
            Some(ConfigError::AmbiguousTarget)
        } else if merged.website.is_none() && merged.address.is_none() {
            Some(ConfigError::MissingTarget)
        } else if merged.interval == 0 {
            Some(ConfigError::InvalidInterval)
        } else {
            None
        };

        (merged, error)
    }

    /// The website URL or host address, whichever is set.
    pub(crate) fn target_label(&self) -> String {
        self.website.clone().or_else(|| self.address.clone()).unwrap_or_default()
    }

    /// Human-readable name for log lines: the title when present, the
    /// target otherwise.
    pub(crate) fn display_name(&self) -> String {
        if self.title.is_empty() {
            self.target_label()
        } else {
            self.title.clone()
        }
    }

    /// The concrete probe period.
    pub(crate) fn period(&self) -> Duration {
        Duration::from_millis(self.config.interval_unit.to_millis(self.interval))
    }
}

/// Fresh collision-resistant monitor id: 128 bits of entropy, hex-encoded.
pub(crate) fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_website() -> MonitorState {
        let (settings, error) = Settings::merge(
            &MonitorOptions::new().with_website("https://example.com").with_interval(3),
            None,
            1_000,
        );
        assert!(error.is_none());
        crate::monitor::state_snapshot_for_tests(&settings)
    }

    #[test]
    fn interval_units_convert_to_millis() {
        assert_eq!(IntervalUnit::Milliseconds.to_millis(250), 250);
        assert_eq!(IntervalUnit::Seconds.to_millis(5), 5_000);
        assert_eq!(IntervalUnit::Minutes.to_millis(2), 120_000);
        assert_eq!(IntervalUnit::Hours.to_millis(1), 3_600_000);
    }

    #[test]
    fn unrecognized_interval_unit_fails_deserialization() {
        let parsed: Result<IntervalUnit, _> = serde_json::from_str("\"fortnights\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn defaults_match_original_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.interval, 5);
        assert_eq!(settings.config.interval_unit, IntervalUnit::Minutes);
        assert!(settings.config.generate_id);
        assert_eq!(settings.expect.status_code, Some(200));
        assert_eq!(settings.method, HttpMethod::Get);
    }

    #[test]
    fn options_override_prior_state() {
        let prior = state_with_website();
        let options = MonitorOptions::new().with_website("https://other.test").with_interval(9);
        let (merged, error) = Settings::merge(&options, Some(&prior), 2_000);

        assert!(error.is_none());
        assert_eq!(merged.website.as_deref(), Some("https://other.test"));
        assert_eq!(merged.interval, 9);
    }

    #[test]
    fn prior_state_overrides_defaults() {
        let prior = state_with_website();
        let (merged, error) = Settings::merge(&MonitorOptions::new(), Some(&prior), 2_000);

        assert!(error.is_none());
        assert_eq!(merged.website.as_deref(), Some("https://example.com"));
        assert_eq!(merged.interval, 3);
    }

    #[test]
    fn nested_patch_keeps_sibling_keys() {
        let options = MonitorOptions::new()
            .with_website("https://example.com")
            .with_expect_status(201)
            .with_expect_content("pong");
        let (first, _) = Settings::merge(&options, None, 1_000);
        let prior = crate::monitor::state_snapshot_for_tests(&first);

        // Patching only content_search must not erase the expected status.
        let patch = MonitorOptions {
            expect: Some(Expectation { status_code: None, content_search: Some("ok".into()) }),
            ..Default::default()
        };
        let (merged, error) = Settings::merge(&patch, Some(&prior), 2_000);

        assert!(error.is_none());
        assert_eq!(merged.expect.status_code, Some(201));
        assert_eq!(merged.expect.content_search.as_deref(), Some("ok"));
    }

    #[test]
    fn config_patch_merges_key_by_key() {
        let options = MonitorOptions::new()
            .with_website("https://example.com")
            .with_interval_unit(IntervalUnit::Seconds)
            .with_history_limit(10);
        let (first, _) = Settings::merge(&options, None, 1_000);
        let prior = crate::monitor::state_snapshot_for_tests(&first);

        let patch = MonitorOptions {
            config: Some(ConfigPatch { generate_id: Some(false), ..Default::default() }),
            ..Default::default()
        };
        let (merged, _) = Settings::merge(&patch, Some(&prior), 2_000);

        assert_eq!(merged.config.interval_unit, IntervalUnit::Seconds);
        assert_eq!(merged.config.history_limit, Some(10));
        assert!(!merged.config.generate_id);
    }

    #[test]
    fn generated_id_is_128_bit_hex() {
        let options = MonitorOptions::new().with_website("https://example.com");
        let (merged, _) = Settings::merge(&options, None, 1_000);

        let id = merged.id.expect("id should be generated by default");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let (second, _) = Settings::merge(&options, None, 1_000);
        assert_ne!(Some(id), second.id);
    }

    #[test]
    fn explicit_id_survives_when_generation_disabled() {
        let options = MonitorOptions::new().with_website("https://example.com").with_id("mon-1");
        let (merged, _) = Settings::merge(&options, None, 1_000);
        assert_eq!(merged.id.as_deref(), Some("mon-1"));
    }

    #[test]
    fn created_at_set_once_and_never_overwritten() {
        let options = MonitorOptions::new().with_website("https://example.com");
        let (first, _) = Settings::merge(&options, None, 1_000);
        assert_eq!(first.created_at, Some(1_000));

        let prior = crate::monitor::state_snapshot_for_tests(&first);
        let (merged, _) = Settings::merge(&options, Some(&prior), 9_999);
        assert_eq!(merged.created_at, Some(1_000));
    }

    #[test]
    fn ignore_ssl_derives_probe_option() {
        let options =
            MonitorOptions::new().with_website("https://example.com").with_ignore_ssl(true);
        let (merged, _) = Settings::merge(&options, None, 1_000);
        assert!(merged.probe_options.accept_invalid_certs);
    }

    #[test]
    fn both_targets_is_a_configuration_error() {
        let options = MonitorOptions::new()
            .with_website("https://example.com")
            .with_address("192.0.2.1")
            .with_port(80);
        let (_, error) = Settings::merge(&options, None, 1_000);
        assert_eq!(error, Some(ConfigError::AmbiguousTarget));
    }

    #[test]
    fn missing_target_is_a_configuration_error() {
        let (_, error) = Settings::merge(&MonitorOptions::new(), None, 1_000);
        assert_eq!(error, Some(ConfigError::MissingTarget));
    }

    #[test]
    fn zero_interval_is_a_configuration_error() {
        let options = MonitorOptions::new().with_website("https://example.com").with_interval(0);
        let (_, error) = Settings::merge(&options, None, 1_000);
        assert_eq!(error, Some(ConfigError::InvalidInterval));
    }
}
