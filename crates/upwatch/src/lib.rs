//! upwatch - single-target availability monitor.
//!
//! Given a website URL or a host/port address, a [`Monitor`] probes the
//! target on a fixed cadence, classifies every probe as up or down, keeps
//! running statistics (outage count, accumulated downtime, rolling response
//! time, availability percentage) and delivers a typed [`MonitorEvent`] on
//! every probe completion and lifecycle change.

pub mod config;
pub mod error;
pub mod events;
pub mod monitor;
pub mod probe;
pub mod report;

// Re-export main types
pub use config::{
    ConfigPatch, Expectation, HttpMethod, IntervalUnit, MonitorConfig, MonitorOptions,
    ProbeOptions, ProbeOptionsPatch,
};
pub use error::{ConfigError, ProbeFailure};
pub use events::{MonitorEvent, ResponseData};
pub use monitor::Monitor;
pub use probe::{HttpProber, ProbeOutcome, ProbeReply, ProbeTarget, Prober, TcpProber};
pub use report::{MonitorState, Report};
