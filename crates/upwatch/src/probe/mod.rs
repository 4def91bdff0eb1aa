//! Probe capability boundary.
//!
//! A [`Prober`] performs one check against a target and reports elapsed
//! time plus response metadata, or a transport failure. The monitor core
//! only depends on this trait; [`HttpProber`] and [`TcpProber`] are the
//! default implementations it wires up from the merged settings. Tests
//! inject scripted probers at the same seam.

pub mod http;
pub mod tcp;

pub use http::HttpProber;
pub use tcp::TcpProber;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{HttpMethod, ProbeOptions};
use crate::error::ProbeFailure;

/// Default per-probe timeout when the configuration does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// What a probe is aimed at.
#[derive(Debug, Clone)]
pub enum ProbeTarget {
    /// A website URL, probed over HTTP.
    Website { url: String, method: HttpMethod, options: ProbeOptions },
    /// A host address, probed with a TCP connect.
    Address { host: String, port: Option<u16>, options: ProbeOptions },
}

impl ProbeTarget {
    /// The URL or host string of the target.
    pub fn label(&self) -> &str {
        match self {
            ProbeTarget::Website { url, .. } => url,
            ProbeTarget::Address { host, .. } => host,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            ProbeTarget::Website { .. } => None,
            ProbeTarget::Address { port, .. } => *port,
        }
    }
}

/// Response metadata from a probe that succeeded at the transport level.
///
/// A non-2xx status code is still a transport-level success; classification
/// against the configured expectation happens in the transition engine.
#[derive(Debug, Clone)]
pub struct ProbeReply {
    pub elapsed_ms: u64,
    pub status_code: Option<u16>,
    pub body: Option<String>,
}

/// One completed probe.
pub type ProbeOutcome = Result<ProbeReply, ProbeFailure>;

/// Performs one check against a target.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome;
}

/// Default capability: dispatches to the HTTP or TCP prober by target kind.
pub(crate) struct DefaultProber {
    http: Option<HttpProber>,
    tcp: TcpProber,
}

impl DefaultProber {
    pub(crate) fn new(options: &ProbeOptions) -> Self {
        let http = match HttpProber::new(options) {
            Ok(prober) => Some(prober),
            Err(err) => {
                warn!("failed to build HTTP client: {err}");
                None
            },
        };
        Self { http, tcp: TcpProber::new(options) }
    }
}

#[async_trait]
impl Prober for DefaultProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        match target {
            ProbeTarget::Website { .. } => match &self.http {
                Some(http) => http.probe(target).await,
                None => Err(ProbeFailure::Transport {
                    elapsed_ms: 0,
                    message: "HTTP client unavailable".into(),
                }),
            },
            ProbeTarget::Address { .. } => self.tcp.probe(target).await,
        }
    }
}
