//! HTTP probe implementation backed by reqwest.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use url::Url;

use super::{ProbeOutcome, ProbeReply, ProbeTarget, Prober, DEFAULT_TIMEOUT_SECS};
use crate::config::{HttpMethod, ProbeOptions};
use crate::error::ProbeFailure;

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Probes a website with a single HTTP request per tick.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Build a prober honoring the transport-level overrides: per-probe
    /// timeout and the certificate identity verification toggle.
    pub fn new(options: &ProbeOptions) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        let (url, method) = match target {
            ProbeTarget::Website { url, method, .. } => (url.as_str(), *method),
            // A host address probed over HTTP is a misconfiguration at the
            // call site; treat the host as the URL and let it fail.
            ProbeTarget::Address { host, .. } => (host.as_str(), HttpMethod::Get),
        };

        if let Err(err) = Url::parse(url) {
            return Err(ProbeFailure::Transport {
                elapsed_ms: 0,
                message: format!("invalid url {url}: {err}"),
            });
        }

        let start = Instant::now();
        let response = match self.client.request(method.into(), url).send().await {
            Ok(response) => response,
            Err(err) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                return if err.is_timeout() {
                    Err(ProbeFailure::Timeout { elapsed_ms })
                } else {
                    Err(ProbeFailure::Transport { elapsed_ms, message: err.to_string() })
                };
            },
        };

        // Response time counts up to the response head; body download is
        // only needed for content matching.
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => Some(body),
            Err(err) => {
                return Err(ProbeFailure::Transport { elapsed_ms, message: err.to_string() });
            },
        };

        Ok(ProbeReply { elapsed_ms, status_code: Some(status_code), body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_is_a_transport_failure() {
        let prober = HttpProber::new(&ProbeOptions::default()).unwrap();
        let target = ProbeTarget::Website {
            url: "not a url".into(),
            method: HttpMethod::Get,
            options: ProbeOptions::default(),
        };

        let outcome = prober.probe(&target).await;
        match outcome {
            Err(ProbeFailure::Transport { message, .. }) => {
                assert!(message.contains("invalid url"));
            },
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[test]
    fn methods_map_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(HttpMethod::Head), reqwest::Method::HEAD);
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
    }
}
