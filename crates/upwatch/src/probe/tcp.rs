//! TCP connect probe.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ProbeOutcome, ProbeReply, ProbeTarget, Prober, DEFAULT_TIMEOUT_SECS};
use crate::config::ProbeOptions;
use crate::error::ProbeFailure;

/// Probes a host by opening (and immediately dropping) a TCP connection.
pub struct TcpProber {
    timeout_duration: Duration,
}

impl TcpProber {
    pub fn new(options: &ProbeOptions) -> Self {
        Self {
            timeout_duration: Duration::from_secs(
                options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        let endpoint = match target {
            ProbeTarget::Address { host, port, .. } => {
                format!("{}:{}", host, port.unwrap_or(0))
            },
            ProbeTarget::Website { url, .. } => url.clone(),
        };

        let start = Instant::now();
        match timeout(self.timeout_duration, TcpStream::connect(&endpoint)).await {
            Ok(Ok(_stream)) => {
                Ok(ProbeReply {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    status_code: None,
                    body: None,
                })
            },
            Ok(Err(err)) => Err(ProbeFailure::Transport {
                elapsed_ms: start.elapsed().as_millis() as u64,
                message: err.to_string(),
            }),
            Err(_) => Err(ProbeFailure::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_to_listening_socket_succeeds() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let prober = TcpProber::new(&ProbeOptions::default());
        let target = ProbeTarget::Address {
            host: "127.0.0.1".into(),
            port: Some(port),
            options: ProbeOptions::default(),
        };

        let outcome = prober.probe(&target).await;
        assert!(outcome.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        // Bind then drop so the port is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = TcpProber::new(&ProbeOptions::default());
        let target = ProbeTarget::Address {
            host: "127.0.0.1".into(),
            port: Some(port),
            options: ProbeOptions::default(),
        };

        match prober.probe(&target).await {
            Err(ProbeFailure::Transport { .. }) => {},
            other => panic!("expected transport failure, got {other:?}"),
        }
    }
}
