//! Periodic probe scheduling.
//!
//! One spawned task per armed monitor: it fires an immediate probe and then
//! one per interval tick. Probe dispatch is fire-and-forget, so a probe
//! outlasting the interval never blocks the timer (and overlapping probes
//! are possible by design).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::MonitorCore;

/// Arm the repeating timer. The first tick completes immediately.
pub(crate) fn spawn_timer(core: Arc<MonitorCore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        loop {
            timer.tick().await;
            debug!("probe tick");
            MonitorCore::dispatch_probe(&core);
        }
    })
}
