use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use gatehouse_types::models::{SweepOutcome, SweepStatus};

use crate::error::ApiError;
use crate::facade::DeviceFacade;

/// Runs expiration sweeps one at a time. A sweep requested while another
/// is in flight is skipped rather than queued.
pub struct Sweeper {
    devices: DeviceFacade,
    running: AtomicBool,
}

/// Clears the running flag when the sweep ends, even on error or panic.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Sweeper {
    pub fn new(devices: DeviceFacade) -> Self {
        Self {
            devices,
            running: AtomicBool::new(false),
        }
    }

    fn try_begin(&self) -> Option<SweepGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard(&self.running))
    }

    /// Disables every expired device. `Ok(None)` means another sweep was
    /// already running and this one did nothing.
    pub async fn sweep(&self) -> Result<Option<Vec<SweepOutcome>>, ApiError> {
        let Some(_guard) = self.try_begin() else {
            debug!("Expired device sweep already running, skipping");
            return Ok(None);
        };

        let outcomes = self.devices.process_expired_devices().await?;
        Ok(Some(outcomes))
    }
}

/// Background task that disables expired devices.
///
/// Ticks immediately and then every `interval`. A failed sweep is logged and
/// the loop carries on with the next tick.
pub async fn run_sweep_loop(sweeper: Arc<Sweeper>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match sweeper.sweep().await {
            Ok(Some(outcomes)) => {
                let failed = outcomes
                    .iter()
                    .filter(|o| o.status == SweepStatus::Error)
                    .count();
                let disabled = outcomes.len() - failed;

                if disabled > 0 {
                    info!("Sweep: disabled {} expired devices", disabled);
                }
                for outcome in outcomes.iter().filter(|o| o.status == SweepStatus::Error) {
                    warn!(
                        "Sweep: could not disable {}: {}",
                        outcome.android_id,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}
