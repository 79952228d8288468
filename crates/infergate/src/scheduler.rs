//! Fixed-period background jobs with per-firing failure isolation.
//!
//! Each firing runs in its own spawned task. An error is logged, a panic is
//! caught at the join boundary, and the schedule keeps going either way.
//! Dropping or shutting down a [`ScheduledTask`] cancels it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
pub use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;

/// One unit of periodic background work.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), BrokerError>;
}

pub struct ScheduledTask {
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `job` to fire every `period`, first firing one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(job: Arc<dyn Job>, period: Duration) -> Self {
        // tokio intervals reject a zero period.
        let period = period.max(Duration::from_millis(1));
        let name = job.name();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_schedule(job, period, cancel.clone()));

        tracing::info!(
            task = name,
            period_secs = period.as_secs_f64(),
            "Scheduled background task"
        );

        Self {
            name,
            period,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Cancel the schedule and wait for the loop to exit.
    ///
    /// A firing in progress is aborted.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(task = self.name, error = %e, "Scheduled task did not stop cleanly");
        }
        tracing::debug!(task = self.name, "Scheduled task stopped");
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_schedule(job: Arc<dyn Job>, period: Duration, cancel: CancellationToken) {
    let name = job.name();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let firing = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.run().await })
        };
        let abort = firing.abort_handle();

        tokio::select! {
            _ = cancel.cancelled() => {
                abort.abort();
                return;
            }
            result = firing => {
                match result {
                    Ok(Ok(())) => tracing::debug!(task = name, "Scheduled task fired"),
                    Ok(Err(e)) => tracing::warn!(task = name, error = %e, "Scheduled task failed"),
                    Err(e) => tracing::error!(task = name, error = %e, "Scheduled task panicked"),
                }
            }
        }
    }
}
