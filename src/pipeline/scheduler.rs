// src/pipeline/scheduler.rs

//! Cron-driven repetition of collection runs.
//!
//! The job runs once immediately on start and then at every fire time of
//! the schedule. Runs never overlap: the next fire time is computed after
//! the previous run has finished, so a run that overshoots its slot skips
//! the missed ones.

use std::future::Future;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::storage::BulkWriter;
use crate::utils::schedule::next_delay;

/// A running schedule.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start firing `job` on its own task.
    pub fn start<F, Fut>(schedule: Schedule, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            job().await;

            loop {
                let Some(delay) = next_delay(&schedule, Utc::now()) else {
                    log::warn!("Schedule has no upcoming fire time, stopping");
                    break;
                };
                log::debug!("Next collection run in {:?}", delay);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stopped.changed() => break,
                }

                job().await;
            }

            log::debug!("Scheduler loop exited");
        });

        Self { shutdown, handle }
    }

    /// Stop scheduling, wait for an in-flight run, then close the writer.
    pub async fn stop(self, writer: &dyn BulkWriter) -> Result<()> {
        log::info!("Stopping scheduler");
        // A send error means the loop is already gone.
        let _ = self.shutdown.send(true);
        self.handle.await?;

        writer.close().await?;
        log::info!("Scheduler stopped");
        Ok(())
    }
}
