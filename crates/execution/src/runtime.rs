//! Background refresh tasks.
//!
//! Pool snapshots and pending rewards are refreshed on their own schedules.
//! The scheduler emits task events; [`BackgroundTasks`] maps them to work.

use crate::config::AppConfig;
use crate::liquidity::PoolSnapshotService;
use crate::scheduler::{ScheduleBuilder, ScheduledTask, Scheduler, StopHandle, TaskEvent};
use crate::staking::RewardTicker;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const POOL_SNAPSHOT_TASK: &str = "pool-snapshot";
pub const REWARD_TICK_TASK: &str = "reward-tick";

/// The work behind each scheduled task.
#[derive(Default)]
pub struct BackgroundTasks {
    snapshots: Vec<Arc<PoolSnapshotService>>,
    ticker: Option<Arc<RewardTicker>>,
}

impl BackgroundTasks {
    /// Creates a new BackgroundTasks with nothing to do.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_snapshots(mut self, snapshots: Arc<PoolSnapshotService>) -> Self {
        self.snapshots.push(snapshots);
        self
    }

    #[must_use]
    pub fn with_ticker(mut self, ticker: Arc<RewardTicker>) -> Self {
        self.ticker = Some(ticker);
        self
    }

    /// Scheduler with one task per configured kind of work.
    pub fn scheduler(&self, config: &AppConfig) -> Scheduler {
        let mut scheduler = Scheduler::new();
        if !self.snapshots.is_empty() {
            scheduler.add_task(ScheduledTask::new(
                POOL_SNAPSHOT_TASK,
                ScheduleBuilder::every(config.pool_refresh_interval()),
            ));
        }
        if self.ticker.is_some() {
            scheduler.add_task(ScheduledTask::new(
                REWARD_TICK_TASK,
                ScheduleBuilder::every(config.reward_interval()),
            ));
        }
        scheduler
    }

    /// Runs the work for one event; false for an unknown task.
    ///
    /// Refresh failures are reported by the services themselves.
    pub async fn dispatch(&self, event: &TaskEvent) -> bool {
        match event.task_name.as_str() {
            POOL_SNAPSHOT_TASK => {
                for service in &self.snapshots {
                    let _ = service.refresh().await;
                }
                true
            }
            REWARD_TICK_TASK => {
                if let Some(ticker) = &self.ticker {
                    ticker.tick().await;
                }
                true
            }
            other => {
                warn!(task = other, "No handler for task");
                false
            }
        }
    }

    /// Handles events until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<TaskEvent>) {
        while let Some(event) = events.recv().await {
            let lag = event.triggered_at.saturating_duration_since(event.scheduled_at);
            debug!(task = %event.task_name, lag = ?lag, "Running task");
            self.dispatch(&event).await;
        }
        info!("Background tasks finished");
    }

    /// Refreshes everything once, then keeps refreshing on `scheduler`.
    pub fn spawn(self: Arc<Self>, mut scheduler: Scheduler) -> BackgroundHandle {
        let stop = scheduler.stop_handle();
        let events = scheduler.take_receiver();
        let scheduler_task = tokio::spawn(async move { scheduler.start().await });
        let worker = tokio::spawn(async move {
            for service in &self.snapshots {
                let _ = service.refresh().await;
            }
            match events {
                Some(events) => self.run(events).await,
                None => warn!("Scheduler receiver already taken"),
            }
        });
        BackgroundHandle {
            stop,
            scheduler_task,
            worker,
        }
    }
}

/// Running background tasks.
pub struct BackgroundHandle {
    stop: StopHandle,
    scheduler_task: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl BackgroundHandle {
    /// Stops the scheduler and waits for in-flight work to finish.
    pub async fn shutdown(self) {
        self.stop.stop();
        if let Err(e) = self.scheduler_task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Background worker ended abnormally");
        }
    }
}
