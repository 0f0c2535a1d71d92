//! Scheduler for background refresh work.
//!
//! Tasks are named and run on a fixed interval or once after a delay. The
//! scheduler only emits [`TaskEvent`]s; the receiver decides what a task
//! name means.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval};
use tracing::{debug, info, warn};

/// Schedule type for task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Run at fixed intervals.
    Interval(Duration),
    /// Run once after delay.
    Once(Duration),
}

/// A scheduled task.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: String,
    pub schedule: Schedule,
    pub enabled: bool,
    pub last_run: Option<Instant>,
    /// `None` once a one-shot task has fired.
    pub next_run: Option<Instant>,
}

impl ScheduledTask {
    /// Creates a new scheduled task.
    pub fn new(name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            schedule,
            enabled: true,
            last_run: None,
            next_run: None,
        }
    }

    /// Disables the task.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Event sent when a task should run.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    pub task_name: String,
    pub scheduled_at: Instant,
    pub triggered_at: Instant,
}

/// Stops a [`Scheduler`] from another task, also before it started.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Scheduler for managing task execution timing.
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    event_tx: mpsc::Sender<TaskEvent>,
    event_rx: Option<mpsc::Receiver<TaskEvent>>,
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    /// How often due tasks are checked.
    tick: Duration,
}

impl Scheduler {
    /// Creates a new scheduler checking due tasks every second.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            tasks: Vec::new(),
            event_tx: tx,
            event_rx: Some(rx),
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            tick: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Adds a task to the scheduler.
    pub fn add_task(&mut self, task: ScheduledTask) {
        info!(task = %task.name, schedule = ?task.schedule, "Adding task to scheduler");
        self.tasks.push(task);
    }

    /// Removes a task by name.
    pub fn remove_task(&mut self, name: &str) {
        self.tasks.retain(|t| t.name != name);
    }

    pub fn enable_task(&mut self, name: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.enabled = true;
        }
    }

    pub fn disable_task(&mut self, name: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.enabled = false;
        }
    }

    /// Takes the event receiver for processing events.
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<TaskEvent>> {
        self.event_rx.take()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_requested))
    }

    /// Runs until stopped or until the event receiver is dropped.
    pub async fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);

        info!(tasks = self.tasks.len(), tick = ?self.tick, "Starting scheduler");

        let now = Instant::now();
        for task in &mut self.tasks {
            task.next_run = Some(now + Self::delay(&task.schedule));
        }

        let mut check_interval = interval(self.tick);

        while !self.stop_requested.load(Ordering::SeqCst) {
            check_interval.tick().await;
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }

            let now = Instant::now();
            let mut events_to_send = Vec::new();

            for task in &mut self.tasks {
                if !task.enabled {
                    continue;
                }

                if let Some(next_run) = task.next_run
                    && now >= next_run
                {
                    events_to_send.push(TaskEvent {
                        task_name: task.name.clone(),
                        scheduled_at: next_run,
                        triggered_at: now,
                    });

                    task.last_run = Some(now);
                    task.next_run = match task.schedule {
                        Schedule::Interval(every) => Some(now + every),
                        Schedule::Once(_) => None,
                    };

                    debug!(task = %task.name, next_run = ?task.next_run, "Task triggered");
                }
            }

            for event in events_to_send {
                let task_name = event.task_name.clone();
                if let Err(e) = self.event_tx.send(event).await {
                    warn!(task = %task_name, error = %e, "Event receiver gone, stopping scheduler");
                    self.stop_requested.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);
        info!("Scheduler stopped");
    }

    /// Stops the scheduler.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    fn delay(schedule: &Schedule) -> Duration {
        match schedule {
            Schedule::Interval(every) => *every,
            Schedule::Once(delay) => *delay,
        }
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating common schedules.
pub struct ScheduleBuilder;

impl ScheduleBuilder {
    pub fn every(duration: Duration) -> Schedule {
        Schedule::Interval(duration)
    }

    pub fn every_secs(secs: u64) -> Schedule {
        Schedule::Interval(Duration::from_secs(secs))
    }

    pub fn once_after(delay: Duration) -> Schedule {
        Schedule::Once(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_builder() {
        assert_eq!(ScheduleBuilder::every_secs(30), Schedule::Interval(Duration::from_secs(30)));
        let task = ScheduledTask::new("pool-snapshot", ScheduleBuilder::every_secs(30));
        assert!(task.enabled);
        assert!(!task.disabled().enabled);
    }

    #[tokio::test]
    async fn test_interval_repeats_and_once_fires_once() {
        let mut scheduler = Scheduler::new().with_tick(Duration::from_millis(5));
        scheduler.add_task(ScheduledTask::new(
            "reward-tick",
            ScheduleBuilder::every(Duration::from_millis(10)),
        ));
        scheduler.add_task(ScheduledTask::new(
            "warmup",
            ScheduleBuilder::once_after(Duration::from_millis(1)),
        ));
        scheduler.add_task(
            ScheduledTask::new("off", ScheduleBuilder::every(Duration::from_millis(1))).disabled(),
        );
        let mut rx = scheduler.take_receiver().unwrap();
        let stop = scheduler.stop_handle();
        let handle = tokio::spawn(async move {
            scheduler.start().await;
            scheduler
        });

        let mut names = Vec::new();
        while names.iter().filter(|n| *n == "reward-tick").count() < 3 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(event.triggered_at >= event.scheduled_at);
            names.push(event.task_name);
        }
        stop.stop();
        let scheduler = handle.await.unwrap();

        assert_eq!(names.iter().filter(|n| *n == "warmup").count(), 1);
        assert!(!names.iter().any(|n| n == "off"));
        assert!(!scheduler.is_running());
        let warmup = scheduler.tasks().iter().find(|t| t.name == "warmup").unwrap();
        assert!(warmup.next_run.is_none());
    }
}
