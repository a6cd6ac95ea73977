//! Background Task Execution Implementation

use async_trait::async_trait;
use bridge_traits::{
    background::{
        BackgroundExecutor, ExistingWorkPolicy, TaskConstraints, TaskId, TaskStatus, WorkHandler,
        WorkInfo, WorkOutcome, WorkRequest,
    },
    error::{BridgeError, Result},
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30 * 60);
const DEFAULT_CONSTRAINT_POLL: Duration = Duration::from_secs(5);
const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(60);

type WorkTable = Arc<RwLock<HashMap<String, WorkEntry>>>;

/// Tokio-based background executor for desktop.
///
/// Each unique name maps to at most one live run. A run waits out its initial
/// delay, polls the network until its constraints hold, then invokes the
/// registered [`WorkHandler`]. `Retry` outcomes back off exponentially until
/// `max_attempts` is reached.
///
/// Finished runs stay queryable for a retention window and are then dropped
/// from the table, unless a newer run has taken over the unique name.
pub struct TokioBackgroundExecutor {
    work: WorkTable,
    workers: Arc<RwLock<HashMap<String, Arc<dyn WorkHandler>>>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    retry: RetrySettings,
    constraint_poll: Duration,
    finished_retention: Duration,
    next_run: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct RetrySettings {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetrySettings {
    /// Delay after the `attempt`-th failed attempt (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

struct WorkEntry {
    run: u64,
    info: WorkInfo,
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Everything a spawned run needs, detached from the executor.
struct RunContext {
    work: WorkTable,
    run: u64,
    unique_name: String,
    handler: Arc<dyn WorkHandler>,
    monitor: Option<Arc<dyn NetworkMonitor>>,
    retry: RetrySettings,
    constraint_poll: Duration,
    retention: Duration,
}

impl TokioBackgroundExecutor {
    /// Create a new background executor with no network monitoring.
    pub fn new() -> Self {
        Self {
            work: Arc::new(RwLock::new(HashMap::new())),
            workers: Arc::new(RwLock::new(HashMap::new())),
            network_monitor: None,
            retry: RetrySettings {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                base_delay: DEFAULT_BASE_DELAY,
                max_delay: DEFAULT_MAX_DELAY,
            },
            constraint_poll: DEFAULT_CONSTRAINT_POLL,
            finished_retention: DEFAULT_FINISHED_RETENTION,
            next_run: AtomicU64::new(1),
        }
    }

    /// Use `monitor` to evaluate network constraints.
    ///
    /// Without a monitor, network constraints are assumed satisfied.
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Override the retry budget and the base backoff delay.
    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.retry.max_attempts = max_attempts.max(1);
        self.retry.base_delay = base_delay;
        self.retry.max_delay = self.retry.max_delay.max(base_delay);
        self
    }

    /// Override how often unmet constraints are re-checked.
    pub fn with_constraint_poll_interval(mut self, interval: Duration) -> Self {
        self.constraint_poll = interval;
        self
    }

    /// How long finished, failed or cancelled work stays in the table.
    pub fn with_finished_retention(mut self, retention: Duration) -> Self {
        self.finished_retention = retention;
        self
    }

    async fn worker_for(&self, worker: &str) -> Option<Arc<dyn WorkHandler>> {
        let workers = self.workers.read().await;
        workers.get(worker).cloned()
    }

    async fn constraints_satisfied(
        monitor: Option<&Arc<dyn NetworkMonitor>>,
        constraints: &TaskConstraints,
    ) -> bool {
        if !(constraints.requires_network || constraints.requires_wifi) {
            return true;
        }

        let Some(monitor) = monitor else {
            return true;
        };

        match monitor.get_network_info().await {
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                network_type,
                ..
            }) => {
                if constraints.requires_wifi {
                    matches!(network_type, Some(NetworkType::WiFi))
                } else {
                    true
                }
            }
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "Network monitor error");
                false
            }
        }
    }
}

/// Drop the entry of `run` once `retention` has passed, if it is still the
/// finished run registered under `unique_name`.
fn forget_after(work: WorkTable, unique_name: String, run: u64, retention: Duration) {
    tokio::spawn(async move {
        if !retention.is_zero() {
            sleep(retention).await;
        }
        let mut work = work.write().await;
        let stale = work
            .get(&unique_name)
            .is_some_and(|entry| entry.run == run && entry.info.status.is_finished());
        if stale {
            work.remove(&unique_name);
            debug!(unique_name = %unique_name, run, "Forgot finished work");
        }
    });
}

impl Default for TokioBackgroundExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Apply `update` if this run still owns the unique name and has not
    /// been finished by someone else (cancellation).
    async fn update<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut WorkEntry),
    {
        let mut work = self.work.write().await;
        match work.get_mut(&self.unique_name) {
            Some(entry) if entry.run == self.run && !entry.info.status.is_finished() => {
                update(entry);
                true
            }
            _ => false,
        }
    }

    async fn finish(&self, status: TaskStatus) {
        let finished = self
            .update(|entry| {
                entry.info.status = status;
                entry.cancel = None;
            })
            .await;
        if finished {
            forget_after(
                Arc::clone(&self.work),
                self.unique_name.clone(),
                self.run,
                self.retention,
            );
        }
    }

    /// Sleep for `duration`; `false` when cancelled first.
    async fn wait(&self, duration: Duration, cancel_rx: &mut oneshot::Receiver<()>) -> bool {
        tokio::select! {
            _ = cancel_rx => false,
            _ = sleep(duration) => true,
        }
    }

    async fn execute(self, request: WorkRequest, mut cancel_rx: oneshot::Receiver<()>) {
        if !request.initial_delay.is_zero() && !self.wait(request.initial_delay, &mut cancel_rx).await
        {
            debug!(unique_name = %self.unique_name, "Work cancelled during initial delay");
            return;
        }

        let mut attempt = 0u32;
        loop {
            while !TokioBackgroundExecutor::constraints_satisfied(
                self.monitor.as_ref(),
                &request.constraints,
            )
            .await
            {
                debug!(unique_name = %self.unique_name, "Constraints not satisfied; deferring");
                if !self.wait(self.constraint_poll, &mut cancel_rx).await {
                    return;
                }
            }

            attempt += 1;
            let started = self
                .update(|entry| {
                    entry.info.status = TaskStatus::Running;
                    entry.info.attempts = attempt;
                })
                .await;
            if !started {
                return;
            }

            // A panicking handler counts as a transient failure
            let outcome = AssertUnwindSafe(self.handler.run(&request.payload))
                .catch_unwind()
                .await
                .unwrap_or(WorkOutcome::Retry);

            match outcome {
                WorkOutcome::Success => {
                    debug!(unique_name = %self.unique_name, attempt, "Work completed");
                    self.finish(TaskStatus::Completed).await;
                    return;
                }
                WorkOutcome::Failure => {
                    warn!(unique_name = %self.unique_name, attempt, "Work failed permanently");
                    self.finish(TaskStatus::Failed).await;
                    return;
                }
                WorkOutcome::Retry if attempt >= self.retry.max_attempts => {
                    warn!(
                        unique_name = %self.unique_name,
                        attempt,
                        "Work exhausted its retry budget"
                    );
                    self.finish(TaskStatus::Failed).await;
                    return;
                }
                WorkOutcome::Retry => {
                    let delay = self.retry.delay_after(attempt);
                    let backing_off = self
                        .update(|entry| entry.info.status = TaskStatus::Retrying)
                        .await;
                    if !backing_off {
                        return;
                    }
                    debug!(
                        unique_name = %self.unique_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying work after backoff"
                    );
                    if !self.wait(delay, &mut cancel_rx).await {
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl BackgroundExecutor for TokioBackgroundExecutor {
    async fn register_worker(&self, worker: &str, handler: Arc<dyn WorkHandler>) -> Result<()> {
        let mut workers = self.workers.write().await;
        workers.insert(worker.to_string(), handler);
        debug!(worker, "Registered background worker");
        Ok(())
    }

    async fn enqueue_unique_work(
        &self,
        request: WorkRequest,
        policy: ExistingWorkPolicy,
    ) -> Result<TaskId> {
        let handler = self.worker_for(&request.worker).await.ok_or_else(|| {
            BridgeError::OperationFailed(format!(
                "No worker registered under: {}",
                request.worker
            ))
        })?;

        let mut work = self.work.write().await;

        if let Some(existing) = work.get_mut(&request.unique_name) {
            if !existing.info.status.is_finished() {
                match policy {
                    ExistingWorkPolicy::Keep => {
                        debug!(unique_name = %request.unique_name, "Keeping existing work");
                        return Ok(existing.info.id.clone());
                    }
                    ExistingWorkPolicy::Replace => {
                        debug!(unique_name = %request.unique_name, "Replacing existing work");
                        if let Some(cancel) = existing.cancel.take() {
                            let _ = cancel.send(());
                        }
                    }
                }
            }
        }

        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        let id = TaskId::new(format!("{}#{}", request.unique_name, run));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let context = RunContext {
            work: Arc::clone(&self.work),
            run,
            unique_name: request.unique_name.clone(),
            handler,
            monitor: self.network_monitor.clone(),
            retry: self.retry,
            constraint_poll: self.constraint_poll,
            retention: self.finished_retention,
        };

        info!(
            unique_name = %request.unique_name,
            worker = %request.worker,
            delay_ms = request.initial_delay.as_millis() as u64,
            "Enqueued unique work"
        );

        let unique_name = request.unique_name.clone();
        let tags = request.tags.clone();
        // The table lock is held until the entry is in place, so the run
        // cannot observe a missing entry.
        let handle = tokio::spawn(context.execute(request, cancel_rx));

        work.insert(
            unique_name.clone(),
            WorkEntry {
                run,
                info: WorkInfo {
                    id: id.clone(),
                    unique_name,
                    tags,
                    status: TaskStatus::Scheduled,
                    attempts: 0,
                },
                cancel: Some(cancel_tx),
                handle: Some(handle),
            },
        );

        Ok(id)
    }

    async fn cancel_unique_work(&self, unique_name: &str) -> Result<bool> {
        let mut work = self.work.write().await;
        let Some(entry) = work.get_mut(unique_name) else {
            return Ok(false);
        };
        if entry.info.status.is_finished() {
            return Ok(false);
        }

        let running = entry.info.status == TaskStatus::Running;
        let run = entry.run;
        entry.info.status = TaskStatus::Cancelled;
        if let Some(cancel) = entry.cancel.take() {
            let _ = cancel.send(());
        }
        // A running handler is left to finish; its outcome is discarded
        if !running {
            if let Some(handle) = entry.handle.take() {
                handle.abort();
            }
        }

        forget_after(
            Arc::clone(&self.work),
            unique_name.to_string(),
            run,
            self.finished_retention,
        );

        debug!(unique_name, "Cancelled unique work");
        Ok(true)
    }

    async fn get_work_info(&self, unique_name: &str) -> Result<Option<WorkInfo>> {
        let work = self.work.read().await;
        Ok(work.get(unique_name).map(|entry| entry.info.clone()))
    }

    async fn list_work(&self) -> Result<Vec<WorkInfo>> {
        let work = self.work.read().await;
        let mut infos: Vec<WorkInfo> = work.values().map(|entry| entry.info.clone()).collect();
        infos.sort_by(|a, b| a.unique_name.cmp(&b.unique_name));
        Ok(infos)
    }
}
