//! Background Execution and Task Scheduling
//!
//! Unique, constraint-aware one-shot work. A unit of work is identified by a
//! caller-chosen unique name; submitting a second request under the same name
//! is resolved by an [`ExistingWorkPolicy`]. The work itself is executed by a
//! [`WorkHandler`] registered under the request's worker name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Task execution constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    /// Require WiFi connection
    pub requires_wifi: bool,
    /// Require any network connection
    pub requires_network: bool,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            requires_wifi: false,
            requires_network: true,
        }
    }
}

impl TaskConstraints {
    /// No constraints at all; the work runs as soon as it is dequeued.
    pub fn none() -> Self {
        Self {
            requires_wifi: false,
            requires_network: false,
        }
    }
}

/// Scheduled task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting for its initial delay or for constraints to be met
    Scheduled,
    /// Currently executing
    Running,
    /// Waiting for the next attempt after a retry outcome
    Retrying,
    /// Completed successfully
    Completed,
    /// Failed permanently
    Failed,
    /// Cancelled or replaced
    Cancelled,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// What to do when unique work with the same name is already enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExistingWorkPolicy {
    /// Cancel the pending work and enqueue the new request in its place.
    Replace,
    /// Leave the pending work alone and drop the new request.
    Keep,
}

/// A one-shot unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Unique name used for deduplication and cancellation
    pub unique_name: String,
    /// Name of the registered [`WorkHandler`] that executes the work
    pub worker: String,
    /// Free-form tags for listing and diagnostics
    pub tags: Vec<String>,
    pub constraints: TaskConstraints,
    pub initial_delay: Duration,
    /// Input handed to the worker
    pub payload: serde_json::Value,
}

impl WorkRequest {
    pub fn new(unique_name: impl Into<String>, worker: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            worker: worker.into(),
            tags: Vec::new(),
            constraints: TaskConstraints::default(),
            initial_delay: Duration::ZERO,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_constraints(mut self, constraints: TaskConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Result reported by a [`WorkHandler`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    /// Transient failure; the executor schedules another attempt with backoff.
    Retry,
    /// Permanent failure; no further attempts.
    Failure,
}

/// Snapshot of a piece of unique work.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkInfo {
    pub id: TaskId,
    pub unique_name: String,
    pub tags: Vec<String>,
    pub status: TaskStatus,
    /// Number of attempts started so far
    pub attempts: u32,
}

/// Executes the payload of a [`WorkRequest`].
#[async_trait]
pub trait WorkHandler: Send + Sync {
    async fn run(&self, payload: &serde_json::Value) -> WorkOutcome;
}

/// Background task executor trait
///
/// Abstracts platform-specific background scheduling:
/// - **Android**: WorkManager unique work
/// - **iOS**: BGTaskScheduler
/// - **Desktop**: an in-process Tokio scheduler
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::{BackgroundExecutor, ExistingWorkPolicy, WorkRequest};
///
/// async fn schedule(executor: &dyn BackgroundExecutor) -> Result<()> {
///     let request = WorkRequest::new("cache_bookmark_7", "cache_bookmark")
///         .with_tag("bookmark_7");
///     executor
///         .enqueue_unique_work(request, ExistingWorkPolicy::Replace)
///         .await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BackgroundExecutor: Send + Sync {
    /// Register the handler that executes requests naming `worker`.
    async fn register_worker(&self, worker: &str, handler: Arc<dyn WorkHandler>) -> Result<()>;

    /// Enqueue one-shot unique work.
    ///
    /// Returns the id of the work that will run under the unique name, which is
    /// the existing id when `policy` is [`ExistingWorkPolicy::Keep`] and the
    /// previous work is still pending.
    async fn enqueue_unique_work(
        &self,
        request: WorkRequest,
        policy: ExistingWorkPolicy,
    ) -> Result<TaskId>;

    /// Cancel pending or running work by unique name.
    ///
    /// Returns `false` when nothing unfinished was registered under the name.
    async fn cancel_unique_work(&self, unique_name: &str) -> Result<bool>;

    /// Current state of the work registered under `unique_name`.
    async fn get_work_info(&self, unique_name: &str) -> Result<Option<WorkInfo>>;

    /// All work the executor still remembers.
    async fn list_work(&self) -> Result<Vec<WorkInfo>>;

    /// Check if background execution is available
    async fn is_available(&self) -> bool {
        true
    }
}
