//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every step stored its result
    Completed,
    /// A step failed and the run was aborted
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Failed => "Failed",
        };
        f.write_str(text)
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ExecutionStatus::Pending),
            "Running" => Ok(ExecutionStatus::Running),
            "Completed" => Ok(ExecutionStatus::Completed),
            "Failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// State of a single step within one run
///
/// `Pending → Resolved → Invoked → Decoded → Stored`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not run yet
    Pending,
    /// Prompt rendered
    Resolved,
    /// Backend returned raw output
    Invoked,
    /// Raw output decoded into the destination
    Decoded,
    /// Result written to memory
    Stored,
    /// Step failed; the run stops here
    Failed { error: String },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Stored | StepState::Failed { .. })
    }

    /// Short label for logs and events
    pub fn label(&self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Resolved => "resolved",
            StepState::Invoked => "invoked",
            StepState::Decoded => "decoded",
            StepState::Stored => "stored",
            StepState::Failed { .. } => "failed",
        }
    }
}

/// Overall pipeline state for the latest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID, fresh for every run
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of steps that stored their result
    pub completed_steps: usize,

    /// Step that aborted the run, if any
    pub failed_step: Option<String>,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            failed_step: None,
        }
    }

    /// Mark pipeline as started, resetting counters from a previous run
    pub fn start(&mut self, total_steps: usize) {
        self.execution_id = Uuid::new_v4();
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.total_steps = total_steps;
        self.completed_steps = 0;
        self.failed_step = None;
    }

    /// Record a stored step
    pub fn step_completed(&mut self) {
        self.completed_steps += 1;
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed at `step`
    pub fn fail(&mut self, step: Option<&str>) {
        self.status = ExecutionStatus::Failed;
        self.failed_step = step.map(str::to_string);
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
