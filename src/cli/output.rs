//! CLI output formatting

use crate::{
    core::{Decoded, ExecutionStatus},
    execution::ExecutionEvent,
    persistence::RunRecord,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a step progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// One-line summary of a stored run
pub fn format_run_record(record: &RunRecord) -> String {
    let status_icon = match record.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Pending => INFO,
    };

    let mut line = format!(
        "{} {} - {} - {} ({}/{}) - {}",
        status_icon,
        style(short_id(&record.run_id)).dim(),
        style(&record.pipeline_name).bold(),
        format_status(record.status),
        record.completed_steps,
        record.total_steps,
        style(record.started_at.format("%Y-%m-%d %H:%M:%S")).dim()
    );
    if let Some(step) = &record.failed_step {
        line.push_str(&format!(" - failed at {}", style(step).red()));
    }
    line
}

/// Format an execution event for display
///
/// Per-transition events are left to the log; they return `None`.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting pipeline {} with {} steps ({})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(short_id(execution_id)).dim()
        ),
        ExecutionEvent::StepStarted { step_name, index } => {
            format!("{} [{}] {}", SPINNER, index + 1, style(step_name).cyan())
        }
        ExecutionEvent::StepTransition { .. } => return None,
        ExecutionEvent::StepCompleted { step_name, output } => format!(
            "{} {}\n{}",
            CHECK,
            style(step_name).green(),
            format_output(output, 5)
        ),
        ExecutionEvent::StepFailed { step_name, error } => {
            format!("{} {}: {}", CROSS, style(step_name).red(), style(error).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("completed {}", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => other.to_string(),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(short_id(execution_id)).dim(),
                status_str
            )
        }
    };
    Some(line)
}

/// Render a decoded value for the terminal: text verbatim, structures as JSON
pub fn format_decoded(decoded: &Decoded) -> String {
    match decoded {
        Decoded::Text(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Format a duration as `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
