use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// A progress checkpoint emitted roughly every 10% of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub completed: usize,
    pub total: usize,
    /// `completed / total` as a rounded percentage
    pub percent: u32,
}

impl ProgressReport {
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.completed, self.total, self.percent)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressReport) + Send + Sync>;

/// Counts successfully completed operations and reports at coarse intervals.
pub struct ProgressTracker {
    total: usize,
    interval: usize,
    completed: AtomicUsize,
    on_report: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            interval: (total / 10).max(1),
            completed: AtomicUsize::new(0),
            on_report: None,
        }
    }

    pub fn with_callback(mut self, on_report: ProgressCallback) -> Self {
        self.on_report = Some(on_report);
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Completions between two reports.
    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Records one completed operation, returning the report if one is due.
    pub fn record_completion(&self) -> Option<ProgressReport> {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if completed % self.interval != 0 && completed != self.total {
            return None;
        }

        let report = ProgressReport::new(completed, self.total);
        info!(
            completed = report.completed,
            total = report.total,
            percent = report.percent,
            "Progress: {report}"
        );
        if let Some(on_report) = &self.on_report {
            on_report(report);
        }
        Some(report)
    }
}
