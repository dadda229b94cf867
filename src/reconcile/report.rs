use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::BoundingBox;

/// Counts for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub total: usize,
    pub suppressed: usize,
    pub flagged: usize,
    /// Malformed records passed through unchecked
    pub skipped: usize,
    /// Records left untouched because the run was cancelled
    pub unprocessed: usize,
}

impl FileSummary {
    pub fn new(name: impl Into<String>, total: usize) -> Self {
        Self {
            name: name.into(),
            total,
            ..Default::default()
        }
    }

    /// Records still present in the output
    pub fn remaining(&self) -> usize {
        self.total - self.suppressed
    }
}

/// Outcome of a whole batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files: Vec<FileSummary>,
    pub region: Option<BoundingBox>,
    pub cancelled: bool,
    pub invalid_names: usize,
    pub queries: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new(files: Vec<FileSummary>) -> Self {
        let now = Utc::now();
        Self {
            files,
            region: None,
            cancelled: false,
            invalid_names: 0,
            queries: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Sum over all files.
    pub fn totals(&self) -> FileSummary {
        self.files.iter().fold(FileSummary::new("total", 0), |mut acc, f| {
            acc.total += f.total;
            acc.suppressed += f.suppressed;
            acc.flagged += f.flagged;
            acc.skipped += f.skipped;
            acc.unprocessed += f.unprocessed;
            acc
        })
    }

    /// Mark every file as untouched, for runs cancelled before classification.
    pub fn mark_all_unprocessed(&mut self) {
        for file in &mut self.files {
            file.unprocessed = file.total;
        }
        self.cancelled = true;
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
