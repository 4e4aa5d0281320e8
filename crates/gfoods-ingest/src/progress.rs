//! Batch progress reporting
//!
//! Emits one `info` line per finished batch with the batch number, the rows
//! it covered, the running total and the elapsed time.

use gfoods_common::types::SourceKind;
use std::time::{Duration, Instant};
use tracing::info;

pub struct BatchProgress {
    source: SourceKind,
    total_batches: usize,
    total_rows: usize,
    rows_done: usize,
    started: Instant,
}

impl BatchProgress {
    pub fn new(source: SourceKind, total_batches: usize, total_rows: usize) -> Self {
        info!(
            source = %source,
            batches = total_batches,
            rows = total_rows,
            "Starting synonym lookup"
        );
        Self {
            source,
            total_batches,
            total_rows,
            rows_done: 0,
            started: Instant::now(),
        }
    }

    /// Record a finished batch (`index` is zero-based)
    pub fn batch_done(&mut self, index: usize, rows: usize) {
        self.rows_done += rows;
        info!(
            source = %self.source,
            batch = index + 1,
            of = self.total_batches,
            rows,
            done = self.rows_done,
            total = self.total_rows,
            elapsed = %format_elapsed(self.started.elapsed()),
            "[{}] batch {}/{} ({} rows, {}/{} done)",
            self.source,
            index + 1,
            self.total_batches,
            rows,
            self.rows_done,
            self.total_rows
        );
    }

    pub fn rows_done(&self) -> usize {
        self.rows_done
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Format a duration as `1h 02m 03s`, `4m 05s` or `6.7s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
