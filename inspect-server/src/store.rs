//! Dataset store - single in-memory generation, replaced atomically

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::{
    round2, DataRow, QualityLabel, TimeWindow, UploadSummary,
};

/// One uploaded dataset. Rows are sorted by timestamp and never mutated.
#[derive(Debug)]
pub struct Dataset {
    file_name: String,
    column_count: usize,
    rows: Vec<DataRow>,
}

impl Dataset {
    pub fn new(file_name: impl Into<String>, column_count: usize, mut rows: Vec<DataRow>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self {
            file_name: file_name.into(),
            column_count,
            rows,
        }
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(min, max)` synthetic timestamps
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Rows inside the inclusive window, ascending by timestamp.
    pub fn rows_in_window(&self, window: &TimeWindow) -> Vec<DataRow> {
        let lo = self.rows.partition_point(|r| r.timestamp < window.start);
        let hi = self.rows.partition_point(|r| r.timestamp <= window.end);
        if lo >= hi {
            return Vec::new();
        }
        self.rows[lo..hi].to_vec()
    }

    pub fn summary(&self) -> Option<UploadSummary> {
        let (start, end) = self.bounds()?;
        let total = self.rows.len();
        let passed = self
            .rows
            .iter()
            .filter(|r| r.label == Some(QualityLabel::Pass))
            .count();

        Some(UploadSummary {
            message: format!("Dataset ({} records) processed.", total),
            file_name: self.file_name.clone(),
            total_records: total,
            column_count: self.column_count,
            date_range_start: start,
            date_range_end: end,
            pass_rate: round2(passed as f64 / total as f64 * 100.0),
        })
    }
}

/// Holder of the current dataset generation.
///
/// Readers take an `Arc` snapshot and keep it for as long as they need;
/// an upload swaps the pointer and never touches rows in place.
#[derive(Debug, Default)]
pub struct DatasetStore {
    current: RwLock<Option<Arc<Dataset>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.current.read().clone()
    }

    /// Publish a new generation, returning it.
    pub fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let previous = self.current.write().replace(dataset.clone());

        if let Some(prev) = previous {
            tracing::info!(
                "Dataset replaced: {} -> {} ({} rows)",
                prev.file_name, dataset.file_name, dataset.len()
            );
        } else {
            tracing::info!("Dataset loaded: {} ({} rows)", dataset.file_name, dataset.len());
        }
        dataset
    }

    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.snapshot().and_then(|d| d.bounds())
    }

    pub fn rows_in_window(&self, window: &TimeWindow) -> Vec<DataRow> {
        self.snapshot()
            .map(|d| d.rows_in_window(window))
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().map(|d| !d.is_empty()).unwrap_or(false)
    }
}
