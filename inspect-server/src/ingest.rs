//! CSV ingestion - turns an uploaded file into a [`Dataset`]

use chrono::{DateTime, Duration, Utc};
use std::io::Read;

use crate::models::{sample_id, DataRow, FeatureMap, FeatureValue, QualityLabel, LABEL_COLUMN};
use crate::store::Dataset;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid file type. Please upload a CSV.")]
    NotCsv,

    #[error("CSV file is empty or has no header.")]
    Empty,

    #[error("Dataset must have a '{}' column.", LABEL_COLUMN)]
    MissingLabelColumn,

    #[error("No valid rows with 'pass' or 'fail' found.")]
    NoValidRows,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse an uploaded CSV.
///
/// Rows whose `Response` does not normalize to pass/fail are dropped; the
/// remaining rows get synthetic timestamps one second apart from `epoch`.
pub fn ingest_csv<R: Read>(
    reader: R,
    file_name: &str,
    epoch: DateTime<Utc>,
) -> Result<Dataset, IngestError> {
    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(IngestError::NotCsv);
    }

    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(IngestError::Empty);
    }

    let label_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(LABEL_COLUMN))
        .ok_or(IngestError::MissingLabelColumn)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in csv.records() {
        let record = record?;

        let label = match record.get(label_idx).and_then(QualityLabel::normalize) {
            Some(label) => label,
            None => {
                skipped += 1;
                continue;
            }
        };

        let features: FeatureMap = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(i, name)| {
                let value = record.get(i).map(FeatureValue::from_cell).unwrap_or(FeatureValue::Null);
                (name.to_string(), value)
            })
            .collect();

        let ordinal = rows.len();
        let id = sample_id(&features).unwrap_or_else(|| (ordinal + 1).to_string());

        rows.push(DataRow {
            id,
            timestamp: epoch + Duration::seconds(ordinal as i64),
            label: Some(label),
            features,
        });
    }

    if rows.is_empty() {
        return Err(IngestError::NoValidRows);
    }

    if skipped > 0 {
        tracing::warn!("{}: skipped {} rows without a pass/fail label", file_name, skipped);
    }

    // +1 for the synthetic timestamp column
    Ok(Dataset::new(file_name, headers.len() + 1, rows))
}
