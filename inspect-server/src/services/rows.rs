//! Row fetching for simulation windows

use crate::models::{DataRow, TimeWindow};
use crate::store::DatasetStore;

use super::predictor::{PredictorClient, PredictorError};

/// Source of the ordered rows replayed by a simulation.
///
/// Implementations return rows inside the inclusive window, ascending by
/// synthetic timestamp. No match is an empty vector, not an error.
#[axum::async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, window: &TimeWindow) -> Result<Vec<DataRow>, PredictorError>;
}

#[axum::async_trait]
impl RowSource for PredictorClient {
    async fn fetch_rows(&self, window: &TimeWindow) -> Result<Vec<DataRow>, PredictorError> {
        let rows = self.get_data_for_range(window).await?;
        tracing::debug!(
            "Predictor returned {} rows for {} .. {}",
            rows.len(), window.start, window.end
        );
        Ok(rows)
    }
}

#[axum::async_trait]
impl RowSource for DatasetStore {
    async fn fetch_rows(&self, window: &TimeWindow) -> Result<Vec<DataRow>, PredictorError> {
        Ok(self.rows_in_window(window))
    }
}
