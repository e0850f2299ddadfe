//! Dataset handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::ingest::ingest_csv;
use crate::models::{RangeValidation, UploadResponse, UploadSummary, ValidateRangesRequest};
use crate::services::period::validate_ranges as check_ranges;
use crate::{AppError, AppResult, AppState};

/// Upload a CSV dataset and make it the current generation
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("dataset.csv").to_string();
            let bytes = field.bytes().await?;
            file = Some((name, bytes));
            break;
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| AppError::ValidationError("No file uploaded.".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::ValidationError("No file uploaded.".to_string()));
    }

    let epoch = state.config.dataset_epoch;
    let dataset = tokio::task::spawn_blocking({
        let bytes = bytes.clone();
        let file_name = file_name.clone();
        move || ingest_csv(&bytes[..], &file_name, epoch)
    })
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))??;

    let dataset = state.store.replace(dataset);
    let summary = dataset
        .summary()
        .ok_or_else(|| AppError::InternalError("ingested dataset is empty".to_string()))?;

    let predictor_synced = if state.config.forward_uploads {
        match state.predictor.upload_dataset(&file_name, bytes.to_vec()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dataset not forwarded to predictor: {}", e);
                false
            }
        }
    } else {
        false
    };

    tracing::info!(
        "Dataset uploaded: {} ({} records, pass rate {}%)",
        summary.file_name, summary.total_records, summary.pass_rate
    );

    Ok(Json(UploadResponse { summary, predictor_synced }))
}

/// Summary of the current dataset
pub async fn summary(State(state): State<AppState>) -> AppResult<Json<UploadSummary>> {
    state
        .store
        .snapshot()
        .and_then(|d| d.summary())
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No dataset uploaded.".to_string()))
}

/// Validate the training / testing / simulation split
pub async fn validate_ranges(
    State(state): State<AppState>,
    Json(req): Json<ValidateRangesRequest>,
) -> (StatusCode, Json<RangeValidation>) {
    let snapshot = state.store.snapshot();
    let result = check_ranges(&req, snapshot.as_deref());

    if result.is_valid {
        tracing::debug!("Ranges accepted: {:?}", result.record_counts);
        (StatusCode::OK, Json(result))
    } else {
        tracing::debug!("Ranges rejected: {}", result.message);
        (StatusCode::BAD_REQUEST, Json(result))
    }
}
