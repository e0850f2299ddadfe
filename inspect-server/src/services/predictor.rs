//! Predictor backend client
//!
//! HTTP client for the external ML service. The service is treated as
//! unreliable: every call is bounded by the client timeout, and per-row
//! inference degrades to a sentinel result instead of failing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{
    DataRow, FeatureMap, PredictionLabel, PredictionResult, RowError, TimeWindow, TrainModelRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("predictor unreachable: {0}")]
    Network(String),

    #[error("predictor returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable predictor response: {0}")]
    Parse(String),

    #[error("malformed row from predictor: {0}")]
    Row(#[from] RowError),
}

impl PredictorError {
    /// The backend could not be reached or refused the request. Callers
    /// degrade this to "no data"; anything else means the data is bad.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PredictorError::Network(_) | PredictorError::Status { .. })
    }
}

/// Inference seam used by the simulation controller.
#[axum::async_trait]
pub trait Predictor: Send + Sync {
    /// Never fails: a backend problem yields [`PredictionResult::sentinel`].
    async fn predict(&self, features: &FeatureMap) -> PredictionResult;
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(alias = "Prediction")]
    prediction: String,
    #[serde(alias = "Confidence")]
    confidence: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeBody {
    start_date: String,
    end_date: String,
}

/// Client for the predictor backend
#[derive(Debug, Clone)]
pub struct PredictorClient {
    base_url: String,
    http: reqwest::Client,
}

impl PredictorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PredictorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// One inference call, surfacing every failure.
    pub async fn try_predict(&self, features: &FeatureMap) -> Result<PredictionResult, PredictorError> {
        let response = self.http
            .post(self.url("predict"))
            .json(features)
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        let body: PredictResponse = read_json(response).await?;
        Ok(PredictionResult::new(
            PredictionLabel::parse(&body.prediction),
            body.confidence,
        ))
    }

    /// Rows of the inclusive window, ascending by synthetic timestamp.
    pub async fn get_data_for_range(&self, window: &TimeWindow) -> Result<Vec<DataRow>, PredictorError> {
        let body = DateRangeBody {
            start_date: window.start.to_rfc3339(),
            end_date: window.end.to_rfc3339(),
        };

        let response = self.http
            .post(self.url("get-data-for-range"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        let records: Vec<serde_json::Map<String, serde_json::Value>> = read_json(response).await?;

        let mut rows = records
            .into_iter()
            .map(DataRow::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        rows.retain(|r| window.contains(r.timestamp));
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    /// Forward a raw dataset file so the backend can train on it.
    pub async fn upload_dataset(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), PredictorError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| PredictorError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.http
            .post(self.url("upload-dataset/"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    pub async fn train(&self, req: &TrainModelRequest) -> Result<serde_json::Value, PredictorError> {
        let response = self.http
            .post(self.url("train-model"))
            .json(req)
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        read_json(response).await
    }

    pub async fn feature_importance(&self) -> Result<serde_json::Value, PredictorError> {
        let response = self.http
            .get(self.url("feature-importance"))
            .send()
            .await
            .map_err(|e| PredictorError::Network(e.to_string()))?;

        read_json(response).await
    }
}

#[axum::async_trait]
impl Predictor for PredictorClient {
    async fn predict(&self, features: &FeatureMap) -> PredictionResult {
        match self.try_predict(features).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Prediction failed, substituting sentinel: {}", e);
                PredictionResult::sentinel()
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PredictorError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PredictorError::Status { status: status.as_u16(), body });
    }

    response.json().await.map_err(|e| PredictorError::Parse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        extract::Multipart,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    /// Serve `app` on an ephemeral port and return its base URL.
    pub(crate) async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str) -> PredictorClient {
        PredictorClient::new(base, Duration::from_secs(2)).unwrap()
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::new(
            crate::models::parse_timestamp(start).unwrap(),
            crate::models::parse_timestamp(end).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_predict_normalizes_response() {
        let app = Router::new().route(
            "/predict",
            post(|Json(body): Json<Value>| async move {
                assert!(body.get("Response").is_none());
                Json(json!({ "prediction": "fail", "confidence": 87.456 }))
            }),
        );
        let predictor = client(&serve(app).await);

        let mut features = FeatureMap::new();
        features.insert("L0_S0_F0".into(), crate::models::FeatureValue::Float(0.1));

        let result = predictor.predict(&features).await;
        assert_eq!(result.label, PredictionLabel::Fail);
        assert_eq!(result.confidence, 87.456);
    }

    #[tokio::test]
    async fn test_predict_falls_back_to_sentinel() {
        let app = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "Model not available.") }),
        );
        let predictor = client(&serve(app).await);

        let err = predictor.try_predict(&FeatureMap::new()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Status { status: 503, .. }));

        let result = predictor.predict(&FeatureMap::new()).await;
        assert_eq!(result, PredictionResult::sentinel());
    }

    #[tokio::test]
    async fn test_predict_malformed_body_is_sentinel() {
        let app = Router::new().route("/predict", post(|| async { Json(json!({ "label": 1 })) }));
        let predictor = client(&serve(app).await);

        assert!(predictor.predict(&FeatureMap::new()).await.is_error());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let predictor = client(&format!("http://{}", addr));
        let err = predictor
            .get_data_for_range(&window("2025-08-01T00:00:00Z", "2025-08-01T00:10:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictorError::Network(_)));
        assert!(predictor.predict(&FeatureMap::new()).await.is_error());
    }

    #[tokio::test]
    async fn test_get_data_for_range_orders_and_filters() {
        let app = Router::new().route(
            "/get-data-for-range",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["startDate"], "2025-08-01T00:00:01+00:00");
                Json(json!([
                    { "Id": 3, "synthetic_timestamp": "2025-08-01T00:00:03", "Response": "pass", "f": 1.0 },
                    { "Id": 1, "synthetic_timestamp": "2025-08-01T00:00:01", "Response": "fail", "f": 2.0 },
                    { "Id": 9, "synthetic_timestamp": "2025-08-01T00:00:09", "Response": "pass", "f": 3.0 },
                ]))
            }),
        );
        let predictor = client(&serve(app).await);

        let rows = predictor
            .get_data_for_range(&window("2025-08-01T00:00:01Z", "2025-08-01T00:00:05Z"))
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_get_data_for_range_status_error() {
        let app = Router::new().route(
            "/get-data-for-range",
            post(|| async { (StatusCode::NOT_FOUND, "Parquet dataset not found.") }),
        );
        let predictor = client(&serve(app).await);

        let err = predictor
            .get_data_for_range(&window("2025-08-01T00:00:00Z", "2025-08-01T00:10:00Z"))
            .await
            .unwrap_err();
        match err {
            PredictorError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Parquet"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_dataset_sends_file_part() {
        let app = Router::new().route(
            "/upload-dataset/",
            post(|mut multipart: Multipart| async move {
                let field = multipart.next_field().await.unwrap().unwrap();
                assert_eq!(field.name(), Some("file"));
                assert_eq!(field.file_name(), Some("bosch.csv"));
                let text = field.text().await.unwrap();
                assert!(text.starts_with("Id,Response"));
                Json(json!({ "message": "File uploaded." }))
            }),
        );
        let predictor = client(&serve(app).await);

        predictor
            .upload_dataset("bosch.csv", b"Id,Response\n1,1\n".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_dataset_rejected_by_backend() {
        let app = Router::new().route(
            "/upload-dataset/",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad file") }),
        );
        let predictor = client(&serve(app).await);

        let err = predictor.upload_dataset("x.csv", Vec::new()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Status { status: 422, .. }));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_train_forwards_rfc3339_periods() {
        let app = Router::new().route(
            "/train-model",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["trainStart"], "2021-01-01T00:00:00Z");
                assert_eq!(body["testEnd"], "2021-01-01T00:14:59Z");
                Json(json!({ "accuracy": 0.93, "f1Score": 0.91 }))
            }),
        );
        let predictor = client(&serve(app).await);

        let req: TrainModelRequest = serde_json::from_value(json!({
            "trainStart": "2021-01-01T00:00",
            "trainEnd": "2021-01-01T00:11:39",
            "testStart": "2021-01-01T00:11:41",
            "testEnd": "2021-01-01T00:14:59",
        }))
        .unwrap();

        let metrics = predictor.train(&req).await.unwrap();
        assert_eq!(metrics["accuracy"], 0.93);
    }

    #[tokio::test]
    async fn test_feature_importance_passthrough_and_errors() {
        let app = Router::new().route(
            "/feature-importance",
            get(|| async { Json(json!([{ "feature": "L0_S0_F0", "importance": 0.4 }])) }),
        );
        let predictor = client(&serve(app).await);

        let importance = predictor.feature_importance().await.unwrap();
        assert_eq!(importance[0]["feature"], "L0_S0_F0");

        let missing = client(&serve(Router::new()).await);
        let err = missing.feature_importance().await.unwrap_err();
        assert!(matches!(err, PredictorError::Status { status: 404, .. }));
    }

    #[test]
    fn test_only_transport_errors_are_unavailable() {
        assert!(PredictorError::Network("refused".into()).is_unavailable());
        assert!(PredictorError::Status { status: 500, body: String::new() }.is_unavailable());
        assert!(!PredictorError::Parse("eof".into()).is_unavailable());
        assert!(!PredictorError::Row(RowError::MissingField("synthetic_timestamp")).is_unavailable());
    }
}
