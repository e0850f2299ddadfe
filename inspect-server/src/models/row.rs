//! Dataset row model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::window::parse_timestamp;

/// Target column of uploaded datasets.
pub const LABEL_COLUMN: &str = "Response";

/// Column carrying the synthetic timestamp added at ingestion.
pub const TIMESTAMP_COLUMN: &str = "synthetic_timestamp";

/// Columns probed, in order, for a sample identifier.
pub const ID_COLUMNS: [&str; 4] = ["sample_ID", "Sample_ID", "Id", "id"];

/// Feature value of a dataset cell. Column sets vary per dataset so
/// values are kept dynamically typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub type FeatureMap = BTreeMap<String, FeatureValue>;

impl FeatureValue {
    /// Interpret a raw CSV cell.
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            return FeatureValue::Null;
        }
        if let Ok(i) = cell.parse::<i64>() {
            return FeatureValue::Int(i);
        }
        if let Ok(f) = cell.parse::<f64>() {
            if f.is_finite() {
                return FeatureValue::Float(f);
            }
        }
        match cell {
            "true" | "True" | "TRUE" => FeatureValue::Bool(true),
            "false" | "False" | "FALSE" => FeatureValue::Bool(false),
            _ => FeatureValue::Text(cell.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

impl From<Value> for FeatureValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FeatureValue::Null,
            Value::Bool(b) => FeatureValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FeatureValue::Int(i),
                None => n.as_f64().map(FeatureValue::Float).unwrap_or(FeatureValue::Null),
            },
            Value::String(s) => FeatureValue::Text(s),
            // Nested structures are not features; keep them readable.
            other => FeatureValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Null => Ok(()),
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Int(i) => write!(f, "{}", i),
            FeatureValue::Float(x) => write!(f, "{}", x),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ground-truth quality label, present on ingested rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Pass,
    Fail,
}

impl QualityLabel {
    /// Normalize a raw `Response` cell. Rows whose label does not map to
    /// pass/fail are not part of the dataset.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "p" | "pass" => Some(QualityLabel::Pass),
            "0" | "f" | "fail" => Some(QualityLabel::Fail),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("row is missing '{0}'")]
    MissingField(&'static str),

    #[error("row has unreadable timestamp '{0}'")]
    BadTimestamp(String),
}

/// One ordered record of the dataset.
///
/// `features` never contains the label or timestamp columns, so it can be
/// submitted for inference as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRow {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub label: Option<QualityLabel>,
    pub features: FeatureMap,
}

impl DataRow {
    /// Build a row from a JSON record returned by the predictor backend.
    pub fn from_record(mut record: serde_json::Map<String, Value>) -> Result<Self, RowError> {
        let timestamp = match record.remove(TIMESTAMP_COLUMN) {
            Some(Value::String(raw)) => {
                parse_timestamp(&raw).ok_or(RowError::BadTimestamp(raw))?
            }
            Some(other) => return Err(RowError::BadTimestamp(other.to_string())),
            None => return Err(RowError::MissingField(TIMESTAMP_COLUMN)),
        };

        let label = record
            .remove(LABEL_COLUMN)
            .and_then(|v| match v {
                Value::String(s) => QualityLabel::normalize(&s),
                Value::Number(n) => QualityLabel::normalize(&n.to_string()),
                _ => None,
            });

        let features: FeatureMap = record
            .into_iter()
            .map(|(k, v)| (k, FeatureValue::from(v)))
            .collect();

        let id = sample_id(&features).unwrap_or_else(|| "N/A".to_string());

        Ok(Self { id, timestamp, label, features })
    }
}

/// Find the sample identifier among the well-known id columns.
pub fn sample_id(features: &FeatureMap) -> Option<String> {
    ID_COLUMNS
        .iter()
        .filter_map(|col| features.get(*col))
        .find(|v| !v.is_null())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_cell() {
        assert_eq!(FeatureValue::from_cell(""), FeatureValue::Null);
        assert_eq!(FeatureValue::from_cell(" 42 "), FeatureValue::Int(42));
        assert_eq!(FeatureValue::from_cell("-0.25"), FeatureValue::Float(-0.25));
        assert_eq!(FeatureValue::from_cell("TRUE"), FeatureValue::Bool(true));
        assert_eq!(FeatureValue::from_cell("L0_S0"), FeatureValue::Text("L0_S0".into()));
        assert_eq!(FeatureValue::from_cell("NaN"), FeatureValue::Text("NaN".into()));
    }

    #[test]
    fn test_quality_label_normalize() {
        assert_eq!(QualityLabel::normalize("1"), Some(QualityLabel::Pass));
        assert_eq!(QualityLabel::normalize(" P "), Some(QualityLabel::Pass));
        assert_eq!(QualityLabel::normalize("Fail"), Some(QualityLabel::Fail));
        assert_eq!(QualityLabel::normalize("0"), Some(QualityLabel::Fail));
        assert_eq!(QualityLabel::normalize("maybe"), None);
    }

    #[test]
    fn test_from_record_strips_label_and_timestamp() {
        let record = json!({
            "Id": 17,
            "synthetic_timestamp": "2025-08-01T00:00:03",
            "Response": "pass",
            "L0_S0_F0": 0.03,
            "L0_S0_F2": null,
        });

        let row = DataRow::from_record(record.as_object().unwrap().clone()).unwrap();
        assert_eq!(row.id, "17");
        assert_eq!(row.label, Some(QualityLabel::Pass));
        assert_eq!(row.timestamp.to_rfc3339(), "2025-08-01T00:00:03+00:00");
        assert!(!row.features.contains_key(LABEL_COLUMN));
        assert!(!row.features.contains_key(TIMESTAMP_COLUMN));
        assert_eq!(row.features.get("L0_S0_F0"), Some(&FeatureValue::Float(0.03)));
        assert_eq!(row.features.get("L0_S0_F2"), Some(&FeatureValue::Null));
    }

    #[test]
    fn test_from_record_without_id_or_timestamp() {
        let no_id = json!({ "synthetic_timestamp": "2025-08-01T00:00:00", "x": 1 });
        let row = DataRow::from_record(no_id.as_object().unwrap().clone()).unwrap();
        assert_eq!(row.id, "N/A");
        assert_eq!(row.label, None);

        let no_ts = json!({ "Id": 1 });
        assert!(matches!(
            DataRow::from_record(no_ts.as_object().unwrap().clone()),
            Err(RowError::MissingField(TIMESTAMP_COLUMN))
        ));

        let bad_ts = json!({ "synthetic_timestamp": 12 });
        assert!(matches!(
            DataRow::from_record(bad_ts.as_object().unwrap().clone()),
            Err(RowError::BadTimestamp(_))
        ));
    }

    #[test]
    fn test_sample_id_prefers_sample_column() {
        let mut features = FeatureMap::new();
        features.insert("Id".into(), FeatureValue::Int(3));
        features.insert("sample_ID".into(), FeatureValue::Text("S-9".into()));
        assert_eq!(sample_id(&features).as_deref(), Some("S-9"));
    }
}
