use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::timestamp;

fn default_true() -> bool {
    true
}

/// `GET /api/<category>/`: cached list, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ListResponse<T> {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub days: u32,
    pub sources: Vec<String>,
}

/// Reply to a fetch trigger. Synchronous backends return the refreshed list
/// in `data`; queued backends return a `task_id` to poll instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct FetchResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_source: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_severity: Option<BTreeMap<String, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_category: Option<BTreeMap<String, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_type: Option<BTreeMap<String, u64>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cached: bool,
}

impl StatsResponse {
    /// The category-specific breakdown, if the backend sends one.
    pub fn breakdown(&self) -> Option<(&'static str, &BTreeMap<String, u64>)> {
        if let Some(map) = &self.by_severity {
            return Some(("severity", map));
        }
        if let Some(map) = &self.by_category {
            return Some(("category", map));
        }
        self.by_type.as_ref().map(|map| ("type", map))
    }
}

/// Sorts a count map by descending count, then name, the way the backend
/// orders its `annotate(...).order_by('-count')` breakdowns.
pub fn sorted_counts(map: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut counts: Vec<(&str, u64)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ExportResponse<T> {
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Retry,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_uppercase().as_str() {
            "STARTED" | "PROGRESS" => Self::Started,
            "RETRY" => Self::Retry,
            "SUCCESS" => Self::Success,
            "FAILURE" | "REVOKED" => Self::Failure,
            _ => Self::Pending,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl TaskStatusResponse {
    /// Human-readable outcome carried in `result.message`, or the result
    /// itself when the task returned a bare string.
    pub fn message(&self) -> Option<String> {
        match self.result.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    /// A task can finish with `SUCCESS` while reporting `success: false` in
    /// its result payload.
    pub fn reported_failure(&self) -> bool {
        self.result
            .as_ref()
            .and_then(|result| result.get("success"))
            .and_then(serde_json::Value::as_bool)
            == Some(false)
    }
}

/// Body of a non-2xx reply, e.g. `{ "success": false, "message": "...", "errors": {...} }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CveEntry;

    #[test]
    fn decodes_stats_with_severity_breakdown() {
        let stats: StatsResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "total": 3,
            "by_source": {"NVD": 2, "CIRCL": 1},
            "by_severity": {"Kritik": 1, "Orta": 2},
            "last_update": "2025-05-04T10:11:12.000001+00:00",
            "cached": true
        }))
        .expect("decode stats");

        let (name, map) = stats.breakdown().expect("breakdown");
        assert_eq!(name, "severity");
        assert_eq!(sorted_counts(map), vec![("Orta", 2), ("Kritik", 1)]);
        assert!(stats.last_update.is_some());
    }

    #[test]
    fn null_last_update_is_none() {
        let stats: StatsResponse = serde_json::from_value(serde_json::json!({
            "success": true,
            "total": 0,
            "by_source": {},
            "last_update": null,
            "cached": false
        }))
        .expect("decode stats");
        assert!(stats.last_update.is_none());
        assert!(stats.breakdown().is_none());
    }

    #[test]
    fn fetch_response_without_task_id() {
        let response: FetchResponse<CveEntry> = serde_json::from_value(serde_json::json!({
            "success": false,
            "message": "CVE bulunamadi",
            "count": 0,
            "data": []
        }))
        .expect("decode fetch response");
        assert!(!response.success);
        assert!(response.task_id.is_none());
        assert_eq!(response.message, "CVE bulunamadi");
    }

    #[test]
    fn task_state_is_case_insensitive_and_defaults_to_pending() {
        let status: TaskStatusResponse =
            serde_json::from_str(r#"{"state":"success","result":{"success":false,"message":"Haber bulunamadi"}}"#)
                .expect("decode");
        assert_eq!(status.state, TaskState::Success);
        assert!(status.reported_failure());
        assert_eq!(status.message().as_deref(), Some("Haber bulunamadi"));

        let queued: TaskStatusResponse =
            serde_json::from_str(r#"{"state":"QUEUED"}"#).expect("decode");
        assert_eq!(queued.state, TaskState::Pending);
        assert!(!queued.state.is_terminal());
    }
}
