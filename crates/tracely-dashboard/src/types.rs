//! Dashboard API request and response types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTrend {
    pub date: String,
    pub count: u64,
}

/// `GET /api/overview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewResponse {
    #[serde(rename = "todayPV")]
    pub today_pv: u64,
    #[serde(rename = "todayUV")]
    pub today_uv: u64,
    #[serde(rename = "totalErrors")]
    pub total_errors: u64,
    #[serde(rename = "todayErrors")]
    pub today_errors: u64,
    #[serde(rename = "topErrors", default)]
    pub top_errors: Vec<TopError>,
    #[serde(rename = "errorTrend", default)]
    pub error_trend: Vec<ErrorTrend>,
}

/// One aggregated error, as stored by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLog {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Fingerprint", default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Stack", default)]
    pub stack: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "AppID", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(rename = "UserAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "Count", default)]
    pub count: u64,
    #[serde(rename = "FirstSeen", default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
    #[serde(rename = "LastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// `GET /api/errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorListResponse {
    #[serde(default)]
    pub list: Vec<ErrorLog>,
    pub total: u64,
}

/// Paging and filtering for the error list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorQuery {
    pub page: u32,
    pub page_size: u32,
    pub kind: Option<String>,
}

impl ErrorQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Query parameters, with the page at least 1 and the page size
    /// clamped to `1..=100`.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            (
                "pageSize",
                self.page_size.clamp(1, Self::MAX_PAGE_SIZE).to_string(),
            ),
        ];
        if let Some(kind) = self.kind.as_deref().filter(|k| !k.is_empty()) {
            params.push(("type", kind.to_string()));
        }
        params
    }
}

impl Default for ErrorQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
            kind: None,
        }
    }
}

/// Range and application for page-view statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub days: u32,
    pub app_id: Option<String>,
}

impl StatsQuery {
    pub const DEFAULT_DAYS: u32 = 7;
    pub const MAX_DAYS: u32 = 30;

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("days", self.days.clamp(1, Self::MAX_DAYS).to_string())];
        if let Some(app_id) = self.app_id.as_deref().filter(|a| !a.is_empty()) {
            params.push(("appID", app_id.to_string()));
        }
        params
    }
}

impl Default for StatsQuery {
    fn default() -> Self {
        Self {
            days: Self::DEFAULT_DAYS,
            app_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: String,
    pub pv: u64,
    pub uv: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPage {
    pub page: String,
    pub pv: u64,
    #[serde(rename = "avgDuration")]
    pub avg_duration: f64,
}

/// `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub daily: Vec<DailyStats>,
    #[serde(rename = "topPages", default)]
    pub top_pages: Vec<TopPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appName")]
    pub app_name: String,
}

/// `GET /api/apps`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppsResponse {
    #[serde(default)]
    pub apps: Vec<AppInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_log_uses_server_field_names() {
        let log: ErrorLog = serde_json::from_value(json!({
            "ID": 3,
            "Type": "jsError",
            "Message": "boom",
            "Stack": "at x",
            "URL": "http://h/a",
            "Count": 12,
            "LastSeen": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(log.id, 3);
        assert_eq!(log.kind, "jsError");
        assert_eq!(log.count, 12);
        assert_eq!(log.fingerprint, None);
        assert_eq!(log.last_seen.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_overview_field_names() {
        let overview: OverviewResponse = serde_json::from_value(json!({
            "todayPV": 10, "todayUV": 4, "totalErrors": 99, "todayErrors": 2,
            "topErrors": [{"type": "jsError", "message": "boom", "count": 5}],
            "errorTrend": [{"date": "2024-05-01", "count": 2}]
        }))
        .unwrap();
        assert_eq!(overview.today_pv, 10);
        assert_eq!(overview.top_errors[0].kind, "jsError");
    }

    #[test]
    fn test_error_query_params() {
        let params = ErrorQuery::default().to_params();
        assert_eq!(params, vec![("page", "1".to_string()), ("pageSize", "20".to_string())]);

        let query = ErrorQuery {
            page: 0,
            page_size: 500,
            kind: Some("promiseError".to_string()),
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("page", "1".to_string()),
                ("pageSize", "100".to_string()),
                ("type", "promiseError".to_string())
            ]
        );
    }

    #[test]
    fn test_stats_query_clamps_days() {
        let query = StatsQuery {
            days: 90,
            app_id: Some("a1".to_string()),
        };
        assert_eq!(
            query.to_params(),
            vec![("days", "30".to_string()), ("appID", "a1".to_string())]
        );
        assert_eq!(StatsQuery::default().to_params(), vec![("days", "7".to_string())]);
    }
}
