// Per-endpoint, per-window report document. Statistics without input stay None (never 0).

use serde::{Deserialize, Serialize};

use super::Window;
use crate::version::REPORT_SCHEMA_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub endpoint: String,
    /// Unix seconds, aligned to `period`.
    pub window_start: i64,
    pub period: u32,
    pub sample_count: u32,
    pub probe_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_shaped_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_reliability: Option<f64>,
    pub user_agent_changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_user_agent: Option<String>,
    pub schema_version: String,
}

impl Summary {
    /// Tombstone for a window without samples: marks the window processed.
    pub fn blank(endpoint: &str, window: Window) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            window_start: window.start,
            period: window.period,
            sample_count: 0,
            probe_count: 0,
            mean_latency: None,
            median_latency: None,
            mean_shaped_latency: None,
            mean_reliability: None,
            user_agent_changed: false,
            start_user_agent: None,
            end_user_agent: None,
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.sample_count == 0
    }

    pub fn window(&self) -> Window {
        Window {
            start: self.window_start,
            period: self.period,
        }
    }
}
