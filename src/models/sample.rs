// Raw probe measurement, written by the ingestion path and read by the aggregator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub endpoint: String,
    /// Unix milliseconds.
    pub observed_at: i64,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub shaped_latency: Option<f64>,
    #[serde(default)]
    pub reliability: Option<f64>,
    pub user_agent: String,
    pub probe_id: String,
}
