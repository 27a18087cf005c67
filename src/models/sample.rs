// Raw machine samples and their scored form

use serde::{Deserialize, Serialize};

/// One raw resource sample. Any counter may be absent (collector warm-up,
/// platform without the counter).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub cpu_usage_percent: Option<f64>,
    pub memory_usage_bytes: Option<f64>,
    pub memory_capacity_bytes: Option<f64>,
    pub disk_read_throughput_kbs: Option<f64>,
    pub disk_write_throughput_kbs: Option<f64>,
    pub network_received_throughput_kbs: Option<f64>,
    pub network_transmitted_throughput_kbs: Option<f64>,
}

/// Raw sample plus derived load scores. Produced by `scoring::score`.
/// Every present `*_score` is in [0, 100]; a score is `None` when its
/// raw inputs were absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSample {
    #[serde(flatten)]
    pub raw: RawSample,
    pub memory_usage_percent: Option<f64>,
    pub cpu_load_score: Option<f64>,
    pub disk_load_score: Option<f64>,
    pub network_load_score: Option<f64>,
    pub io_load_score: Option<f64>,
    pub overall_load_score: Option<f64>,
}

impl ScoredSample {
    /// Select a series value by metric name for training export.
    /// Returns `None` for samples where the metric was not captured.
    pub fn metric_value(&self, metric_name: &str) -> Option<f64> {
        match metric_name {
            "cpu_usage_percent" => self.raw.cpu_usage_percent,
            "memory_usage_percent" => self.memory_usage_percent,
            "disk_read_throughput_kbs" => self.raw.disk_read_throughput_kbs,
            "disk_write_throughput_kbs" => self.raw.disk_write_throughput_kbs,
            "network_received_throughput_kbs" => self.raw.network_received_throughput_kbs,
            "network_transmitted_throughput_kbs" => self.raw.network_transmitted_throughput_kbs,
            "overall_load_score" => self.overall_load_score,
            _ => None,
        }
    }

    /// Metric names accepted by `metric_value` (and therefore exportable).
    pub fn is_known_metric(metric_name: &str) -> bool {
        matches!(
            metric_name,
            "cpu_usage_percent"
                | "memory_usage_percent"
                | "disk_read_throughput_kbs"
                | "disk_write_throughput_kbs"
                | "network_received_throughput_kbs"
                | "network_transmitted_throughput_kbs"
                | "overall_load_score"
        )
    }
}
