// Forecast horizons, model identities and result types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast lookahead window. Each horizon has its own trained model and its
/// own training-window policy: short horizons train on recent, fine-grained
/// data; the 24h horizon trains on three days of coarse samples to pick up
/// daily cycles without overfitting to noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    TwentyFourHours,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [
        Horizon::OneHour,
        Horizon::SixHours,
        Horizon::TwentyFourHours,
    ];

    /// Model-name suffix, also the wire form ("1h" / "6h" / "24h").
    pub fn suffix(self) -> &'static str {
        match self {
            Horizon::OneHour => "1h",
            Horizon::SixHours => "6h",
            Horizon::TwentyFourHours => "24h",
        }
    }

    /// Human-readable period for messages and recommendations.
    pub fn label(self) -> &'static str {
        match self {
            Horizon::OneHour => "1 hour",
            Horizon::SixHours => "6 hours",
            Horizon::TwentyFourHours => "24 hours",
        }
    }

    /// Forecast reach in seconds.
    pub fn seconds(self) -> u64 {
        match self {
            Horizon::OneHour => 3_600,
            Horizon::SixHours => 21_600,
            Horizon::TwentyFourHours => 86_400,
        }
    }

    /// Training lookback window in hours (3x the horizon).
    pub fn lookback_hours(self) -> u32 {
        match self {
            Horizon::OneHour => 3,
            Horizon::SixHours => 18,
            Horizon::TwentyFourHours => 72,
        }
    }

    /// Training downsampling interval in seconds.
    pub fn sample_interval_secs(self) -> u64 {
        match self {
            Horizon::OneHour => 60,
            Horizon::SixHours => 360,
            Horizon::TwentyFourHours => 1_440,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Horizon::OneHour),
            "6h" => Ok(Horizon::SixHours),
            "24h" => Ok(Horizon::TwentyFourHours),
            other => Err(format!("unknown horizon '{}', expected 1h|6h|24h", other)),
        }
    }
}

/// Identity of one engine-side model: a caller-assigned base name plus the
/// horizon it serves. The canonical string form is the only place the
/// `{base}_{suffix}` name is built; re-training the same identity replaces
/// the prior model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentity {
    pub base: String,
    pub horizon: Horizon,
}

impl ModelIdentity {
    pub fn new(base: impl Into<String>, horizon: Horizon) -> Self {
        Self {
            base: base.into(),
            horizon,
        }
    }

    /// Engine-side model name, e.g. `webserver_6h`.
    pub fn canonical_name(&self) -> String {
        format!("{}_{}", self.base, self.horizon.suffix())
    }

    /// Parse a canonical name back into base + horizon. Names without a
    /// recognized horizon suffix are not model-family members.
    pub fn from_canonical(name: &str) -> Option<Self> {
        let (base, suffix) = name.rsplit_once('_')?;
        if base.is_empty() {
            return None;
        }
        let horizon = suffix.parse().ok()?;
        Some(Self::new(base, horizon))
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

/// Outcome of one horizon's training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonTrainingOutcome {
    pub model_name: String,
    pub horizon: Horizon,
    pub success: bool,
    pub message: String,
    pub data_points: u64,
}

/// Aggregate of the three per-horizon training jobs. `success` is permissive:
/// at least one horizon trained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeTrainingResult {
    pub success: bool,
    pub message: String,
    pub outcomes: Vec<HorizonTrainingOutcome>,
}

impl CompositeTrainingResult {
    pub fn trained_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}

/// One point of a parsed prediction series. Timestamps are kept in the
/// engine's ISO form; the series is ordered as returned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPoint {
    pub timestamp: String,
    pub predicted_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Final per-horizon prediction returned to API callers. Failures are carried
/// in-band (`success=false` + message), never as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub success: bool,
    pub message: String,
    pub horizon_label: String,
    pub final_predicted_value: Option<f64>,
    pub is_anomaly: bool,
    pub recommendations: Vec<String>,
    pub series: Vec<PredictionPoint>,
}

impl PredictionResult {
    pub fn failure(horizon: Horizon, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            horizon_label: horizon.label().to_string(),
            final_predicted_value: None,
            is_anomaly: false,
            recommendations: Vec::new(),
            series: Vec::new(),
        }
    }
}
