// Failure taxonomy for the export/train/predict pipeline

/// Result alias used across the forecast modules.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Everything that can go wrong between the metrics store and a parsed
/// prediction. Nothing of this type escapes the orchestrator or predictor
/// boundary as `Err`; both convert to result objects with `success=false`.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("insufficient data: have {have} samples, need at least {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("forecasting engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("forecasting engine timed out: {0}")]
    Timeout(String),

    #[error("model '{0}' not found on the forecasting engine")]
    ModelNotFound(String),

    #[error("prediction artifact unreadable: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("artifact I/O failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("metrics store error: {source}")]
    Store {
        #[from]
        source: anyhow::Error,
    },
}

impl ForecastError {
    /// Transient failures are worth one retry; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForecastError::ServiceUnavailable(_) | ForecastError::Timeout(_)
        )
    }
}
