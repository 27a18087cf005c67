// Forecasting pipeline: engine client, circuit breaker, multi-horizon
// training orchestration, prediction parsing, and series analysis.

pub mod analysis;
pub mod breaker;
pub mod engine;
mod error;
pub mod orchestrator;
pub mod predictor;

pub use breaker::CircuitBreaker;
pub use engine::{
    ForecastEngine, HttpForecastEngine, PredictRequest, PredictResponse, TrainRequest,
    TrainResponse,
};
pub use error::{ForecastError, ForecastResult};
pub use orchestrator::Orchestrator;
pub use predictor::Predictor;
