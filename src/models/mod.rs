// Domain models (samples, horizons, training/prediction results)

mod prediction;
mod sample;

pub use prediction::{
    CompositeTrainingResult, Horizon, HorizonTrainingOutcome, ModelIdentity, PredictionPoint,
    PredictionResult,
};
pub use sample::{RawSample, ScoredSample};
