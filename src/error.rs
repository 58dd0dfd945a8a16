//! Configuration errors raised when a chaos map run is requested.

use thiserror::Error;

use crate::types::StateAxis;

/// Rejected chaos map configuration. Raised synchronously by
/// [`ChaosMapGenerator::run`](crate::chaos_map::ChaosMapGenerator::run)
/// before any run state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid resolution must be between 1 and 4096")]
    InvalidResolution,

    #[error("step count must be at least 1")]
    InvalidStepCount,

    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("perturbation must be finite, got {0}")]
    InvalidEpsilon(f64),

    #[error("range for {axis:?} must be finite and non-empty, got [{min}, {max}]")]
    InvalidRange { axis: StateAxis, min: f64, max: f64 },

    #[error("both map axes are {0:?}; the free dimensions must differ")]
    DuplicateAxis(StateAxis),

    #[error("{name} must be finite and positive, got {value}")]
    InvalidTuning { name: &'static str, value: f64 },
}
