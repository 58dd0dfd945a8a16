//! Double pendulum engine: RK4 integrator, a tick-driven live simulation
//! with push-based history subscribers, and a progressive chaos map.

pub mod chaos_map;
pub mod error;
pub mod integrator;
pub mod listeners;
pub mod simulation;
pub mod types;

pub use chaos_map::{CancelToken, ChaosFrame, ChaosListener, ChaosMapGenerator};
pub use error::ConfigError;
pub use simulation::{ResetRequest, RunState, Simulation};
pub use types::{
    AxisRange, ChaosMapConfig, PendulumState, PhysicsParams, SimulationConfig, StateAxis,
};
