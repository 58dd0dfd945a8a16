use std::time::Duration;

use crate::error::ConfigError;

pub type Rgb = [u8; 3];

/// Angles of both rods from vertical and their angular velocities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendulumState {
    pub theta1: f64,
    pub theta2: f64,
    pub omega1: f64,
    pub omega2: f64,
}

impl PendulumState {
    pub fn new(theta1: f64, theta2: f64, omega1: f64, omega2: f64) -> Self {
        Self {
            theta1,
            theta2,
            omega1,
            omega2,
        }
    }

    pub fn get(&self, axis: StateAxis) -> f64 {
        match axis {
            StateAxis::Theta1 => self.theta1,
            StateAxis::Theta2 => self.theta2,
            StateAxis::Omega1 => self.omega1,
            StateAxis::Omega2 => self.omega2,
        }
    }

    pub fn set(&mut self, axis: StateAxis, value: f64) {
        match axis {
            StateAxis::Theta1 => self.theta1 = value,
            StateAxis::Theta2 => self.theta2 = value,
            StateAxis::Omega1 => self.omega1 = value,
            StateAxis::Omega2 => self.omega2 = value,
        }
    }

    /// Euclidean distance between two states in the 4-dimensional state space.
    pub fn distance(&self, other: &Self) -> f64 {
        let d1 = self.theta1 - other.theta1;
        let d2 = self.theta2 - other.theta2;
        let d3 = self.omega1 - other.omega1;
        let d4 = self.omega2 - other.omega2;
        (d1 * d1 + d2 * d2 + d3 * d3 + d4 * d4).sqrt()
    }
}

/// Rod lengths, point masses and gravity. Immutable for the lifetime of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsParams {
    pub l1: f64,
    pub l2: f64,
    pub m1: f64,
    pub m2: f64,
    pub g: f64,
}

impl PhysicsParams {
    /// Display-scaled units for the live view: lengths are in screen points.
    pub const fn interactive() -> Self {
        Self {
            l1: 150.0,
            l2: 150.0,
            m1: 10.0,
            m2: 10.0,
            g: 1.0,
        }
    }

    /// Unit rods and masses under Earth gravity, used for the chaos map.
    pub const fn normalized() -> Self {
        Self {
            l1: 1.0,
            l2: 1.0,
            m1: 1.0,
            m2: 1.0,
            g: 9.81,
        }
    }
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self::normalized()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    pub dt: f64,
    pub base_steps_per_frame: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            base_steps_per_frame: 40,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateAxis {
    Theta1,
    Theta2,
    Omega1,
    Omega2,
}

impl StateAxis {
    pub fn label(self) -> &'static str {
        match self {
            StateAxis::Theta1 => "theta1",
            StateAxis::Theta2 => "theta2",
            StateAxis::Omega1 => "omega1",
            StateAxis::Omega2 => "omega2",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn at(&self, fraction: f64) -> f64 {
        self.min + fraction * self.span()
    }
}

/// Largest grid a chaos map run accepts (4096 x 4096).
pub const MAX_CHAOS_CELLS: usize = 1 << 24;

/// Everything a chaos map run depends on. The rendered buffer is a pure
/// function of this value.
#[derive(Clone, Copy, Debug)]
pub struct ChaosMapConfig {
    pub resolution: usize,
    pub x_axis: StateAxis,
    pub y_axis: StateAxis,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    /// Values for the two dimensions not swept by the map.
    pub base: PendulumState,
    pub params: PhysicsParams,
    pub steps: usize,
    pub dt: f64,
    pub epsilon: f64,
    pub distance_clamp: f64,
    pub score_scale: f64,
    pub intensity_exponent: f64,
    pub batch_budget: Duration,
}

impl Default for ChaosMapConfig {
    fn default() -> Self {
        Self {
            resolution: 200,
            x_axis: StateAxis::Omega1,
            y_axis: StateAxis::Omega2,
            x_range: AxisRange::new(-10.0, 10.0),
            y_range: AxisRange::new(-10.0, 10.0),
            base: PendulumState::default(),
            params: PhysicsParams::normalized(),
            steps: 300,
            dt: 0.01,
            epsilon: 1.0e-3,
            distance_clamp: 2.0,
            score_scale: 1.5,
            intensity_exponent: 0.4,
            batch_budget: Duration::from_millis(12),
        }
    }
}

impl ChaosMapConfig {
    pub fn total_cells(&self) -> usize {
        self.resolution * self.resolution
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cells = self.resolution.checked_mul(self.resolution);
        if self.resolution == 0 || cells.map_or(true, |cells| cells > MAX_CHAOS_CELLS) {
            return Err(ConfigError::InvalidResolution);
        }
        if self.steps == 0 {
            return Err(ConfigError::InvalidStepCount);
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if !self.epsilon.is_finite() {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if self.x_axis == self.y_axis {
            return Err(ConfigError::DuplicateAxis(self.x_axis));
        }
        for (axis, range) in [(self.x_axis, self.x_range), (self.y_axis, self.y_range)] {
            let valid = range.min.is_finite() && range.max.is_finite() && range.span() > 0.0;
            if !valid {
                return Err(ConfigError::InvalidRange {
                    axis,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        for (name, value) in [
            ("distance_clamp", self.distance_clamp),
            ("score_scale", self.score_scale),
            ("intensity_exponent", self.intensity_exponent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTuning { name, value });
            }
        }
        Ok(())
    }
}
