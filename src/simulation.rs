use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::integrator;
use crate::listeners::{Registry, Subscription};
use crate::types::{PendulumState, PhysicsParams, SimulationConfig};

/// Receives the chronological state history of one frame. The slice is only
/// valid for the duration of the call.
pub type HistoryListener = dyn Fn(&[PendulumState]) + Send + Sync;
pub type ResetListener = dyn Fn() + Send + Sync;

pub type HistorySubscription = Subscription<HistoryListener>;
pub type ResetSubscription = Subscription<ResetListener>;

const RANDOM_JITTER: f64 = 0.25;

pub const MAX_STEPS_PER_FRAME: usize = 20_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Optional overrides for [`Simulation::reset`]. An empty request draws a
/// randomized start; otherwise unset fields keep the current initial state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResetRequest {
    pub theta1: Option<f64>,
    pub theta2: Option<f64>,
    pub omega1: Option<f64>,
    pub omega2: Option<f64>,
}

impl ResetRequest {
    pub fn theta1(mut self, value: f64) -> Self {
        self.theta1 = Some(value);
        self
    }

    pub fn theta2(mut self, value: f64) -> Self {
        self.theta2 = Some(value);
        self
    }

    pub fn omega1(mut self, value: f64) -> Self {
        self.omega1 = Some(value);
        self
    }

    pub fn omega2(mut self, value: f64) -> Self {
        self.omega2 = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.theta1.is_none()
            && self.theta2.is_none()
            && self.omega1.is_none()
            && self.omega2.is_none()
    }

    fn apply(&self, fallback: &PendulumState) -> PendulumState {
        PendulumState {
            theta1: self.theta1.unwrap_or(fallback.theta1),
            theta2: self.theta2.unwrap_or(fallback.theta2),
            omega1: self.omega1.unwrap_or(fallback.omega1),
            omega2: self.omega2.unwrap_or(fallback.omega2),
        }
    }
}

impl From<PendulumState> for ResetRequest {
    fn from(state: PendulumState) -> Self {
        Self {
            theta1: Some(state.theta1),
            theta2: Some(state.theta2),
            omega1: Some(state.omega1),
            omega2: Some(state.omega2),
        }
    }
}

/// The live pendulum. Owns its state exclusively; observers only ever get
/// copies or borrowed history slices.
pub struct Simulation {
    params: PhysicsParams,
    config: SimulationConfig,
    state: PendulumState,
    initial: PendulumState,
    speed: f64,
    run_state: RunState,
    rng: StdRng,
    subscribers: Registry<HistoryListener>,
    reset_listeners: Registry<ResetListener>,
}

impl Simulation {
    pub fn new(params: PhysicsParams, config: SimulationConfig) -> Self {
        Self::with_rng(params, config, StdRng::from_entropy())
    }

    pub fn with_seed(params: PhysicsParams, config: SimulationConfig, seed: u64) -> Self {
        Self::with_rng(params, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: PhysicsParams, config: SimulationConfig, mut rng: StdRng) -> Self {
        let state = random_start(&mut rng);
        Self {
            params,
            config,
            state,
            initial: state,
            speed: 1.0,
            run_state: RunState::Running,
            rng,
            subscribers: Registry::default(),
            reset_listeners: Registry::default(),
        }
    }

    pub fn params(&self) -> PhysicsParams {
        self.params
    }

    pub fn state(&self) -> PendulumState {
        self.state
    }

    pub fn initial_state(&self) -> PendulumState {
        self.initial
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn start(&mut self) {
        if self.run_state == RunState::Stopped {
            debug!("simulation started");
            self.run_state = RunState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.run_state == RunState::Running {
            debug!("simulation stopped");
            self.run_state = RunState::Stopped;
        }
    }

    pub fn multiply_speed(&mut self, factor: f64) {
        let next = self.speed * factor;
        if !factor.is_finite() || factor <= 0.0 || !next.is_finite() || next <= 0.0 {
            warn!("ignoring speed factor {factor}");
            return;
        }
        self.speed = next;
        info!("simulation speed x{:.3}", self.speed);
    }

    /// Integration steps executed per frame at the current speed, capped at
    /// [`MAX_STEPS_PER_FRAME`].
    pub fn steps_per_frame(&self) -> usize {
        let scaled = (self.config.base_steps_per_frame as f64 * self.speed).round();
        (scaled.min(MAX_STEPS_PER_FRAME as f64) as usize).max(1)
    }

    pub fn reset(&mut self, request: ResetRequest) {
        self.stop();

        let next = if request.is_empty() {
            random_start(&mut self.rng)
        } else {
            request.apply(&self.initial)
        };
        self.state = next;
        self.initial = next;
        info!(
            "simulation reset to theta=({:.3}, {:.3}) omega=({:.3}, {:.3})",
            next.theta1, next.theta2, next.omega1, next.omega2
        );

        for listener in self.reset_listeners.snapshot() {
            listener();
        }
        self.broadcast(&[next]);

        self.start();
    }

    /// Run one frame if the simulation is running. Returns the number of
    /// integration steps taken.
    pub fn tick(&mut self) -> usize {
        if !self.is_running() {
            return 0;
        }

        let steps = self.steps_per_frame();
        let mut history = Vec::with_capacity(steps + 1);
        history.push(self.state);

        let mut state = self.state;
        for _ in 0..steps {
            state = integrator::step(&state, &self.params, self.config.dt);
            history.push(state);
        }
        self.state = state;

        self.broadcast(&history);
        steps
    }

    pub fn subscribe(&self, listener: Arc<HistoryListener>) -> HistorySubscription {
        self.subscribers.register(listener)
    }

    pub fn add_reset_listener(&self, listener: Arc<ResetListener>) -> ResetSubscription {
        self.reset_listeners.register(listener)
    }

    fn broadcast(&self, history: &[PendulumState]) {
        for subscriber in self.subscribers.snapshot() {
            subscriber(history);
        }
    }
}

fn random_start(rng: &mut StdRng) -> PendulumState {
    PendulumState {
        theta1: FRAC_PI_2 + rng.gen_range(-RANDOM_JITTER..RANDOM_JITTER),
        theta2: FRAC_PI_2 + 1.0 + rng.gen_range(-RANDOM_JITTER..RANDOM_JITTER),
        omega1: 0.0,
        omega2: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn simulation() -> Simulation {
        Simulation::with_seed(PhysicsParams::normalized(), SimulationConfig::default(), 7)
    }

    fn recorder(sim: &Simulation) -> (Arc<Mutex<Vec<Vec<PendulumState>>>>, HistorySubscription) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let sub = sim.subscribe(Arc::new(move |history: &[PendulumState]| {
            sink.lock().unwrap().push(history.to_vec());
        }));
        (frames, sub)
    }

    fn assert_random_bounds(state: &PendulumState) {
        assert_eq!(state.omega1, 0.0);
        assert_eq!(state.omega2, 0.0);
        assert!((state.theta1 - FRAC_PI_2).abs() <= RANDOM_JITTER + 1e-12);
        assert!((state.theta2 - FRAC_PI_2 - 1.0).abs() <= RANDOM_JITTER + 1e-12);
    }

    #[test]
    fn starts_running_from_random_start() {
        let sim = simulation();
        assert!(sim.is_running());
        assert_random_bounds(&sim.state());
        assert_eq!(sim.state(), sim.initial_state());
    }

    #[test]
    fn empty_reset_randomizes_within_bounds() {
        let mut sim = simulation();
        for _ in 0..50 {
            sim.reset(ResetRequest::default().omega1(3.0));
            sim.reset(ResetRequest::default());
            assert_random_bounds(&sim.initial_state());
            assert_random_bounds(&sim.state());
        }
    }

    #[test]
    fn partial_resets_compose() {
        let mut sim = simulation();
        sim.reset(ResetRequest::from(PendulumState::new(0.1, 0.2, 0.3, 0.4)));

        sim.reset(ResetRequest::default().theta1(1.5));
        assert_eq!(sim.initial_state(), PendulumState::new(1.5, 0.2, 0.3, 0.4));

        sim.reset(ResetRequest::default().omega1(-2.0).omega2(2.0));
        assert_eq!(sim.initial_state(), PendulumState::new(1.5, 0.2, -2.0, 2.0));
        assert_eq!(sim.state(), sim.initial_state());
    }

    #[test]
    fn partial_reset_falls_back_to_initial_not_live_state() {
        let mut sim = simulation();
        sim.reset(ResetRequest::from(PendulumState::new(1.0, 2.0, 0.0, 0.0)));
        sim.tick();
        assert_ne!(sim.state(), sim.initial_state());

        sim.reset(ResetRequest::default().omega1(0.5));
        assert_eq!(sim.state(), PendulumState::new(1.0, 2.0, 0.5, 0.0));
    }

    #[test]
    fn reset_notifies_listeners_and_restarts() {
        let mut sim = simulation();
        sim.stop();

        let resets = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resets);
        let _reset_sub = sim.add_reset_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let (frames, _sub) = recorder(&sim);

        sim.reset(ResetRequest::default().theta1(0.25));

        assert!(sim.is_running());
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], vec![sim.state()]);
    }

    #[test]
    fn tick_broadcasts_chronological_history() {
        let mut sim = simulation();
        let (frames, _sub) = recorder(&sim);

        let start = sim.state();
        assert_eq!(sim.tick(), 40);
        sim.tick();

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 41);
        assert_eq!(frames[0][0], start);
        assert_eq!(frames[1][0], *frames[0].last().unwrap());
        assert_eq!(*frames[1].last().unwrap(), sim.state());

        let params = sim.params();
        let expected = integrator::step(&frames[0][0], &params, 0.01);
        assert_eq!(frames[0][1], expected);
    }

    #[test]
    fn stopped_simulation_does_not_advance() {
        let mut sim = simulation();
        let (frames, _sub) = recorder(&sim);
        sim.stop();
        sim.stop();
        let before = sim.state();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.state(), before);
        assert!(frames.lock().unwrap().is_empty());

        sim.start();
        sim.start();
        assert_eq!(sim.tick(), 40);
    }

    #[test]
    fn speed_multiplier_compounds() {
        let mut sim = simulation();
        sim.multiply_speed(2.0);
        sim.multiply_speed(1.5);
        assert_eq!(sim.speed(), 3.0);
        assert_eq!(sim.steps_per_frame(), 120);

        sim.multiply_speed(0.001);
        assert_eq!(sim.steps_per_frame(), 1);

        sim.multiply_speed(0.0);
        sim.multiply_speed(f64::NAN);
        assert_relative_eq!(sim.speed(), 0.003);
    }

    #[test]
    fn runaway_speed_is_capped() {
        let mut sim = simulation();
        sim.multiply_speed(1e200);
        sim.multiply_speed(1e200);
        assert_relative_eq!(sim.speed(), 1e200);
        assert_eq!(sim.steps_per_frame(), MAX_STEPS_PER_FRAME);

        sim.multiply_speed(1e-300);
        sim.multiply_speed(1e-300);
        assert_relative_eq!(sim.speed(), 1e-100);
        assert_eq!(sim.steps_per_frame(), 1);

        let mut sim = simulation();
        for _ in 0..2000 {
            sim.multiply_speed(2.0);
        }
        assert!(sim.speed().is_finite());
        assert_eq!(sim.steps_per_frame(), MAX_STEPS_PER_FRAME);
        assert_eq!(sim.tick(), MAX_STEPS_PER_FRAME);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let mut sim = simulation();
        let (frames, sub) = recorder(&sim);
        sim.tick();
        assert!(sub.unsubscribe());
        sim.tick();
        assert_eq!(frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn state_accessors_return_copies() {
        let mut sim = simulation();
        let mut copy = sim.state();
        copy.theta1 = 100.0;
        assert_ne!(sim.state().theta1, 100.0);
        sim.tick();
        assert_ne!(sim.state(), sim.initial_state());
    }
}
