//! End-to-end flows through the public engine API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use double_pendulum_chaos::{
    ChaosFrame, ChaosMapConfig, ChaosMapGenerator, PendulumState, PhysicsParams, ResetRequest,
    Simulation, SimulationConfig,
};

#[test]
fn map_click_resets_live_simulation() {
    let config = ChaosMapConfig {
        resolution: 4,
        steps: 10,
        batch_budget: Duration::ZERO,
        ..ChaosMapConfig::default()
    };
    let mut generator = ChaosMapGenerator::new();
    generator
        .run(config, Box::new(|_frame: &ChaosFrame<'_>| {}))
        .expect("valid config");
    while generator.tick().is_some() {}

    let mut sim = Simulation::with_seed(
        PhysicsParams::interactive(),
        SimulationConfig::default(),
        42,
    );
    let frames: Arc<Mutex<Vec<Vec<PendulumState>>>> = Arc::default();
    let sink = Arc::clone(&frames);
    let _sub = sim.subscribe(Arc::new(move |history: &[PendulumState]| {
        sink.lock().unwrap().push(history.to_vec());
    }));

    let seed = generator.config().expect("run started").seed_at(0.75, 0.25);
    sim.reset(ResetRequest::from(seed));

    assert_eq!(sim.initial_state(), PendulumState::new(0.0, 0.0, 5.0, -5.0));
    sim.tick();

    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], vec![seed]);
    assert_eq!(frames[1][0], seed);
    assert_eq!(frames[1].len(), 41);
}

#[test]
fn cancel_token_is_usable_from_another_thread() {
    let config = ChaosMapConfig {
        resolution: 16,
        steps: 20,
        batch_budget: Duration::ZERO,
        ..ChaosMapConfig::default()
    };
    let mut generator = ChaosMapGenerator::new();
    let token = generator
        .run(config, Box::new(|_frame: &ChaosFrame<'_>| {}))
        .expect("valid config");
    generator.tick();

    let remote = token.clone();
    std::thread::spawn(move || remote.cancel())
        .join()
        .expect("cancel thread");

    assert!(token.is_cancelled());
    assert!(generator.tick().is_none());
    assert!(!generator.is_active());
    assert!(generator.progress() < 100.0);
}
