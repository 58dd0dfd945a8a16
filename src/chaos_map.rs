//! Progressive chaos map: for every cell of a grid over two state
//! dimensions, the mean clamped distance between a trajectory and an
//! epsilon-perturbed twin, mapped to a color.
//!
//! Cells are filled in raster order. The host calls
//! [`ChaosMapGenerator::tick`] once per redraw; each call fills whole rows
//! until the batch budget is spent, publishes the partial buffer and returns.
//! Cells within a row are computed in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::ConfigError;
use crate::integrator;
use crate::types::{ChaosMapConfig, PendulumState, Rgb};

const BACKGROUND: Rgb = [0, 0, 0];

/// Gradient anchors: dark blue, violet, purple, magenta-red, orange,
/// yellow-white.
const GRADIENT: [(f64, [f64; 3]); 6] = [
    (0.0, [8.0, 10.0, 40.0]),
    (0.2, [60.0, 20.0, 120.0]),
    (0.4, [130.0, 30.0, 160.0]),
    (0.6, [215.0, 40.0, 95.0]),
    (0.8, [250.0, 140.0, 40.0]),
    (1.0, [255.0, 245.0, 210.0]),
];

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ChaosFrame<'a> {
    pub pixels: &'a [Rgb],
    pub resolution: usize,
    /// Percentage of cells finished, `0.0..=100.0`.
    pub progress: f64,
    pub done: bool,
}

pub type ChaosListener = dyn FnMut(&ChaosFrame<'_>) + Send;

impl ChaosMapConfig {
    /// Seed state for fractional grid coordinates; `(0, 0)` is the minimum
    /// corner of both ranges.
    pub fn seed_at(&self, fx: f64, fy: f64) -> PendulumState {
        let mut state = self.base;
        state.set(self.x_axis, self.x_range.at(fx));
        state.set(self.y_axis, self.y_range.at(fy));
        state
    }

    pub fn cell_seed(&self, x: usize, y: usize) -> PendulumState {
        let r = self.resolution as f64;
        self.seed_at(x as f64 / r, y as f64 / r)
    }
}

fn clamped_distance(distance: f64, clamp: f64) -> f64 {
    if distance.is_nan() {
        clamp
    } else {
        distance.min(clamp)
    }
}

/// Mean clamped separation between `seed` and its perturbed twin over
/// `config.steps` integration steps.
pub fn divergence_score(config: &ChaosMapConfig, seed: PendulumState) -> f64 {
    let mut a = seed;
    let mut b = seed;
    b.set(config.x_axis, b.get(config.x_axis) + config.epsilon);
    b.set(config.y_axis, b.get(config.y_axis) + config.epsilon);

    let mut total = 0.0;
    for _ in 0..config.steps {
        a = integrator::step(&a, &config.params, config.dt);
        b = integrator::step(&b, &config.params, config.dt);
        total += clamped_distance(a.distance(&b), config.distance_clamp);
    }
    total / config.steps as f64
}

pub fn intensity(config: &ChaosMapConfig, score: f64) -> f64 {
    (score / config.score_scale)
        .powf(config.intensity_exponent)
        .clamp(0.0, 1.0)
}

pub fn gradient_color(t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let to_rgb = |c: [f64; 3]| c.map(|v| v.round() as u8);

    for pair in GRADIENT.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t >= t0 && t <= t1 {
            let alpha = (t - t0) / (t1 - t0);
            return to_rgb([
                c0[0] + (c1[0] - c0[0]) * alpha,
                c0[1] + (c1[1] - c0[1]) * alpha,
                c0[2] + (c1[2] - c0[2]) * alpha,
            ]);
        }
    }

    to_rgb(GRADIENT[GRADIENT.len() - 1].1)
}

pub fn cell_color(config: &ChaosMapConfig, x: usize, y: usize) -> Rgb {
    let score = divergence_score(config, config.cell_seed(x, y));
    gradient_color(intensity(config, score))
}

struct ActiveRun {
    token: CancelToken,
    listener: Box<ChaosListener>,
    started: Instant,
}

/// Owns the color buffer and at most one in-flight run.
#[derive(Default)]
pub struct ChaosMapGenerator {
    config: Option<ChaosMapConfig>,
    pixels: Vec<Rgb>,
    cells_done: usize,
    active: Option<ActiveRun>,
}

impl ChaosMapGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh run, superseding any in-flight one. The configuration is
    /// validated before anything changes.
    pub fn run(
        &mut self,
        config: ChaosMapConfig,
        listener: Box<ChaosListener>,
    ) -> Result<CancelToken, ConfigError> {
        config.validate()?;
        self.cancel();

        info!(
            "chaos map started: {}x{} over {} x {}, {} steps",
            config.resolution,
            config.resolution,
            config.x_axis.label(),
            config.y_axis.label(),
            config.steps
        );

        let token = CancelToken::default();
        self.pixels = vec![BACKGROUND; config.total_cells()];
        self.cells_done = 0;
        self.config = Some(config);
        self.active = Some(ActiveRun {
            token: token.clone(),
            listener,
            started: Instant::now(),
        });
        Ok(token)
    }

    /// Stop the in-flight run, if any. The buffer keeps whatever rows were
    /// already finished.
    pub fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            run.token.cancel();
            info!("chaos map cancelled at {:.1}%", self.progress());
        }
    }

    /// Process one batch of the active run. Returns the published progress,
    /// or `None` when there was nothing to do or the run had been cancelled.
    pub fn tick(&mut self) -> Option<f64> {
        let config = self.config?;
        let token = self.active.as_ref()?.token.clone();
        if token.is_cancelled() {
            self.cancel();
            return None;
        }

        let resolution = config.resolution;
        let total = config.total_cells();
        let batch_start = Instant::now();

        while self.cells_done < total {
            let y = self.cells_done / resolution;
            let row: Vec<Rgb> = (0..resolution)
                .into_par_iter()
                .map(|x| cell_color(&config, x, y))
                .collect();

            if token.is_cancelled() {
                self.cancel();
                return None;
            }
            self.pixels[self.cells_done..self.cells_done + resolution].copy_from_slice(&row);
            self.cells_done += resolution;

            if batch_start.elapsed() >= config.batch_budget {
                break;
            }
        }

        let done = self.cells_done == total;
        let progress = self.progress();
        debug!("chaos map batch finished at {progress:.1}%");

        let mut run = self.active.take()?;
        (run.listener)(&ChaosFrame {
            pixels: &self.pixels,
            resolution,
            progress,
            done,
        });

        if done {
            info!(
                "chaos map finished in {:.2}s",
                run.started.elapsed().as_secs_f64()
            );
        } else {
            self.active = Some(run);
        }
        Some(progress)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> Option<&ChaosMapConfig> {
        self.config.as_ref()
    }

    pub fn progress(&self) -> f64 {
        match self.config {
            Some(config) => self.cells_done as f64 * 100.0 / config.total_cells() as f64,
            None => 0.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.config
            .is_some_and(|config| self.cells_done == config.total_cells())
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for [r, g, b] in &self.pixels {
            rgba.extend_from_slice(&[*r, *g, *b, 255]);
        }
        rgba
    }
}
