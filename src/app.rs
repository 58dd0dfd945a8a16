use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eframe::egui::{self, Color32, ColorImage, Pos2, Stroke, TextureHandle, TextureOptions};
use log::warn;

use double_pendulum_chaos::integrator;
use double_pendulum_chaos::simulation::{HistorySubscription, ResetSubscription};
use double_pendulum_chaos::{
    ChaosFrame, ChaosMapConfig, ChaosMapGenerator, PendulumState, PhysicsParams, ResetRequest,
    Simulation, SimulationConfig,
};

const TRAIL_LEN: usize = 600;
const MAP_DISPLAY_SIZE: f32 = 420.0;

type Trail = Arc<Mutex<VecDeque<PendulumState>>>;

pub struct PendulumApp {
    simulation: Simulation,
    chaos: ChaosMapGenerator,
    chaos_config: ChaosMapConfig,
    trail: Trail,
    map_dirty: Arc<AtomicBool>,
    texture: Option<TextureHandle>,
    config_error: Option<String>,
    _history_sub: HistorySubscription,
    _reset_sub: ResetSubscription,
}

impl PendulumApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let simulation = Simulation::new(PhysicsParams::interactive(), SimulationConfig::default());
        let trail: Trail = Arc::new(Mutex::new(VecDeque::with_capacity(TRAIL_LEN)));

        let sink = Arc::clone(&trail);
        let history_sub = simulation.subscribe(Arc::new(move |history: &[PendulumState]| {
            if let Ok(mut trail) = sink.lock() {
                trail.extend(history.iter().copied());
                while trail.len() > TRAIL_LEN {
                    trail.pop_front();
                }
            }
        }));

        let sink = Arc::clone(&trail);
        let reset_sub = simulation.add_reset_listener(Arc::new(move || {
            if let Ok(mut trail) = sink.lock() {
                trail.clear();
            }
        }));

        let mut app = Self {
            simulation,
            chaos: ChaosMapGenerator::new(),
            chaos_config: ChaosMapConfig::default(),
            trail,
            map_dirty: Arc::new(AtomicBool::new(false)),
            texture: None,
            config_error: None,
            _history_sub: history_sub,
            _reset_sub: reset_sub,
        };
        app.regenerate_map();
        app
    }

    fn regenerate_map(&mut self) {
        let dirty = Arc::clone(&self.map_dirty);
        let listener = Box::new(move |_frame: &ChaosFrame<'_>| {
            dirty.store(true, Ordering::Release);
        });

        match self.chaos.run(self.chaos_config, listener) {
            Ok(_) => self.config_error = None,
            Err(err) => {
                warn!("chaos map not started: {err}");
                self.config_error = Some(err.to_string());
            }
        }
    }

    fn update_texture(&mut self, ctx: &egui::Context) {
        if !self.map_dirty.swap(false, Ordering::Acquire) {
            return;
        }
        let Some(config) = self.chaos.config() else {
            return;
        };
        let size = [config.resolution, config.resolution];
        let image = ColorImage::from_rgba_unmultiplied(size, &self.chaos.to_rgba8());

        if let Some(texture) = &mut self.texture {
            texture.set(image, TextureOptions::NEAREST);
        } else {
            self.texture = Some(ctx.load_texture("chaos-map", image, TextureOptions::NEAREST));
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Pendulum");
        ui.horizontal(|ui| {
            let label = if self.simulation.is_running() {
                "Pause"
            } else {
                "Resume"
            };
            if ui.button(label).clicked() {
                if self.simulation.is_running() {
                    self.simulation.stop();
                } else {
                    self.simulation.start();
                }
            }
            if ui.button("Random start").clicked() {
                self.simulation.reset(ResetRequest::default());
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Slower").clicked() {
                self.simulation.multiply_speed(0.5);
            }
            if ui.button("Faster").clicked() {
                self.simulation.multiply_speed(2.0);
            }
            ui.label(format!("x{:.2}", self.simulation.speed()));
        });

        let state = self.simulation.state();
        let energy = integrator::total_energy(&state, &self.simulation.params());
        ui.label(format!("theta: ({:.3}, {:.3})", state.theta1, state.theta2));
        ui.label(format!("omega: ({:.3}, {:.3})", state.omega1, state.omega2));
        ui.label(format!("energy: {energy:.3}"));

        ui.separator();
        ui.heading("Chaos map");
        ui.add(egui::Slider::new(&mut self.chaos_config.resolution, 16..=400).text("resolution"));
        ui.add(egui::Slider::new(&mut self.chaos_config.steps, 10..=2000).text("steps"));
        ui.add(
            egui::Slider::new(&mut self.chaos_config.epsilon, 1.0e-6..=1.0e-1)
                .logarithmic(true)
                .text("epsilon"),
        );
        if ui.button("Regenerate").clicked() {
            self.regenerate_map();
        }
        ui.add(egui::ProgressBar::new((self.chaos.progress() / 100.0) as f32).show_percentage());
        ui.label("Click the map to start the pendulum there.");

        if let Some(err) = &self.config_error {
            ui.colored_label(Color32::from_rgb(230, 100, 100), err);
        }
    }

    fn draw_pendulum(&self, ui: &mut egui::Ui) {
        let params = self.simulation.params();
        let reach = (params.l1 + params.l2) as f32;
        let side = 2.0 * reach + 40.0;
        let (response, painter) =
            ui.allocate_painter(egui::vec2(side, side), egui::Sense::hover());
        let pivot = response.rect.center();

        let bob = |state: &PendulumState| -> (Pos2, Pos2) {
            let x1 = params.l1 * state.theta1.sin();
            let y1 = params.l1 * state.theta1.cos();
            let x2 = x1 + params.l2 * state.theta2.sin();
            let y2 = y1 + params.l2 * state.theta2.cos();
            (
                pivot + egui::vec2(x1 as f32, y1 as f32),
                pivot + egui::vec2(x2 as f32, y2 as f32),
            )
        };

        if let Ok(trail) = self.trail.lock() {
            let points: Vec<Pos2> = trail.iter().map(|s| bob(s).1).collect();
            painter.add(egui::Shape::line(
                points,
                Stroke::new(1.0, Color32::from_rgb(200, 90, 160)),
            ));
        }

        let (_, start) = bob(&self.simulation.initial_state());
        painter.circle_stroke(start, 5.0, Stroke::new(1.0, Color32::GRAY));

        let (p1, p2) = bob(&self.simulation.state());
        let rod = Stroke::new(2.0, Color32::from_gray(220));
        painter.line_segment([pivot, p1], rod);
        painter.line_segment([p1, p2], rod);
        painter.circle_filled(p1, 7.0, Color32::from_rgb(250, 140, 40));
        painter.circle_filled(p2, 7.0, Color32::from_rgb(255, 245, 210));
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            return;
        };
        let response = ui.add(
            egui::Image::new((texture.id(), egui::vec2(MAP_DISPLAY_SIZE, MAP_DISPLAY_SIZE)))
                .sense(egui::Sense::click()),
        );

        if response.clicked() {
            let pointer = response.interact_pointer_pos();
            if let (Some(pos), Some(config)) = (pointer, self.chaos.config()) {
                let fx = ((pos.x - response.rect.left()) / response.rect.width()) as f64;
                let fy = ((pos.y - response.rect.top()) / response.rect.height()) as f64;
                let seed = config.seed_at(fx.clamp(0.0, 1.0), fy.clamp(0.0, 1.0));
                self.simulation.reset(ResetRequest::from(seed));
            }
        }
    }
}

impl eframe::App for PendulumApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.simulation.tick();
        self.chaos.tick();
        self.update_texture(ctx);

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.draw_controls(ui);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal_top(|ui| {
                self.draw_pendulum(ui);
                self.draw_map(ui);
            });
        });

        ctx.request_repaint();
    }
}
