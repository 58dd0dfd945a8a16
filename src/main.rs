mod app;

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("starting double pendulum viewer");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 760.0])
            .with_min_inner_size([900.0, 620.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Double Pendulum Chaos",
        options,
        Box::new(|cc| Ok(Box::new(app::PendulumApp::new(cc)))),
    )
}
