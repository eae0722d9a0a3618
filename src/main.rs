//! Tomato Counter — 番茄刻度倒计时（Rust + egui）

mod app;
mod config;
mod counter;
mod error;
mod scheduler;
mod signal;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::CounterConfig::load();
    log::info!(
        "Starting Tomato Counter (tick {} ms, {} px/min)",
        config.tick_millis,
        config.pixels_per_minute
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([360.0, 420.0])
            .with_resizable(false)
            .with_title("番茄计时"),
        ..Default::default()
    };
    eframe::run_native(
        "tomato-counter",
        options,
        Box::new(move |cc| Ok(Box::new(app::TomatoApp::new(cc, &config)))),
    )
}
