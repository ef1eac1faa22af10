//! Desktop weather dashboard: current conditions, 5-day forecast and charts
//! for one city, refreshed on a user-adjustable timer.

mod app;
mod config;
mod forecast;
mod scheduler;
mod weather;
mod weather_type;

use anyhow::Result;

use app::WeatherDashboard;
use config::Config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    config::load_env_file();
    let config = Config::from_env()?;
    log::info!("starting dashboard for {}", config.default_city);

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(900.0, 700.0)),
        ..Default::default()
    };

    let app = WeatherDashboard::new(config);
    if let Err(e) = eframe::run_native(
        "Weather Dashboard",
        native_options,
        Box::new(|_cc| Box::new(app)),
    ) {
        log::error!("failed to run the ui: {e}");
    }

    Ok(())
}
