use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Local;
use eframe::{App, Frame};
use egui::plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};
use egui::{Color32, RichText, TextureHandle};

use crate::config::Config;
use crate::forecast::{bucket_by_day, reshape, ForecastSlot};
use crate::scheduler::{RefreshInterval, RefreshScheduler};
use crate::weather::{
    capitalize_first_letter, degrees_to_cardinal, CurrentConditions, FetchError, WeatherClient,
};
use crate::weather_type::determine_weather_type;

/// Everything one refresh brings back. Applied as a unit: both snapshots and
/// the icon set are swapped wholesale, so a render pass never observes a
/// half-updated mix.
pub struct FetchBundle {
    pub current: CurrentConditions,
    pub slots: Vec<ForecastSlot>,
    pub icons: HashMap<String, Vec<u8>>,
}

pub type FetchOutcome = Result<FetchBundle, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Forecast,
    Charts,
}

pub struct WeatherDashboard {
    config: Config,
    city_input: String,
    active_city: String,
    current: Option<CurrentConditions>,
    slots: Option<Vec<ForecastSlot>>,
    status: String,
    tab: Tab,
    scheduler: RefreshScheduler,
    show_empty_city_alert: bool,
    fetch_in_progress: Arc<Mutex<bool>>,
    fetch_result: Arc<Mutex<Option<FetchOutcome>>>,
    icon_textures: HashMap<String, TextureHandle>,
}

impl WeatherDashboard {
    pub fn new(config: Config) -> Self {
        let city = config.default_city.clone();
        Self {
            config,
            city_input: city.clone(),
            active_city: city,
            current: None,
            slots: None,
            status: "Ready".to_string(),
            tab: Tab::Forecast,
            scheduler: RefreshScheduler::new(RefreshInterval::default()),
            show_empty_city_alert: false,
            fetch_in_progress: Arc::new(Mutex::new(false)),
            fetch_result: Arc::new(Mutex::new(None)),
            icon_textures: HashMap::new(),
        }
    }

    fn refresh_in_flight(&self) -> bool {
        self.fetch_in_progress.lock().map(|g| *g).unwrap_or(false)
    }

    /// Kicks off a refresh for the active city on a worker thread, unless
    /// one is already running. Ticks and searches never stack fetches.
    fn request_refresh(&mut self) {
        let city = self.active_city.trim().to_string();
        if city.is_empty() {
            return;
        }

        {
            let Ok(mut in_progress) = self.fetch_in_progress.lock() else {
                return;
            };
            if *in_progress {
                return;
            }
            *in_progress = true;
        }

        self.status = format!("Refreshing data for {city}...");

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("could not start fetch runtime: {e}");
                self.status = format!("Refresh failed: {e}");
                if let Ok(mut in_progress) = self.fetch_in_progress.lock() {
                    *in_progress = false;
                }
                return;
            }
        };

        let api_key = self.config.api_key.clone();
        let result_slot = Arc::clone(&self.fetch_result);
        let in_progress = Arc::clone(&self.fetch_in_progress);

        std::thread::spawn(move || {
            let outcome = runtime.block_on(fetch_city(&api_key, &city));
            if let Ok(mut slot) = result_slot.lock() {
                *slot = Some(outcome);
            }
            if let Ok(mut flag) = in_progress.lock() {
                *flag = false;
            }
        });
    }

    /// Applies a finished refresh. On success both snapshots are replaced
    /// and the new icon bytes are handed back for texture upload; on failure
    /// the previous snapshots stay on screen and only the status changes.
    fn apply_outcome(&mut self, outcome: FetchOutcome) -> HashMap<String, Vec<u8>> {
        match outcome {
            Ok(bundle) => {
                self.current = Some(bundle.current);
                self.slots = Some(bundle.slots);
                self.status = format!("Data updated at {}", Local::now().format("%H:%M:%S"));
                bundle.icons
            }
            Err(e) => {
                log::warn!("refresh failed: {e}");
                self.status = format!("Refresh failed: {e}");
                HashMap::new()
            }
        }
    }

    fn upload_icon_textures(&mut self, ctx: &egui::Context, icons: HashMap<String, Vec<u8>>) {
        self.icon_textures.clear();
        for (key, bytes) in icons {
            match decode_icon(&bytes) {
                Ok(img) => {
                    let texture = ctx.load_texture(key.clone(), img, Default::default());
                    self.icon_textures.insert(key, texture);
                }
                Err(e) => log::debug!("could not decode icon {key}: {e}"),
            }
        }
    }

    fn search(&mut self) {
        let city = self.city_input.trim();
        if city.is_empty() {
            self.show_empty_city_alert = true;
            return;
        }
        self.active_city = city.to_string();
        // An explicit search refreshes immediately and leaves the armed
        // deadline alone.
        self.request_refresh();
    }

    fn search_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.city_input)
                    .desired_width(220.0)
                    .hint_text("City"),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Search").clicked() || submitted {
                self.search();
            }

            ui.add_space(20.0);
            ui.label("Refresh:");
            let mut selected_label = self.scheduler.interval().label();
            egui::ComboBox::from_id_source("refresh_interval")
                .selected_text(selected_label)
                .width(70.0)
                .show_ui(ui, |ui| {
                    for option in RefreshInterval::ALL {
                        ui.selectable_value(&mut selected_label, option.label(), option.label());
                    }
                });
            let interval = RefreshInterval::from_label(selected_label);
            if interval != self.scheduler.interval() {
                self.scheduler.set_interval(interval, Instant::now());
            }
        });
    }

    fn current_conditions_card(&self, ui: &mut egui::Ui) {
        let Some(current) = &self.current else {
            ui.group(|ui| {
                ui.vertical_centered(|ui| {
                    if self.refresh_in_flight() {
                        ui.spinner();
                        ui.label("Fetching weather data...");
                    } else {
                        ui.label("No data yet.");
                    }
                });
            });
            return;
        };

        let accent = determine_weather_type(&current.condition).accent_color();

        ui.group(|ui| {
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new(format!(
                        "Current weather in {}, {}",
                        current.city, current.country
                    ))
                    .size(18.0)
                    .strong()
                    .color(accent),
                );
                ui.label(
                    RichText::new(format!(
                        "Observed at {}",
                        current.observed_at.format("%H:%M")
                    ))
                    .size(11.0)
                    .weak(),
                );
            });
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    if let Some(texture) = self.icon_textures.get(&icon_key(&current.icon, true)) {
                        ui.image(texture, egui::vec2(100.0, 100.0));
                    } else {
                        let _ = ui.allocate_space(egui::vec2(100.0, 100.0));
                    }
                    ui.label(RichText::new(format!("{:.1}°C", current.temperature)).size(28.0));
                });
                ui.add_space(20.0);

                let mut rows: Vec<(&str, String)> = vec![
                    ("Condition", capitalize_first_letter(&current.condition)),
                    ("Feels like", format!("{:.1}°C", current.feels_like)),
                    (
                        "Min/Max",
                        format!("{:.1}°C / {:.1}°C", current.temp_min, current.temp_max),
                    ),
                    ("Humidity", format!("{}%", current.humidity)),
                    ("Pressure", format!("{} hPa", current.pressure)),
                    (
                        "Wind",
                        format!(
                            "{:.1} m/s {}",
                            current.wind_speed,
                            degrees_to_cardinal(current.wind_deg)
                        ),
                    ),
                    ("Visibility", format!("{:.1} km", current.visibility_km)),
                ];
                if let Some(rain) = current.rain_1h {
                    rows.push(("Rain (1h)", format!("{rain} mm")));
                }
                if let Some(snow) = current.snow_1h {
                    rows.push(("Snow (1h)", format!("{snow} mm")));
                }

                egui::Grid::new("current_details")
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for (label, value) in rows {
                            ui.label(RichText::new(format!("{label}:")).strong());
                            ui.label(value);
                            ui.end_row();
                        }
                    });
            });
        });
    }

    fn forecast_tab(&self, ui: &mut egui::Ui) {
        let Some(slots) = &self.slots else {
            ui.label("No forecast loaded yet.");
            return;
        };

        egui::ScrollArea::vertical()
            .id_source("forecast_days")
            .show(ui, |ui| {
                for bucket in bucket_by_day(slots) {
                    ui.group(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.label(
                                RichText::new(bucket.date.format("%A %d %B").to_string())
                                    .strong()
                                    .size(14.0),
                            );
                        });

                        egui::ScrollArea::horizontal()
                            .id_source(bucket.date)
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    for slot in &bucket.slots {
                                        self.forecast_cell(ui, slot);
                                    }
                                });
                            });

                        ui.separator();
                        ui.vertical_centered(|ui| {
                            ui.label(
                                RichText::new(format!(
                                    "Summary: {} - Min {:.1}°C / Max {:.1}°C",
                                    capitalize_first_letter(&bucket.dominant_condition),
                                    bucket.min_temp,
                                    bucket.max_temp
                                ))
                                .italics(),
                            );
                        });
                    });
                    ui.add_space(6.0);
                }
            });
    }

    fn forecast_cell(&self, ui: &mut egui::Ui, slot: &ForecastSlot) {
        ui.vertical(|ui| {
            ui.set_width(90.0);
            ui.label(slot.time.format("%H:%M").to_string());
            if let Some(texture) = self.icon_textures.get(&icon_key(&slot.icon, false)) {
                ui.image(texture, egui::vec2(50.0, 50.0));
            } else {
                let _ = ui.allocate_space(egui::vec2(50.0, 50.0));
            }
            ui.label(format!("{:.1}°C", slot.temperature));
            ui.add(egui::Label::new(RichText::new(&slot.condition).size(10.0)).wrap(true));
        })
        .response
        .on_hover_text(format!(
            "Feels like {:.1}°C\nHumidity {}%\nPressure {} hPa\nWind {:.1} m/s {}",
            slot.feels_like,
            slot.humidity,
            slot.pressure,
            slot.wind_speed,
            degrees_to_cardinal(slot.wind_deg)
        ));
    }

    fn charts_tab(&self, ui: &mut egui::Ui) {
        let Some(slots) = &self.slots else {
            ui.label("No forecast loaded yet.");
            return;
        };
        if slots.is_empty() {
            ui.label("No forecast loaded yet.");
            return;
        }

        let temperature: Vec<[f64; 2]> = slots.iter().map(|s| [slot_ts(s), s.temperature]).collect();
        let feels_like: Vec<[f64; 2]> = slots.iter().map(|s| [slot_ts(s), s.feels_like]).collect();
        let humidity: Vec<[f64; 2]> = slots
            .iter()
            .map(|s| [slot_ts(s), f64::from(s.humidity)])
            .collect();
        let wind: Vec<[f64; 2]> = slots.iter().map(|s| [slot_ts(s), s.wind_speed]).collect();

        // Rain and snow bars share the x slots; snow stacks on top of rain.
        let bar_width = 3.0 * 3600.0 * 0.8;
        let rain_bars: Vec<Bar> = slots
            .iter()
            .map(|s| Bar::new(slot_ts(s), s.rain).width(bar_width))
            .collect();
        let snow_bars: Vec<Bar> = slots
            .iter()
            .map(|s| Bar::new(slot_ts(s), s.snow).width(bar_width))
            .collect();

        let plot_height = 220.0;

        egui::ScrollArea::vertical()
            .id_source("charts")
            .show(ui, |ui| {
                ui.columns(2, |columns| {
                    columns[0].label(RichText::new("Temperature").strong());
                    Plot::new("temperature_plot")
                        .height(plot_height)
                        .legend(Legend::default())
                        .x_axis_formatter(|x, _range| format_axis_time(x))
                        .show(&mut columns[0], |plot_ui| {
                            plot_ui.line(
                                Line::new(PlotPoints::from(temperature))
                                    .name("Temperature (°C)")
                                    .color(Color32::from_rgb(214, 39, 40)),
                            );
                            plot_ui.line(
                                Line::new(PlotPoints::from(feels_like))
                                    .name("Feels like (°C)")
                                    .color(Color32::from_rgb(255, 127, 14)),
                            );
                        });

                    columns[1].label(RichText::new("Humidity").strong());
                    Plot::new("humidity_plot")
                        .height(plot_height)
                        .legend(Legend::default())
                        .x_axis_formatter(|x, _range| format_axis_time(x))
                        .show(&mut columns[1], |plot_ui| {
                            plot_ui.line(
                                Line::new(PlotPoints::from(humidity))
                                    .name("Humidity (%)")
                                    .color(Color32::from_rgb(31, 119, 180)),
                            );
                        });
                });

                ui.add_space(8.0);

                ui.columns(2, |columns| {
                    columns[0].label(RichText::new("Wind").strong());
                    Plot::new("wind_plot")
                        .height(plot_height)
                        .legend(Legend::default())
                        .x_axis_formatter(|x, _range| format_axis_time(x))
                        .show(&mut columns[0], |plot_ui| {
                            plot_ui.line(
                                Line::new(PlotPoints::from(wind))
                                    .name("Wind speed (m/s)")
                                    .color(Color32::from_rgb(44, 160, 44)),
                            );
                        });

                    columns[1].label(RichText::new("Precipitation").strong());
                    let rain_chart = BarChart::new(rain_bars)
                        .name("Rain (mm)")
                        .color(Color32::from_rgb(23, 190, 207));
                    let snow_chart = BarChart::new(snow_bars)
                        .name("Snow (mm)")
                        .color(Color32::GRAY)
                        .stack_on(&[&rain_chart]);
                    Plot::new("precipitation_plot")
                        .height(plot_height)
                        .legend(Legend::default())
                        .x_axis_formatter(|x, _range| format_axis_time(x))
                        .show(&mut columns[1], |plot_ui| {
                            plot_ui.bar_chart(rain_chart);
                            plot_ui.bar_chart(snow_chart);
                        });
                });
            });
    }

    fn empty_city_alert(&mut self, ctx: &egui::Context) {
        if !self.show_empty_city_alert {
            return;
        }
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Please enter a city name.");
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        self.show_empty_city_alert = false;
                    }
                });
            });
    }
}

impl App for WeatherDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Drain the worker's result before anything renders, so this frame
        // already sees the new snapshots.
        let outcome = self
            .fetch_result
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(outcome) = outcome {
            let icons = self.apply_outcome(outcome);
            if !icons.is_empty() {
                self.upload_icon_textures(ctx, icons);
            }
        }

        let now = Instant::now();
        if !self.scheduler.is_armed() {
            // First frame: load the initial data and start the cycle.
            self.request_refresh();
            self.scheduler.arm(now);
        } else if self.scheduler.is_due(now) {
            self.request_refresh();
            self.scheduler.arm(now);
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.search_row(ui);
            ui.add_space(8.0);
            self.current_conditions_card(ui);
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Forecast, "5-day forecast");
                ui.selectable_value(&mut self.tab, Tab::Charts, "Charts");
            });
            ui.separator();

            match self.tab {
                Tab::Forecast => self.forecast_tab(ui),
                Tab::Charts => self.charts_tab(ui),
            }
        });

        self.empty_city_alert(ctx);

        // Wake up for the deadline even when no input arrives; poll faster
        // while a fetch is running so its result lands promptly.
        let wakeup = if self.refresh_in_flight() {
            Duration::from_millis(100)
        } else {
            self.scheduler
                .time_to_next(now)
                .unwrap_or(Duration::from_secs(1))
        };
        ctx.request_repaint_after(wakeup);
    }
}

/// Runs both endpoint calls for one city, then downloads the icons the
/// responses reference. Icon failures are logged and skipped; the affected
/// cell renders blank.
async fn fetch_city(api_key: &str, city: &str) -> FetchOutcome {
    let client = WeatherClient::new(api_key.to_string());

    let current = client.fetch_current(city).await?;
    let forecast = client.fetch_forecast(city).await?;

    let current = CurrentConditions::from_response(&current);
    let slots = reshape(&forecast);

    let mut icons = HashMap::new();
    if !current.icon.is_empty() {
        match client.fetch_icon(&current.icon, true).await {
            Ok(bytes) => {
                icons.insert(icon_key(&current.icon, true), bytes);
            }
            Err(e) => log::debug!("icon {} unavailable: {e}", current.icon),
        }
    }
    for icon in slots.iter().map(|s| s.icon.as_str()) {
        if icon.is_empty() || icons.contains_key(&icon_key(icon, false)) {
            continue;
        }
        match client.fetch_icon(icon, false).await {
            Ok(bytes) => {
                icons.insert(icon_key(icon, false), bytes);
            }
            Err(e) => log::debug!("icon {icon} unavailable: {e}"),
        }
    }

    Ok(FetchBundle {
        current,
        slots,
        icons,
    })
}

fn icon_key(icon: &str, scaled: bool) -> String {
    if scaled {
        format!("{icon}@2x")
    } else {
        icon.to_string()
    }
}

fn slot_ts(slot: &ForecastSlot) -> f64 {
    slot.time.timestamp() as f64
}

fn format_axis_time(x: f64) -> String {
    match chrono::DateTime::from_timestamp(x as i64, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%d/%m %Hh").to_string(),
        None => String::new(),
    }
}

fn decode_icon(bytes: &[u8]) -> Result<egui::ColorImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn dashboard() -> WeatherDashboard {
        WeatherDashboard::new(Config {
            api_key: "key".to_string(),
            default_city: "Paris".to_string(),
        })
    }

    fn sample_current(city: &str) -> CurrentConditions {
        CurrentConditions {
            city: city.to_string(),
            country: "FR".to_string(),
            observed_at: Local::now(),
            temperature: 18.4,
            feels_like: 17.9,
            temp_min: 15.2,
            temp_max: 21.0,
            humidity: 62,
            pressure: 1014,
            wind_speed: 4.1,
            wind_deg: 220.0,
            visibility_km: 8.5,
            condition: "pluie modérée".to_string(),
            icon: "10d".to_string(),
            rain_1h: Some(0.8),
            snow_1h: None,
        }
    }

    #[test]
    fn failed_refresh_keeps_the_previous_snapshot() {
        let mut app = dashboard();
        app.current = Some(sample_current("Paris"));
        app.slots = Some(Vec::new());
        let before = app.current.clone();

        let icons = app.apply_outcome(Err(FetchError::Status {
            endpoint: "current weather",
            status: StatusCode::BAD_GATEWAY,
        }));

        assert!(icons.is_empty());
        assert_eq!(app.current, before);
        assert!(app.slots.is_some());
        assert!(app.status.starts_with("Refresh failed"));
    }

    #[test]
    fn successful_refresh_swaps_both_snapshots() {
        let mut app = dashboard();
        app.current = Some(sample_current("Paris"));
        app.slots = Some(Vec::new());

        let bundle = FetchBundle {
            current: sample_current("Lyon"),
            slots: Vec::new(),
            icons: HashMap::new(),
        };
        let _ = app.apply_outcome(Ok(bundle));

        assert_eq!(app.current.as_ref().map(|c| c.city.as_str()), Some("Lyon"));
        assert!(app.status.starts_with("Data updated at"));
    }

    #[test]
    fn empty_search_raises_the_alert_and_fetches_nothing() {
        let mut app = dashboard();
        app.city_input = "   ".to_string();

        app.search();

        assert!(app.show_empty_city_alert);
        assert_eq!(app.active_city, "Paris");
        assert!(!app.refresh_in_flight());
    }

    #[test]
    fn icon_keys_distinguish_the_scaled_variant() {
        assert_eq!(icon_key("10d", true), "10d@2x");
        assert_eq!(icon_key("10d", false), "10d");
    }
}
