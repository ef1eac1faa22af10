use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Everything that can go wrong during one refresh. Icon downloads are not
/// part of this taxonomy; they degrade to a blank icon instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{endpoint} request failed with status {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// Raw OpenWeatherMap payloads. Shared between the current-weather and
// forecast endpoints where the shapes agree.

#[derive(Debug, Deserialize)]
pub struct OwMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
}

#[derive(Debug, Deserialize)]
pub struct OwWeather {
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct OwWind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

/// `rain`/`snow` objects keyed by accumulation window. Either key may be
/// absent; an absent amount counts as zero.
#[derive(Debug, Deserialize, Default)]
pub struct OwPrecipitation {
    #[serde(rename = "1h", default)]
    pub one_hour: f64,
    #[serde(rename = "3h", default)]
    pub three_hours: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct OwSys {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub name: String,
    #[serde(default)]
    pub sys: OwSys,
    pub dt: i64,
    pub main: OwMain,
    pub weather: Vec<OwWeather>,
    #[serde(default)]
    pub wind: OwWind,
    #[serde(default)]
    pub visibility: u32,
    pub rain: Option<OwPrecipitation>,
    pub snow: Option<OwPrecipitation>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: OwMain,
    pub weather: Vec<OwWeather>,
    #[serde(default)]
    pub wind: OwWind,
    pub rain: Option<OwPrecipitation>,
    pub snow: Option<OwPrecipitation>,
}

/// The `city` block of the response is ignored; the dashboard names the
/// location from the current-weather response instead.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastEntry>,
}

/// The displayed snapshot of current conditions. Built once per successful
/// refresh and replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub city: String,
    pub country: String,
    pub observed_at: DateTime<Local>,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: f64,
    pub visibility_km: f64,
    pub condition: String,
    pub icon: String,
    pub rain_1h: Option<f64>,
    pub snow_1h: Option<f64>,
}

impl CurrentConditions {
    pub fn from_response(response: &CurrentResponse) -> Self {
        let condition = response
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let icon = response
            .weather
            .first()
            .map(|w| w.icon.clone())
            .unwrap_or_default();

        Self {
            city: response.name.clone(),
            country: response.sys.country.clone(),
            observed_at: unix_to_local(response.dt),
            temperature: response.main.temp,
            feels_like: response.main.feels_like,
            temp_min: response.main.temp_min,
            temp_max: response.main.temp_max,
            humidity: response.main.humidity,
            pressure: response.main.pressure,
            wind_speed: response.wind.speed,
            wind_deg: response.wind.deg,
            visibility_km: response.visibility as f64 / 1000.0,
            condition,
            icon,
            rain_1h: response.rain.as_ref().map(|p| p.one_hour),
            snow_1h: response.snow.as_ref().map(|p| p.one_hour),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    api_key: String,
    http: Client,
}

impl WeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
        }
    }

    pub async fn fetch_current(&self, city: &str) -> Result<CurrentResponse, FetchError> {
        let body = self.get_json(CURRENT_URL, "current weather", city).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            endpoint: "current weather",
            source,
        })
    }

    pub async fn fetch_forecast(&self, city: &str) -> Result<ForecastResponse, FetchError> {
        let body = self.get_json(FORECAST_URL, "forecast", city).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            endpoint: "forecast",
            source,
        })
    }

    /// Downloads one condition icon. `scaled` selects the @2x variant used
    /// on the current-conditions card.
    pub async fn fetch_icon(&self, icon: &str, scaled: bool) -> Result<Vec<u8>, FetchError> {
        let url = if scaled {
            format!("{ICON_BASE_URL}/{icon}@2x.png")
        } else {
            format!("{ICON_BASE_URL}/{icon}.png")
        };

        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: "icon",
                status,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn get_json(
        &self,
        url: &str,
        endpoint: &'static str,
        city: &str,
    ) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "fr"),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status });
        }

        Ok(response.text().await?)
    }
}

pub(crate) fn unix_to_local(ts: i64) -> DateTime<Local> {
    DateTime::from_timestamp(ts, 0)
        .unwrap_or_else(Utc::now)
        .with_timezone(&Local)
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

pub fn degrees_to_cardinal(degrees: f64) -> &'static str {
    let dirs = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let index = (((degrees + 11.25) / 22.5) as usize) % 16;
    dirs[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_FIXTURE: &str = r#"{
        "name": "Paris",
        "sys": {"country": "FR"},
        "dt": 1717243200,
        "main": {"temp": 18.4, "feels_like": 17.9, "temp_min": 15.2, "temp_max": 21.0, "humidity": 62, "pressure": 1014},
        "weather": [{"description": "pluie modérée", "icon": "10d"}],
        "wind": {"speed": 4.1, "deg": 220},
        "visibility": 8500,
        "rain": {"1h": 0.8}
    }"#;

    #[test]
    fn current_response_maps_onto_snapshot() {
        let parsed: CurrentResponse = serde_json::from_str(CURRENT_FIXTURE).expect("valid fixture");
        let current = CurrentConditions::from_response(&parsed);

        assert_eq!(current.city, "Paris");
        assert_eq!(current.country, "FR");
        assert_eq!(current.condition, "pluie modérée");
        assert_eq!(current.icon, "10d");
        assert_eq!(current.humidity, 62);
        assert_eq!(current.pressure, 1014);
        assert_eq!(current.rain_1h, Some(0.8));
        assert_eq!(current.snow_1h, None);
        assert!((current.visibility_km - 8.5).abs() < 1e-9);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{
            "name": "Oslo",
            "dt": 1717243200,
            "main": {"temp": 2.0, "feels_like": -1.0, "temp_min": 0.0, "temp_max": 3.0, "humidity": 80, "pressure": 1002},
            "weather": [{"description": "neige"}]
        }"#;

        let parsed: CurrentResponse = serde_json::from_str(json).expect("valid fixture");
        let current = CurrentConditions::from_response(&parsed);

        assert_eq!(current.country, "");
        assert_eq!(current.icon, "");
        assert_eq!(current.wind_speed, 0.0);
        assert_eq!(current.wind_deg, 0.0);
        assert_eq!(current.visibility_km, 0.0);
        assert_eq!(current.rain_1h, None);
        assert_eq!(current.snow_1h, None);
    }

    #[test]
    fn forecast_entry_defaults_missing_precipitation_and_wind_direction() {
        let json = r#"{
            "city": {"name": "Paris", "country": "FR"},
            "list": [{
                "dt": 1717243200,
                "main": {"temp": 18.4, "feels_like": 17.9, "temp_min": 15.2, "temp_max": 21.0, "humidity": 62, "pressure": 1014},
                "weather": [{"description": "ciel dégagé", "icon": "01d"}],
                "wind": {"speed": 3.0}
            }]
        }"#;

        let parsed: ForecastResponse = serde_json::from_str(json).expect("valid fixture");
        let entry = &parsed.list[0];

        assert!(entry.rain.is_none());
        assert!(entry.snow.is_none());
        assert_eq!(entry.wind.deg, 0.0);
    }

    #[test]
    fn status_error_names_the_endpoint() {
        let err = FetchError::Status {
            endpoint: "forecast",
            status: StatusCode::UNAUTHORIZED,
        };
        let msg = err.to_string();
        assert!(msg.contains("forecast"));
        assert!(msg.contains("401"));
    }

    #[test]
    fn capitalize_first_letter_handles_unicode_and_empty() {
        assert_eq!(capitalize_first_letter("pluie"), "Pluie");
        assert_eq!(capitalize_first_letter("éclaircies"), "Éclaircies");
        assert_eq!(capitalize_first_letter(""), "");
    }

    #[test]
    fn degrees_to_cardinal_covers_the_compass() {
        assert_eq!(degrees_to_cardinal(0.0), "N");
        assert_eq!(degrees_to_cardinal(45.0), "NE");
        assert_eq!(degrees_to_cardinal(90.0), "E");
        assert_eq!(degrees_to_cardinal(180.0), "S");
        assert_eq!(degrees_to_cardinal(270.0), "W");
        assert_eq!(degrees_to_cardinal(359.0), "N");
    }
}
