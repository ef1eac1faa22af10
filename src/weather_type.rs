use egui::Color32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherType {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
    Fog,
}

impl WeatherType {
    /// Accent color used for the dashboard heading.
    pub fn accent_color(self) -> Color32 {
        match self {
            WeatherType::Clear => Color32::from_rgb(70, 130, 200),
            WeatherType::PartlyCloudy => Color32::from_rgb(110, 140, 180),
            WeatherType::Cloudy => Color32::GRAY,
            WeatherType::Rain | WeatherType::Thunderstorm => Color32::DARK_GRAY,
            WeatherType::Snow => Color32::from_rgb(140, 170, 200),
            WeatherType::Fog => Color32::from_rgb(150, 150, 150),
        }
    }
}

/// Classify an OpenWeatherMap description into a coarse bucket. The API is
/// queried with `lang=fr`, so the keywords are the French descriptions it
/// returns ("peu nuageux" must be checked before the bare "nuag" prefix).
pub fn determine_weather_type(description: &str) -> WeatherType {
    let desc_lower = description.to_lowercase();
    if desc_lower.contains("neige") {
        WeatherType::Snow
    } else if desc_lower.contains("pluie")
        || desc_lower.contains("bruine")
        || desc_lower.contains("averse")
    {
        WeatherType::Rain
    } else if desc_lower.contains("orage") {
        WeatherType::Thunderstorm
    } else if desc_lower.contains("brouillard") || desc_lower.contains("brume") {
        WeatherType::Fog
    } else if desc_lower.contains("peu nuageux") || desc_lower.contains("épars") {
        WeatherType::PartlyCloudy
    } else if desc_lower.contains("nuag") || desc_lower.contains("couvert") {
        WeatherType::Cloudy
    } else {
        WeatherType::Clear
    }
}
