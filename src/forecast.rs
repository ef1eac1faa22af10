use chrono::{DateTime, Local, NaiveDate};

use crate::weather::{unix_to_local, ForecastEntry, ForecastResponse};

/// One 3-hour forecast record, extracted from the raw response with
/// defaults applied (missing rain/snow amounts and wind direction are zero).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSlot {
    pub time: DateTime<Local>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: f64,
    pub condition: String,
    pub icon: String,
    pub rain: f64,
    pub snow: f64,
}

pub fn reshape(response: &ForecastResponse) -> Vec<ForecastSlot> {
    response.list.iter().map(slot_from_entry).collect()
}

fn slot_from_entry(entry: &ForecastEntry) -> ForecastSlot {
    ForecastSlot {
        time: unix_to_local(entry.dt),
        temperature: entry.main.temp,
        feels_like: entry.main.feels_like,
        humidity: entry.main.humidity,
        pressure: entry.main.pressure,
        wind_speed: entry.wind.speed,
        wind_deg: entry.wind.deg,
        condition: entry
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        icon: entry
            .weather
            .first()
            .map(|w| w.icon.clone())
            .unwrap_or_default(),
        rain: entry.rain.as_ref().map(|p| p.three_hours).unwrap_or(0.0),
        snow: entry.snow.as_ref().map(|p| p.three_hours).unwrap_or(0.0),
    }
}

/// The slots of one local calendar date plus its displayed summary. Borrows
/// from the slot sequence; built fresh for every render pass.
#[derive(Debug)]
pub struct DayBucket<'a> {
    pub date: NaiveDate,
    pub slots: Vec<&'a ForecastSlot>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub dominant_condition: String,
}

impl<'a> DayBucket<'a> {
    fn new(date: NaiveDate, slots: Vec<&'a ForecastSlot>) -> Self {
        let mut min_temp = f64::INFINITY;
        let mut max_temp = f64::NEG_INFINITY;
        for slot in &slots {
            min_temp = min_temp.min(slot.temperature);
            max_temp = max_temp.max(slot.temperature);
        }

        let dominant_condition = dominant_condition(slots.iter().map(|s| s.condition.as_str()));

        Self {
            date,
            slots,
            min_temp,
            max_temp,
            dominant_condition,
        }
    }
}

/// Groups slots by the local calendar date of their timestamp. Buckets come
/// out in first-appearance order of each date, and together they hold every
/// slot exactly once.
pub fn bucket_by_day(slots: &[ForecastSlot]) -> Vec<DayBucket<'_>> {
    let mut grouped: Vec<(NaiveDate, Vec<&ForecastSlot>)> = Vec::new();
    for slot in slots {
        let date = slot.time.date_naive();
        match grouped.iter_mut().find(|(d, _)| *d == date) {
            Some((_, group)) => group.push(slot),
            None => grouped.push((date, vec![slot])),
        }
    }

    grouped
        .into_iter()
        .map(|(date, group)| DayBucket::new(date, group))
        .collect()
}

/// Most frequent condition text; a tie keeps the condition seen first.
fn dominant_condition<'a>(conditions: impl Iterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for condition in conditions {
        match counts.iter_mut().find(|(c, _)| *c == condition) {
            Some((_, n)) => *n += 1,
            None => counts.push((condition, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (condition, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((condition, n));
        }
    }

    best.map(|(condition, _)| condition.to_string())
        .unwrap_or_default()
}
