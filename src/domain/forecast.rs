use serde::Deserialize;

/// Weather payload as served by the forecast endpoint. Only the current
/// snapshot and the first three daily entries are consumed; everything
/// else in the upstream document is ignored. Upstream omits fields freely,
/// so every level defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    #[serde(rename = "currently")]
    pub current: Current,
    pub daily: Daily,
    pub offset: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Current {
    pub time: u64,
    pub summary: String,
    pub icon: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_bearing: i32,
    pub visibility: f64,
    pub cloud_cover: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Daily {
    pub summary: String,
    pub icon: String,
    pub data: Vec<DailyData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyData {
    pub time: u64,
    pub summary: String,
    pub icon: String,
    pub sunrise_time: u64,
    pub sunset_time: u64,
    pub temperature_low: f64,
    pub temperature_high: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub visibility: f64,
    pub precip_probability: f64,
    pub precip_type: String,
}
