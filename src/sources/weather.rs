use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, TimeZone};
use reqwest::blocking::Client;
use url::Url;

use crate::config::Config;
use crate::domain::{DailyData, Forecast};
use crate::errors::{PlannerError, PlannerResult};
use crate::logging::Logger;
use crate::patch::{Document, FieldBinding};
use crate::sources::traits::DashboardSource;

/// Raw forecast responses are kept here between cycles, purely for
/// diagnostics; the file is overwritten on every fetch.
const SCRATCH_FILE: &str = "json/darksky.json";

const STREAM: &str = "weather";

pub struct WeatherSource {
    client: Client,
    endpoint: String,
    html_file: PathBuf,
    scratch_file: PathBuf,
    interval: Duration,
    logger: Logger,
}

impl WeatherSource {
    pub fn new(config: &Config, logger: Logger) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: format!(
                "{}{}/{},{}?{}",
                config.weather_url,
                config.dark_sky_key,
                config.latitude,
                config.longitude,
                config.excludes
            ),
            html_file: PathBuf::from(&config.html_file),
            scratch_file: PathBuf::from(SCRATCH_FILE),
            interval: config.weather_interval(),
            logger,
        }
    }

    fn fetch(&self) -> PlannerResult<Forecast> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| PlannerError::Config(format!("invalid weather endpoint: {}", e)))?;

        let body = self.client.get(url).send()?.error_for_status()?.text()?;
        self.persist_scratch(&body);

        let forecast: Forecast = serde_json::from_str(&body)?;
        if forecast.daily.data.len() < 3 {
            return Err(PlannerError::Payload(format!(
                "forecast has {} daily entries, need 3",
                forecast.daily.data.len()
            )));
        }
        Ok(forecast)
    }

    /// Pretty-print the raw response into the scratch file. Best effort;
    /// a failure here never aborts the cycle.
    fn persist_scratch(&self, body: &str) {
        let pretty = serde_json::from_str::<serde_json::Value>(body)
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| body.to_string());

        if let Some(parent) = self.scratch_file.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&self.scratch_file, pretty) {
            self.logger.warn(
                STREAM,
                &format!(
                    "could not persist raw forecast to {}: {}",
                    self.scratch_file.display(),
                    e
                ),
            );
        }
    }

    /// The full marker table for the weather section: four current
    /// conditions plus six fields for each of the first three forecast
    /// days. Markers match the dashboard HTML exactly.
    fn bindings(forecast: &Forecast) -> Vec<FieldBinding> {
        let current = &forecast.current;
        let mut bindings = vec![
            FieldBinding::numeric(
                "currentTemp",
                "<span id=\"currentTemp\">",
                " &#8457",
                current.temperature,
                0,
            ),
            FieldBinding::numeric(
                "currentHumidity",
                "<br> <span id=\"currentHumidity\">",
                " %</span>",
                current.humidity * 100.0,
                0,
            ),
            FieldBinding::numeric(
                "currentWindSpeed",
                "<br> <span id=\"currentWindSpeed\">",
                " mph</span>",
                current.wind_speed,
                0,
            ),
            FieldBinding::numeric(
                "currentVisibility",
                "<br> <span id=\"currentVisibility\">",
                " mi.</span>",
                current.visibility,
                0,
            ),
        ];

        for (i, day) in forecast.daily.data.iter().take(3).enumerate() {
            bindings.extend(Self::day_bindings(i, day));
        }

        bindings
    }

    fn day_bindings(index: usize, day: &DailyData) -> Vec<FieldBinding> {
        let n = index + 1;
        vec![
            FieldBinding::text(
                format!("day{}", n),
                format!("<h2><span id=\"day{}\">", n),
                format!("<!--d{}--></span></h2>", n),
                weekday(day.time),
            ),
            FieldBinding::numeric(
                format!("lowTemp{}", n),
                format!("<span id=\"lowTemp{}\">", n),
                format!(" &#8457;<!--{}--></span>", 2 * index + 1),
                day.temperature_low,
                0,
            ),
            FieldBinding::numeric(
                format!("highTemp{}", n),
                format!("<span id=\"highTemp{}\">", n),
                format!(" &#8457;<!--{}--></span>", 2 * index + 2),
                day.temperature_high,
                0,
            ),
            FieldBinding::numeric(
                format!("humidity{}", n),
                format!("<br> <span id=\"humidity{}\">", n),
                format!(" %<!--{}--></span>", n),
                day.humidity * 100.0,
                0,
            ),
            FieldBinding::numeric(
                format!("windspeed{}", n),
                format!("<br> <span id=\"windspeed{}\">", n),
                format!(" mph<!--{}--></span>", n),
                day.wind_speed,
                0,
            ),
            FieldBinding::numeric(
                format!("visibility{}", n),
                format!("<br> <span id=\"visibility{}\">", n),
                format!(" mi.<!--{}--></span>", n),
                day.visibility,
                0,
            ),
        ]
    }
}

/// Local weekday name for a unix timestamp, e.g. `Monday`.
fn weekday(unix_time: u64) -> String {
    match Local.timestamp_opt(unix_time as i64, 0).single() {
        Some(t) => t.format("%A").to_string(),
        None => String::new(),
    }
}

impl DashboardSource for WeatherSource {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn log_stream(&self) -> &'static str {
        STREAM
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn refresh(&self) -> PlannerResult<()> {
        let forecast = self.fetch()?;

        let mut doc = Document::load(&self.html_file)?;
        for name in doc.apply(&Self::bindings(&forecast)) {
            self.logger.warn(
                STREAM,
                &format!("marker pair for '{}' not found; field left unchanged", name),
            );
        }
        doc.save()?;

        self.logger.info(STREAM, "finished weather refresh");
        Ok(())
    }
}
