use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{PlannerError, PlannerResult};
use crate::logging::{Logger, DEFAULT_MAX_BYTES};

/// Process configuration, loaded once at startup and immutable afterwards.
/// Key spelling follows the original `json/config.json`; missing keys take
/// their zero value, matching lenient JSON decoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub debug: bool,

    pub dark_sky_key: String,
    pub latitude: String,
    pub longitude: String,
    pub excludes: String,
    #[serde(rename = "weatherURL")]
    pub weather_url: String,
    /// Hours between weather refreshes.
    pub weather_reload_interval: u64,

    // Recognized but currently driving no task, as in the original.
    #[serde(rename = "qotdURL")]
    pub qotd_url: String,
    pub qotd_reload_interval: u64,

    #[serde(rename = "wotdURL")]
    pub wotd_url: String,
    /// Hours between word-of-the-day refreshes.
    pub wotd_reload_interval: u64,

    pub photos_dir: String,
    pub css_directory: String,
    /// Minutes between photo rotations.
    pub photo_reload_interval: u64,

    /// Seconds; recognized but unused (see qotd fields).
    pub time_check_interval: u64,

    pub html_file: String,

    #[serde(rename = "mwRSS")]
    pub mw_rss: String,
    #[serde(rename = "mwURL")]
    pub mw_url: String,
    #[serde(rename = "mwKEY")]
    pub mw_key: String,

    // Per-stream log rotation thresholds, in megabytes. Zero falls back
    // to the 2048-byte default.
    pub max_planner_log: u64,
    pub max_weather_log: u64,
    #[serde(rename = "maxWOTDLog")]
    pub max_wotd_log: u64,
    pub max_photo_log: u64,

    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            dark_sky_key: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            excludes: String::new(),
            weather_url: String::new(),
            weather_reload_interval: 0,
            qotd_url: String::new(),
            qotd_reload_interval: 0,
            wotd_url: String::new(),
            wotd_reload_interval: 0,
            photos_dir: String::new(),
            css_directory: String::new(),
            photo_reload_interval: 0,
            time_check_interval: 0,
            html_file: String::new(),
            mw_rss: String::new(),
            mw_url: String::new(),
            mw_key: String::new(),
            max_planner_log: 0,
            max_weather_log: 0,
            max_wotd_log: 0,
            max_photo_log: 0,
            log_dir: "log".to_string(),
        }
    }
}

impl Config {
    /// Read and parse the configuration file. A `.env` alongside the
    /// process may override the API keys so they stay out of the config
    /// file.
    pub fn load<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: Config = serde_json::from_str(&raw).map_err(|e| {
            PlannerError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;

        if let Ok(key) = std::env::var("DARKSKY_KEY") {
            config.dark_sky_key = key;
        }
        if let Ok(key) = std::env::var("MW_KEY") {
            config.mw_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PlannerResult<()> {
        if self.html_file.is_empty() {
            return Err(PlannerError::Config("htmlFile is not set".to_string()));
        }
        if self.css_directory.is_empty() {
            return Err(PlannerError::Config("cssDirectory is not set".to_string()));
        }
        if self.photos_dir.is_empty() {
            return Err(PlannerError::Config("photosDir is not set".to_string()));
        }
        if self.weather_reload_interval == 0
            || self.wotd_reload_interval == 0
            || self.photo_reload_interval == 0
        {
            return Err(PlannerError::Config(
                "reload intervals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn weather_interval(&self) -> Duration {
        Duration::from_secs(self.weather_reload_interval * 3600)
    }

    pub fn wotd_interval(&self) -> Duration {
        Duration::from_secs(self.wotd_reload_interval * 3600)
    }

    pub fn photo_interval(&self) -> Duration {
        Duration::from_secs(self.photo_reload_interval * 60)
    }

    /// Rotation threshold in bytes for a configured max-size in megabytes.
    pub fn log_limit(megabytes: u64) -> u64 {
        if megabytes == 0 {
            DEFAULT_MAX_BYTES
        } else {
            megabytes * 1024 * 1024
        }
    }

    /// Build the process logger with one threshold per configured stream.
    pub fn build_logger(&self) -> Logger {
        Logger::new(&self.log_dir)
            .with_limit("planner", Self::log_limit(self.max_planner_log))
            .with_limit("weather", Self::log_limit(self.max_weather_log))
            .with_limit("wotd", Self::log_limit(self.max_wotd_log))
            .with_limit("photo", Self::log_limit(self.max_photo_log))
    }

    /// Echo every recognized option to the planner stream on startup.
    pub fn log_summary(&self, logger: &Logger) {
        logger.info("planner", &format!("                debug: {}", self.debug));
        logger.info(
            "planner",
            &format!("           darkSkyKey: {}", mask(&self.dark_sky_key)),
        );
        logger.info("planner", &format!("             latitude: {}", self.latitude));
        logger.info("planner", &format!("            longitude: {}", self.longitude));
        logger.info("planner", &format!("             excludes: {}", self.excludes));
        logger.info("planner", &format!("           weatherURL: {}", self.weather_url));
        logger.info(
            "planner",
            &format!("weatherReloadInterval: {} hr", self.weather_reload_interval),
        );
        logger.info("planner", &format!("              qotdURL: {}", self.qotd_url));
        logger.info(
            "planner",
            &format!("   qotdReloadInterval: {} hr", self.qotd_reload_interval),
        );
        logger.info("planner", &format!("              wotdURL: {}", self.wotd_url));
        logger.info(
            "planner",
            &format!("   wotdReloadInterval: {} hr", self.wotd_reload_interval),
        );
        logger.info("planner", &format!("            photosDir: {}", self.photos_dir));
        logger.info("planner", &format!("         cssDirectory: {}", self.css_directory));
        logger.info(
            "planner",
            &format!("  photoReloadInterval: {} min", self.photo_reload_interval),
        );
        logger.info(
            "planner",
            &format!("    timeCheckInterval: {} sec", self.time_check_interval),
        );
        logger.info("planner", &format!("             htmlFile: {}", self.html_file));
        logger.info("planner", &format!("                mwRSS: {}", self.mw_rss));
        logger.info("planner", &format!("                mwURL: {}", self.mw_url));
        logger.info("planner", &format!("                mwKEY: {}", mask(&self.mw_key)));
        logger.info(
            "planner",
            &format!("        maxPlannerLog: {} M", self.max_planner_log),
        );
        logger.info(
            "planner",
            &format!("        maxWeatherLog: {} M", self.max_weather_log),
        );
        logger.info(
            "planner",
            &format!("           maxWOTDLog: {} M", self.max_wotd_log),
        );
        logger.info(
            "planner",
            &format!("          maxPhotoLog: {} M", self.max_photo_log),
        );
    }
}

fn mask(secret: &str) -> String {
    // Char-based, not byte-based: keys come straight from the config
    // file and may contain multi-byte characters.
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"{
        "debug": true,
        "darkSkyKey": "abcdef123456",
        "latitude": "40.477",
        "longitude": "-86.938",
        "excludes": "exclude=minutely,hourly",
        "weatherURL": "https://api.darksky.net/forecast/",
        "weatherReloadInterval": 2,
        "qotdURL": "https://example.com/qotd",
        "qotdReloadInterval": 24,
        "wotdURL": "https://example.com/wotd",
        "wotdReloadInterval": 12,
        "photosDir": "photos",
        "cssDirectory": "css/planner.css",
        "photoReloadInterval": 30,
        "timeCheckInterval": 60,
        "htmlFile": "planner.html",
        "mwRSS": "https://www.merriam-webster.com/wotd/feed/rss2",
        "mwURL": "https://www.dictionaryapi.com/api/v1/references/collegiate/xml/",
        "mwKEY": "mw-key-000",
        "maxPlannerLog": 1,
        "maxWeatherLog": 2,
        "maxWOTDLog": 3,
        "maxPhotoLog": 4
    }"#;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parses_original_key_spelling() {
        let config: Config = serde_json::from_str(FULL).unwrap();

        assert!(config.debug);
        assert_eq!(config.dark_sky_key, "abcdef123456");
        assert_eq!(config.weather_url, "https://api.darksky.net/forecast/");
        assert_eq!(config.weather_reload_interval, 2);
        assert_eq!(config.css_directory, "css/planner.css");
        assert_eq!(config.mw_rss, "https://www.merriam-webster.com/wotd/feed/rss2");
        assert_eq!(config.mw_key, "mw-key-000");
        assert_eq!(config.max_wotd_log, 3);
        assert_eq!(config.log_dir, "log");
    }

    #[test]
    fn test_missing_keys_take_zero_values() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(!config.debug);
        assert_eq!(config.weather_reload_interval, 0);
        assert_eq!(config.html_file, "");
    }

    #[test]
    fn test_intervals_in_their_configured_units() {
        let config: Config = serde_json::from_str(FULL).unwrap();
        assert_eq!(config.weather_interval(), Duration::from_secs(2 * 3600));
        assert_eq!(config.wotd_interval(), Duration::from_secs(12 * 3600));
        assert_eq!(config.photo_interval(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_log_limit_maps_megabytes_with_fallback() {
        assert_eq!(Config::log_limit(0), DEFAULT_MAX_BYTES);
        assert_eq!(Config::log_limit(1), 1024 * 1024);
        assert_eq!(Config::log_limit(4), 4 * 1024 * 1024);
    }

    #[test]
    fn test_load_rejects_unparseable_file() {
        let file = write_config("{not json");
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn test_load_rejects_missing_required_paths() {
        let file = write_config(r#"{"weatherReloadInterval": 1}"#);
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("htmlFile"));
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        assert!(Config::load("/nonexistent/config.json").is_err());
    }

    #[test]
    fn test_mask_keeps_four_leading_chars() {
        assert_eq!(mask("abcdef123456"), "abcd****");
        assert_eq!(mask("key"), "****");
        assert_eq!(mask(""), "****");
    }

    #[test]
    fn test_mask_handles_multibyte_keys() {
        // A key whose 4th byte sits inside a multi-byte character must
        // not split the string mid-character.
        assert_eq!(mask("ab€"), "****");
        assert_eq!(mask("ab€xyz"), "ab€x****");
    }

    #[test]
    fn test_log_summary_survives_multibyte_api_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let logger = Logger::new(dir.path());
        let config = Config {
            dark_sky_key: "ab€".to_string(),
            mw_key: "mw€-key-000".to_string(),
            ..Config::default()
        };

        config.log_summary(&logger);

        let text = fs::read_to_string(dir.path().join("planner.log")).unwrap();
        assert!(text.contains("mw€-****"));
        assert!(!text.contains("mw€-key-000"));
    }
}
