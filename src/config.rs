use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://fbref.com";
const DEFAULT_RATE_SECS: f64 = 1.5;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PASSPORT_DIR: &str = "output/passport";
const DEFAULT_CHART_DIR: &str = "output/compare";

/// Everything the scraping pipeline needs to know about its environment.
///
/// Built once by the binary and handed to the fetcher and exporters.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub rate_floor: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
    pub fallback_enabled: bool,
    pub data_dir: PathBuf,
    pub passport_dir: PathBuf,
    pub chart_dir: PathBuf,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_floor: Duration::from_secs_f64(DEFAULT_RATE_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            fallback_enabled: true,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            passport_dir: PathBuf::from(DEFAULT_PASSPORT_DIR),
            chart_dir: PathBuf::from(DEFAULT_CHART_DIR),
        }
    }
}

impl ScraperConfig {
    /// Reads `.env.local` and `.env` (if present) and then the process
    /// environment. Missing or malformed values keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup("FBREF_BASE_URL")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or(defaults.base_url);
        let rate_secs = lookup("FBREF_RATE_SECS")
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|val| val.is_finite())
            .unwrap_or(DEFAULT_RATE_SECS)
            .clamp(0.0, 30.0);
        let max_retries = lookup("FBREF_MAX_RETRIES")
            .and_then(|val| val.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES)
            .clamp(1, 10);
        let timeout_secs = lookup("FBREF_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        let backoff_ms = lookup("FBREF_BACKOFF_BASE_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_BACKOFF_BASE_MS)
            .min(60_000);
        let fallback_enabled = lookup("FBREF_FALLBACK")
            .map(|val| parse_flag(&val))
            .unwrap_or(true);

        Self {
            base_url,
            rate_floor: Duration::from_secs_f64(rate_secs),
            max_retries,
            timeout: Duration::from_secs(timeout_secs),
            backoff_base: Duration::from_millis(backoff_ms),
            fallback_enabled,
            data_dir: path_or(lookup("FBREF_DATA_DIR"), defaults.data_dir),
            passport_dir: path_or(lookup("FBREF_PASSPORT_DIR"), defaults.passport_dir),
            chart_dir: path_or(lookup("FBREF_CHART_DIR"), defaults.chart_dir),
        }
    }

    /// Absolute URL for a site-relative path such as `/en/players/...`.
    pub fn site_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn path_or(raw: Option<String>, default: PathBuf) -> PathBuf {
    raw.map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}
