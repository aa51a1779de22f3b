use crate::state::location::DEFAULT_COORDINATE;
use crate::state::matches::SlotPolicy;
use log::LevelFilter;
use pitchside_api::Coordinate;
use pitchside_api::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: LevelFilter,
    pub api_url: String,
    pub timeout: Duration,
    pub radius_km: f64,
    /// Fixed device position; when unset the position is read from
    /// `<data_dir>/location`.
    pub device_location: Option<Coordinate>,
    pub default_location: Coordinate,
    pub data_dir: PathBuf,
    pub slot_policy: SlotPolicy,
    pub player_name: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: LevelFilter::Info,
            api_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            radius_km: DEFAULT_RADIUS_KM,
            device_location: None,
            default_location: DEFAULT_COORDINATE,
            data_dir: PathBuf::from("."),
            slot_policy: SlotPolicy::default(),
            player_name: None,
        }
    }
}

impl AppSettings {
    /// Settings from the environment, plus a warning for every value that
    /// was ignored. Settings load before the logger exists, so the caller
    /// reports the warnings once it can.
    pub fn load() -> (Self, Vec<String>) {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from `lookup`; malformed values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();
        let mut warnings = Vec::new();

        if let Some(url) = get("PITCHSIDE_API_URL") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_valid::<u64>(
            "PITCHSIDE_TIMEOUT_SECS",
            get("PITCHSIDE_TIMEOUT_SECS"),
            |secs| *secs > 0,
            &mut warnings,
        ) {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(radius) = parse_valid::<f64>(
            "PITCHSIDE_RADIUS_KM",
            get("PITCHSIDE_RADIUS_KM"),
            |r| r.is_finite() && *r > 0.0,
            &mut warnings,
        ) {
            settings.radius_km = radius;
        }
        settings.device_location =
            parse_coordinate("PITCHSIDE_LOCATION", get("PITCHSIDE_LOCATION"), &mut warnings);
        if let Some(fallback) =
            parse_coordinate("PITCHSIDE_DEFAULT_LOCATION", get("PITCHSIDE_DEFAULT_LOCATION"), &mut warnings)
        {
            settings.default_location = fallback;
        }
        settings.data_dir = data_dir(&get);
        if let Some(raw) = get("PITCHSIDE_SLOT_POLICY") {
            match SlotPolicy::parse(&raw) {
                Some(policy) => settings.slot_policy = policy,
                None => warnings.push(format!("ignoring PITCHSIDE_SLOT_POLICY={raw}")),
            }
        }
        if let Some(level) =
            parse_valid::<LevelFilter>("PITCHSIDE_LOG", get("PITCHSIDE_LOG"), |_| true, &mut warnings)
        {
            settings.log_level = level;
        }
        settings.player_name = get("PITCHSIDE_PLAYER_NAME").or_else(|| get("USER"));
        (settings, warnings)
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.data_dir.join("tokens.json")
    }

    pub fn location_path(&self) -> PathBuf {
        self.data_dir.join("location")
    }
}

fn data_dir(get: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = get("PITCHSIDE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(config_dir) = get("XDG_CONFIG_HOME") {
        return PathBuf::from(config_dir).join("pitchside");
    }
    if let Some(home) = get("HOME") {
        return PathBuf::from(home).join(".config").join("pitchside");
    }
    PathBuf::from(".")
}

fn parse_valid<T: FromStr>(
    key: &str,
    raw: Option<String>,
    valid: impl Fn(&T) -> bool,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let raw = raw?;
    let parsed = raw.parse::<T>().ok().filter(|value| valid(value));
    if parsed.is_none() {
        warnings.push(format!("ignoring {key}={raw}"));
    }
    parsed
}

fn parse_coordinate(key: &str, raw: Option<String>, warnings: &mut Vec<String>) -> Option<Coordinate> {
    let raw = raw?;
    let parsed = Coordinate::parse(&raw);
    if parsed.is_none() {
        warnings.push(format!("ignoring {key}={raw}: expected lat,lon"));
    }
    parsed
}
