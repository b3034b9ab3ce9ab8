//! NomadPost configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use eyre::{Context, Result, bail, eyre};
use placestore::Setting;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Settings-table key overriding `journey.min-days`
pub const SETTING_MIN_DAYS: &str = "min-days-per-location";

/// Settings-table key overriding `journey.max-days`
pub const SETTING_MAX_DAYS: &str = "max-days-per-location";

/// Settings-table key overriding `schedule.cron`
pub const SETTING_SCHEDULE: &str = "post-generation-schedule";

/// Keys accepted by `np settings set`
pub const SETTING_KEYS: [&str; 3] = [SETTING_MIN_DAYS, SETTING_MAX_DAYS, SETTING_SCHEDULE];

pub const ENV_IMAGE_PROVIDER: &str = "IMAGE_PROVIDER";
pub const ENV_MIN_DAYS: &str = "MIN_DAYS_PER_LOCATION";
pub const ENV_MAX_DAYS: &str = "MAX_DAYS_PER_LOCATION";
pub const ENV_SCHEDULE: &str = "POST_GENERATION_SCHEDULE";

/// Main NomadPost configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text generation provider
    pub llm: LlmConfig,

    /// Stay lengths and planner sizes
    pub journey: JourneyConfig,

    /// When cycles run
    pub schedule: ScheduleConfig,

    /// Image providers
    pub images: ImagesConfig,

    /// Current conditions lookup
    pub weather: WeatherConfig,

    /// Coordinates lookup for generated candidates
    pub geocoder: GeocoderConfig,

    /// Where posts go
    pub publisher: PublisherConfig,

    /// Repository location
    pub storage: StorageConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        self.journey.validate()?;
        parse_schedule(&self.schedule.cron)?;

        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Read just `log-level` before logging is initialized; errors are ignored
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".nomadpost.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("nomadpost").join("nomadpost.yml"));
                }
                paths
            }
        };
        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .nomadpost.yml
        let local_config = PathBuf::from(".nomadpost.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/nomadpost/nomadpost.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("nomadpost").join("nomadpost.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `IMAGE_PROVIDER`, `MIN_DAYS_PER_LOCATION`, `MAX_DAYS_PER_LOCATION`
    /// and `POST_GENERATION_SCHEDULE` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Same as `apply_env` with an explicit variable lookup
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        debug!("Config::apply_env_with: called");
        if let Some(value) = lookup(ENV_IMAGE_PROVIDER) {
            self.images.provider = value
                .parse()
                .map_err(|e: String| eyre!("Invalid {}: {}", ENV_IMAGE_PROVIDER, e))?;
            debug!(provider = %self.images.provider, "apply_env_with: image provider overridden");
        }
        if let Some(value) = lookup(ENV_MIN_DAYS) {
            self.journey.min_days = parse_days(ENV_MIN_DAYS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DAYS) {
            self.journey.max_days = parse_days(ENV_MAX_DAYS, &value)?;
        }
        if let Some(value) = lookup(ENV_SCHEDULE) {
            parse_schedule(&value).context(format!("Invalid {}", ENV_SCHEDULE))?;
            self.schedule.cron = value.trim().to_string();
        }
        Ok(())
    }

    /// Resolve the runtime tunables, letting stored settings win over file and env values
    pub fn tunables(&self, settings: &[Setting]) -> Result<Tunables> {
        debug!(setting_count = settings.len(), "Config::tunables: called");
        let lookup = |key: &str| settings.iter().find(|s| s.key == key).map(|s| s.value.clone());

        let min_days = match lookup(SETTING_MIN_DAYS) {
            Some(value) => parse_days(SETTING_MIN_DAYS, &value)?,
            None => self.journey.min_days,
        };
        let max_days = match lookup(SETTING_MAX_DAYS) {
            Some(value) => parse_days(SETTING_MAX_DAYS, &value)?,
            None => self.journey.max_days,
        };
        let schedule = lookup(SETTING_SCHEDULE).unwrap_or_else(|| self.schedule.cron.clone());

        let tunables = Tunables {
            min_days,
            max_days,
            schedule,
        };
        tunables.validate()?;
        Ok(tunables)
    }
}

/// Validate a value for one of the settings-table keys
pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    match key {
        SETTING_MIN_DAYS | SETTING_MAX_DAYS => parse_days(key, value).map(|_| ()),
        SETTING_SCHEDULE => parse_schedule(value).map(|_| ()),
        other => bail!("Unknown setting '{}'. Known: {}", other, SETTING_KEYS.join(", ")),
    }
}

fn parse_days(name: &str, value: &str) -> Result<u32> {
    let days: u32 = value
        .trim()
        .parse()
        .map_err(|_| eyre!("Invalid {}: '{}' is not a whole number of days", name, value))?;
    if days == 0 {
        bail!("Invalid {}: must be at least 1", name);
    }
    Ok(days)
}

/// Parse a cron expression, accepting the 5-field form by prefixing a seconds field
pub fn parse_schedule(expr: &str) -> Result<cron::Schedule> {
    let trimmed = expr.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    };
    cron::Schedule::from_str(&normalized).map_err(|e| eyre!("Invalid cron expression '{}': {}", expr, e))
}

/// Effective stay lengths and schedule after settings overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunables {
    pub min_days: u32,
    pub max_days: u32,
    pub schedule: String,
}

impl Tunables {
    pub fn validate(&self) -> Result<()> {
        if self.min_days < 1 {
            bail!("min-days must be at least 1");
        }
        if self.min_days > self.max_days {
            bail!(
                "min-days ({}) must not exceed max-days ({})",
                self.min_days,
                self.max_days
            );
        }
        parse_schedule(&self.schedule)?;
        Ok(())
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Fixed-window request budget per minute
    #[serde(rename = "requests-per-minute")]
    pub requests_per_minute: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 2048,
            timeout_ms: 30_000,
            requests_per_minute: 20,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| eyre!("Environment variable {} is not set", self.api_key_env))
    }
}

/// Journey tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    /// Minimum days at a location before running out of attractions forces a move
    #[serde(rename = "min-days")]
    pub min_days: u32,

    /// Hard cap on days at one location
    #[serde(rename = "max-days")]
    pub max_days: u32,

    /// Country the journey starts in
    #[serde(rename = "start-country")]
    pub start_country: String,

    /// Candidate cities requested per planning call
    #[serde(rename = "candidate-count")]
    pub candidate_count: usize,

    /// POIs requested per generation call
    #[serde(rename = "poi-count")]
    pub poi_count: usize,

    /// Fixed random seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            min_days: 7,
            max_days: 21,
            start_country: "Serbia".to_string(),
            candidate_count: 5,
            poi_count: 5,
            seed: None,
        }
    }
}

impl JourneyConfig {
    fn validate(&self) -> Result<()> {
        if self.min_days < 1 {
            bail!("journey.min-days must be at least 1");
        }
        if self.min_days > self.max_days {
            bail!(
                "journey.min-days ({}) must not exceed journey.max-days ({})",
                self.min_days,
                self.max_days
            );
        }
        if self.candidate_count == 0 || self.poi_count == 0 {
            bail!("journey.candidate-count and journey.poi-count must be positive");
        }
        Ok(())
    }
}

/// Cycle schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cron expression (5 or 6 fields, local time)
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 8 * * *".to_string(),
        }
    }
}

/// Which image provider is primary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    #[default]
    Unsplash,
    Pexels,
}

impl ImageProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsplash => "unsplash",
            Self::Pexels => "pexels",
        }
    }
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unsplash" => Ok(Self::Unsplash),
            "pexels" => Ok(Self::Pexels),
            _ => Err(format!("Unknown image provider '{}'. Supported: unsplash, pexels", s)),
        }
    }
}

/// API endpoint plus the environment variable holding its key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl ApiEndpoint {
    /// The key, if the variable is set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Image provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Primary provider; the other one is the fallback
    pub provider: ImageProviderKind,

    /// Images attached to each post
    #[serde(rename = "per-post")]
    pub per_post: usize,

    pub unsplash: ApiEndpoint,

    pub pexels: ApiEndpoint,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            provider: ImageProviderKind::Unsplash,
            per_post: 2,
            unsplash: ApiEndpoint {
                api_key_env: "UNSPLASH_ACCESS_KEY".to_string(),
                base_url: "https://api.unsplash.com".to_string(),
            },
            pexels: ApiEndpoint {
                api_key_env: "PEXELS_API_KEY".to_string(),
                base_url: "https://api.pexels.com".to_string(),
            },
        }
    }
}

/// Weather lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,

    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// "metric" or "imperial"
    pub units: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "OPENWEATHER_API_KEY".to_string(),
            base_url: "https://api.openweathermap.org".to_string(),
            units: "metric".to_string(),
        }
    }
}

impl WeatherConfig {
    pub fn endpoint(&self) -> ApiEndpoint {
        ApiEndpoint {
            api_key_env: self.api_key_env.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Geocoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,

    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
        }
    }
}

/// Publication target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    #[default]
    File,
    WordPress,
}

/// WordPress post status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Publish => "publish",
        }
    }
}

/// WordPress REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    /// Site root, e.g. https://blog.example.com
    #[serde(rename = "base-url")]
    pub base_url: String,

    pub username: String,

    /// Environment variable containing the application password
    #[serde(rename = "password-env")]
    pub password_env: String,

    pub status: PostStatus,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password_env: "WORDPRESS_APP_PASSWORD".to_string(),
            status: PostStatus::Draft,
        }
    }
}

/// Publication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub kind: PublisherKind,

    pub wordpress: WordPressConfig,

    /// Output directory for the file publisher
    #[serde(rename = "output-dir")]
    pub output_dir: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        let output_dir = dirs::data_dir()
            .map(|d| d.join("nomadpost").join("posts"))
            .unwrap_or_else(|| PathBuf::from(".nomadpost/posts"))
            .to_string_lossy()
            .into_owned();

        Self {
            kind: PublisherKind::File,
            wordpress: WordPressConfig::default(),
            output_dir,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the PlaceStore database
    #[serde(rename = "placestore-dir")]
    pub placestore_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/nomadpost on Linux)
        let placestore_dir = dirs::data_dir()
            .map(|d| d.join("nomadpost"))
            .unwrap_or_else(|| PathBuf::from(".placestore"))
            .to_string_lossy()
            .into_owned();

        Self { placestore_dir }
    }
}
