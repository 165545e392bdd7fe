use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1/forecast.json";
pub const DEFAULT_API_KEY_ENV: &str = "WEATHER_API_KEY";
pub const DEFAULT_DAYS: i32 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub charts: ChartConfig,
    /// Day count used when the submitted value does not parse
    #[serde(default = "default_days", deserialize_with = "deserialize_number")]
    pub default_days: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            charts: ChartConfig::default(),
            default_days: DEFAULT_DAYS,
        }
    }
}

fn default_days() -> i32 {
    DEFAULT_DAYS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_number")]
    pub timeout_seconds: u32,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_width", deserialize_with = "deserialize_number")]
    pub width: u32,
    #[serde(default = "default_height", deserialize_with = "deserialize_number")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("static/charts")
}

fn default_width() -> u32 {
    900
}

fn default_height() -> u32 {
    400
}

/// Custom deserializer that handles numeric settings as both number and string
///
/// Accepts:
/// - `timeout_seconds: 10` (number)
/// - `timeout_seconds: "10"` (string that parses to number)
/// - `timeout_seconds: ${WEATHER_TIMEOUT}` (env var substituted to either)
fn deserialize_number<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberValue<T> {
        Number(T),
        String(String),
    }

    match NumberValue::<T>::deserialize(deserializer)? {
        NumberValue::Number(n) => Ok(n),
        NumberValue::String(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid number: '{}'", s))),
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Load the file when present, otherwise fall back to built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Valid provider URL (http or https)
    /// - Positive timeout
    /// - Non-empty credential variable name
    /// - Non-zero chart dimensions
    /// - Fallback day count of at least one
    fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.provider.base_url) {
            Ok(parsed) => {
                if parsed.scheme() != "https" && parsed.scheme() != "http" {
                    return Err(AppError::Config(format!(
                        "Provider base_url must use HTTP(S), got: {}",
                        parsed.scheme()
                    )));
                }
                if parsed.scheme() == "http" {
                    tracing::warn!(
                        "Provider base_url {} is not HTTPS; the API key will travel in clear text",
                        self.provider.base_url
                    );
                }
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Invalid provider base_url '{}': {}",
                    self.provider.base_url, e
                )));
            }
        }

        if self.provider.timeout_seconds == 0 {
            return Err(AppError::Config(
                "Provider timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.provider.api_key_env.trim().is_empty() {
            return Err(AppError::Config(
                "Provider api_key_env cannot be empty".to_string(),
            ));
        }

        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(AppError::Config(format!(
                "Chart dimensions must be non-zero, got {}x{}",
                self.charts.width, self.charts.height
            )));
        }

        if self.default_days < 1 {
            return Err(AppError::Config(format!(
                "default_days must be at least 1, got {}",
                self.default_days
            )));
        }

        Ok(())
    }
}

/// Substitute `${VAR}` and `${VAR:-fallback}` references.
///
/// A bare `${VAR}` that is unset is an error; every unset name is reported
/// together. A reference with a fallback never fails.
fn expand_env_vars(content: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .map_err(|e| AppError::Config(format!("Invalid expansion pattern: {}", e)))?;

    let mut missing_vars: Vec<String> = Vec::new();

    let expanded = re.replace_all(content, |cap: &regex_lite::Captures<'_>| {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(fallback)) => fallback.as_str().to_string(),
            (Err(_), None) => {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if let Some(first) = missing_vars.first() {
        let plural = if missing_vars.len() > 1 { "s" } else { "" };
        return Err(AppError::Config(format!(
            "Missing required environment variable{plural}: {list}\n\n\
             Set {first} in your environment or .env file, \
             or give it a fallback with ${{{first}:-value}} in the config",
            list = missing_vars.join(", "),
        )));
    }

    Ok(expanded.into_owned())
}
