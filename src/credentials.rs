//! Where the provider API key comes from.
//!
//! The key is looked up on every request rather than captured at startup, so
//! a missing key is reported to the user instead of stopping the process.

pub trait CredentialSource: Send + Sync {
    /// Name shown to the operator when the key is missing
    fn name(&self) -> &str;

    /// The API key, or `None` when nothing usable is configured
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from a process environment variable (populated from `.env` at startup)
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentials {
    fn name(&self) -> &str {
        &self.var
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Fixed key, used when embedding the pipeline or in tests
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    name: String,
    key: Option<String>,
}

impl StaticCredentials {
    pub fn new(name: impl Into<String>, key: Option<String>) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_key(&self) -> Option<String> {
        self.key.clone().filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_credentials_missing_var() {
        let creds = EnvCredentials::new("FORECAST_ENRICH_TEST_NO_SUCH_KEY");
        assert_eq!(creds.name(), "FORECAST_ENRICH_TEST_NO_SUCH_KEY");
        assert!(creds.api_key().is_none());
    }

    #[test]
    fn test_static_credentials_blank_key_is_absent() {
        let creds = StaticCredentials::new("WEATHER_API_KEY", Some("   ".to_string()));
        assert!(creds.api_key().is_none());

        let creds = StaticCredentials::new("WEATHER_API_KEY", Some("abc".to_string()));
        assert_eq!(creds.api_key().as_deref(), Some("abc"));
    }
}
