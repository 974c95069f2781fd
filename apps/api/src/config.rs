use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Upstream API credentials are optional: their absence is reported at
/// startup and the affected feature degrades to a placeholder response.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_temperature: f64,
    pub tax_rate: f64,
    pub allowed_origin: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            tavily_api_key: optional_env("TAVILY_API_KEY"),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            gemini_temperature: std::env::var("GEMINI_TEMPERATURE")
                .unwrap_or_else(|_| "0.4".to_string())
                .parse::<f64>()
                .context("GEMINI_TEMPERATURE must be a number")?,
            tax_rate: std::env::var("TAX_RATE")
                .unwrap_or_else(|_| "0.23".to_string())
                .parse::<f64>()
                .context("TAX_RATE must be a number")?,
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Treats unset and empty variables the same: both mean "not configured".
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_env_is_empty() {
        for key in [
            "GEMINI_API_KEY",
            "TAVILY_API_KEY",
            "GEMINI_MODEL",
            "GEMINI_TEMPERATURE",
            "TAX_RATE",
            "ALLOWED_ORIGIN",
            "PORT",
            "RUST_LOG",
        ] {
            std::env::remove_var(key);
        }

        let config = Config::from_env().expect("defaults should parse");

        assert!(config.gemini_api_key.is_none());
        assert!(config.tavily_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.gemini_temperature, 0.4);
        assert_eq!(config.tax_rate, 0.23);
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_blank_optional_value_counts_as_missing() {
        std::env::set_var("API_TEST_BLANK_OPTIONAL", "   ");
        assert!(optional_env("API_TEST_BLANK_OPTIONAL").is_none());

        std::env::set_var("API_TEST_SET_OPTIONAL", "tvly-abc123");
        assert_eq!(
            optional_env("API_TEST_SET_OPTIONAL").as_deref(),
            Some("tvly-abc123")
        );
    }
}
