//! Configuration module for checkout-swift.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding guest data and the persisted session
    pub data_dir: PathBuf,
    /// Base URL of the remote account service (remote sync disabled when unset)
    pub remote_url: Option<String>,
    /// Anonymous API key for the remote account service
    pub remote_anon_key: Option<String>,
    /// API key for the extraction service (AI import disabled when unset)
    pub extraction_api_key: Option<String>,
    /// Base URL of the extraction service
    pub extraction_url: String,
    /// Model used for member/voucher extraction
    pub extraction_model: String,
    /// Base URL embedded into generated share links
    pub share_base_url: String,
    /// Maximum length of a generated share link
    pub max_share_url_len: usize,
    /// Quiescence delay before a snapshot is persisted
    pub debounce: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir = env::var("CHECKOUT_DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let remote_url = env::var("CHECKOUT_SUPABASE_URL").ok();
        let remote_anon_key = env::var("CHECKOUT_SUPABASE_ANON_KEY").ok();

        let extraction_api_key = env::var("CHECKOUT_GEMINI_API_KEY").ok();

        let extraction_url = env::var("CHECKOUT_GEMINI_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());

        let extraction_model = env::var("CHECKOUT_GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-3-flash-preview".to_string());

        let share_base_url = env::var("CHECKOUT_SHARE_BASE_URL")
            .unwrap_or_else(|_| "https://checkout-swift.app".to_string());

        let max_share_url_len = env::var("CHECKOUT_MAX_SHARE_URL_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let debounce_ms = env::var("CHECKOUT_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let log_level = env::var("CHECKOUT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            data_dir,
            remote_url,
            remote_anon_key,
            extraction_api_key,
            extraction_url,
            extraction_model,
            share_base_url,
            max_share_url_len,
            debounce: Duration::from_millis(debounce_ms),
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("CHECKOUT_DATA_DIR");
        env::remove_var("CHECKOUT_SUPABASE_URL");
        env::remove_var("CHECKOUT_SUPABASE_ANON_KEY");
        env::remove_var("CHECKOUT_GEMINI_API_KEY");
        env::remove_var("CHECKOUT_GEMINI_URL");
        env::remove_var("CHECKOUT_GEMINI_MODEL");
        env::remove_var("CHECKOUT_SHARE_BASE_URL");
        env::remove_var("CHECKOUT_MAX_SHARE_URL_LEN");
        env::remove_var("CHECKOUT_DEBOUNCE_MS");
        env::remove_var("CHECKOUT_LOG_LEVEL");

        let config = Config::from_env();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.remote_url.is_none());
        assert!(config.extraction_api_key.is_none());
        assert_eq!(config.extraction_model, "gemini-3-flash-preview");
        assert_eq!(config.share_base_url, "https://checkout-swift.app");
        assert_eq!(config.max_share_url_len, 8000);
        assert_eq!(config.debounce, Duration::from_millis(1000));
        assert_eq!(config.log_level, "info");
    }
}
