// src/config/mod.rs
// All tunables come from the environment (with a .env fallback); code holds the defaults.

use once_cell::sync::Lazy;
use std::str::FromStr;

/// Runtime configuration for the council service.
#[derive(Debug, Clone)]
pub struct ConclaveConfig {
    // ── Server
    pub host: String,
    pub port: u16,

    // ── Council
    /// Hard cap on models per council run.
    pub max_models: usize,
    /// Preferred model ids, in preference order.
    pub default_models: Vec<String>,
    /// A previously saved selection; wins outright if every id is still available.
    pub saved_models: Vec<String>,
    /// Explicit chair override. Empty means "first resolved model".
    pub chair: Option<String>,

    // ── History
    pub history_capacity: usize,

    // ── Artifacts
    pub artifacts_dir: String,
    pub slug_timeout_ms: u64,

    // ── Model backend (OpenAI-compatible)
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean = val.split('#').next().unwrap_or("").trim();
            clean.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|val| {
            val.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl ConclaveConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_var_or("CONCLAVE_HOST", "0.0.0.0".to_string()),
            port: env_var_or("CONCLAVE_PORT", 3000),
            max_models: env_var_or("CONCLAVE_MAX_MODELS", 3),
            default_models: env_list("CONCLAVE_DEFAULT_MODELS"),
            saved_models: env_list("CONCLAVE_SAVED_MODELS"),
            chair: std::env::var("CONCLAVE_CHAIR").ok().filter(|s| !s.trim().is_empty()),
            history_capacity: env_var_or("CONCLAVE_HISTORY_SIZE", 20),
            artifacts_dir: env_var_or("CONCLAVE_ARTIFACTS_DIR", "./council-runs".to_string()),
            slug_timeout_ms: env_var_or("CONCLAVE_SLUG_TIMEOUT_MS", 3000),
            api_base_url: env_var_or(
                "CONCLAVE_API_BASE_URL",
                "https://api.openai.com/v1".to_string(),
            ),
            api_key: std::env::var("CONCLAVE_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            request_timeout_secs: env_var_or("CONCLAVE_REQUEST_TIMEOUT_SECS", 60),
        }
    }
}

pub static CONFIG: Lazy<ConclaveConfig> = Lazy::new(|| {
    // .env is optional; real env vars always win.
    dotenvy::dotenv().ok();
    ConclaveConfig::from_env()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ConclaveConfig::from_env();
        assert!(config.max_models >= 1);
        assert!(config.history_capacity >= 1);
        assert!(config.slug_timeout_ms > 0);
    }

    #[test]
    fn env_list_splits_and_trims() {
        // SAFETY: test-local env var, no other test reads it.
        unsafe { std::env::set_var("CONCLAVE_TEST_LIST", " a , b ,, c ") };
        assert_eq!(env_list("CONCLAVE_TEST_LIST"), vec!["a", "b", "c"]);
        unsafe { std::env::remove_var("CONCLAVE_TEST_LIST") };
    }
}
