//! Environment-sourced configuration.
//!
//! Mirrors the teacher crate's philosophy of a plain struct with a
//! `Default` impl and no config-file-parsing dependency, adapted to the
//! env-var sourcing this service fixes as its sole configuration channel.

use crate::ltmc::error::{LtmcError, LtmcResult};
use std::env;
use std::time::Duration;

/// Lifecycle-root configuration, read once at startup and handed by value
/// (wrapped in `Arc` by the caller) to every component instead of living
/// behind per-module globals.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub vector_index_path: String,
    pub embedding_dim: usize,

    pub cache_enabled: bool,
    pub cache_host: String,
    pub cache_port: u16,
    pub cache_password: Option<String>,

    pub graph_enabled: bool,
    pub graph_uri: String,
    #[allow(dead_code)]
    pub graph_user: Option<String>,
    #[allow(dead_code)]
    pub graph_password: Option<String>,

    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub rank_alpha: f64,
    pub rank_beta: f64,
    pub rank_gamma: f64,
    pub rank_delta: f64,
    pub rank_epsilon: f64,
    pub overfetch: usize,
    pub recency_tau_secs: f64,
    pub context_budget_chars: usize,

    pub breaker_fails: u32,
    pub breaker_cooldown: Duration,

    pub enable_auth: bool,
    pub api_token: Option<String>,
}

impl Config {
    /// Reads and validates every variable in §4.14's table. Never panics;
    /// a malformed value is an `InvalidParams` error, surfaced by the
    /// binary as a non-zero exit.
    pub fn from_env() -> LtmcResult<Config> {
        let cache_enabled = parse_bool("CACHE_ENABLED", false)?;
        let graph_enabled = parse_bool("GRAPH_ENABLED", false)?;
        let enable_auth = parse_bool("ENABLE_AUTH", false)?;
        let api_token = env::var("API_TOKEN").ok().filter(|s| !s.is_empty());

        if enable_auth && api_token.is_none() {
            return Err(LtmcError::InvalidParams(
                "ENABLE_AUTH=true requires API_TOKEN to be set".into(),
            ));
        }

        Ok(Config {
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "ltmc.db".to_string()),
            vector_index_path: env::var("VECTOR_INDEX_PATH")
                .unwrap_or_else(|_| "ltmc.vec".to_string()),
            embedding_dim: parse_num("EMBEDDING_DIM", 384)?,

            cache_enabled,
            cache_host: env::var("CACHE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            cache_port: parse_num("CACHE_PORT", 6379)?,
            cache_password: env::var("CACHE_PASSWORD").ok().filter(|s| !s.is_empty()),

            graph_enabled,
            graph_uri: env::var("GRAPH_URI").unwrap_or_else(|_| "ltmc.graph".to_string()),
            graph_user: env::var("GRAPH_USER").ok(),
            graph_password: env::var("GRAPH_PASSWORD").ok(),

            chunk_size: parse_num("CHUNK_SIZE", 512)?,
            chunk_overlap: parse_num("CHUNK_OVERLAP", 50)?,

            rank_alpha: parse_float("RANK_ALPHA", 0.6)?,
            rank_beta: parse_float("RANK_BETA", 0.2)?,
            rank_gamma: parse_float("RANK_GAMMA", 0.1)?,
            rank_delta: parse_float("RANK_DELTA", 0.05)?,
            rank_epsilon: parse_float("RANK_EPSILON", 0.05)?,
            overfetch: parse_num("OVERFETCH", 4)?,
            recency_tau_secs: parse_float("RECENCY_TAU", 7.0 * 86400.0)?,
            context_budget_chars: parse_num("CONTEXT_BUDGET_CHARS", 4000)?,

            breaker_fails: parse_num("BREAKER_FAILS", 5)?,
            breaker_cooldown: Duration::from_secs(parse_num("BREAKER_COOLDOWN_S", 30)?),

            enable_auth,
            api_token,
        })
    }
}

impl Default for Config {
    /// Used by tests; equivalent to `from_env()` with no variables set.
    fn default() -> Self {
        Config::from_env().expect("default config must be valid")
    }
}

fn parse_bool(key: &str, default: bool) -> LtmcResult<bool> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(LtmcError::InvalidParams(format!(
                "{key}: not a boolean: {other}"
            ))),
        },
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, default: T) -> LtmcResult<T> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => v
            .parse::<T>()
            .map_err(|_| LtmcError::InvalidParams(format!("{key}: not a number: {v}"))),
    }
}

fn parse_float(key: &str, default: f64) -> LtmcResult<f64> {
    parse_num(key, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_env() {
        // SAFETY-adjacent in tests only: remove any leakage from other tests in-process.
        for k in ["ENABLE_AUTH", "API_TOKEN", "EMBEDDING_DIM"] {
            env::remove_var(k);
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.embedding_dim, 384);
        assert_eq!(cfg.chunk_size, 512);
        assert_eq!(cfg.chunk_overlap, 50);
        assert!(!cfg.enable_auth);
    }

    #[test]
    fn auth_enabled_without_token_is_invalid() {
        env::set_var("ENABLE_AUTH", "true");
        env::remove_var("API_TOKEN");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, LtmcError::InvalidParams(_)));
        env::remove_var("ENABLE_AUTH");
    }

    #[test]
    fn malformed_number_is_invalid_params() {
        env::set_var("EMBEDDING_DIM", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, LtmcError::InvalidParams(_)));
        env::remove_var("EMBEDDING_DIM");
    }
}
