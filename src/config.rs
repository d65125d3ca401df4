use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Live,
    Paper,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(RunMode::Live),
            "paper" => Ok(RunMode::Paper),
            other => anyhow::bail!("invalid RUN_MODE: {other}. Must be 'live' or 'paper'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,

    pub broker_app_key: String,
    pub broker_app_secret: String,
    pub broker_account_no: String,
    pub broker_base_url: String,
    pub broker_ws_url: String,

    pub database_url: String,

    pub webhook_url: Option<String>,

    pub universe_symbols: Vec<String>,

    pub tick_interval_ms: u64,
    pub warmup_on_start: bool,
    pub daily_sync_hour_kst: u32,
    pub macro_refresh_interval_minutes: u64,

    pub broker_min_request_interval_ms: u64,
    pub broker_max_retries: u32,

    pub token_cache_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let run_mode_str = env::var("RUN_MODE").unwrap_or_else(|_| "paper".to_string());
        let run_mode = RunMode::from_str(&run_mode_str)?;

        let broker_app_key = env::var("BROKER_APP_KEY").unwrap_or_default();
        let broker_app_secret = env::var("BROKER_APP_SECRET").unwrap_or_default();
        let broker_account_no = env::var("BROKER_ACCOUNT_NO").unwrap_or_default();
        let broker_base_url = env::var("BROKER_BASE_URL")
            .unwrap_or_else(|_| "https://openapivts.koreainvestment.com:29443".to_string());
        let broker_ws_url = env::var("BROKER_WS_URL")
            .unwrap_or_else(|_| "ws://ops.koreainvestment.com:21000".to_string());

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://krus_trader.db".to_string());

        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        let universe_str = env::var("UNIVERSE_SYMBOLS").unwrap_or_default();
        let universe_symbols: Vec<String> = universe_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let tick_interval_ms = env::var("TICK_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u64>()
            .context("failed to parse TICK_INTERVAL_MS")?;

        let warmup_on_start = env::var("WARMUP_ON_START")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let daily_sync_hour_kst = env::var("DAILY_SYNC_HOUR_KST")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<u32>()
            .context("failed to parse DAILY_SYNC_HOUR_KST")?;

        let macro_refresh_interval_minutes = env::var("MACRO_REFRESH_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("failed to parse MACRO_REFRESH_INTERVAL_MINUTES")?;

        let broker_min_request_interval_ms = env::var("BROKER_MIN_REQUEST_INTERVAL_MS")
            .unwrap_or_else(|_| "550".to_string())
            .parse::<u64>()
            .context("failed to parse BROKER_MIN_REQUEST_INTERVAL_MS")?;

        let broker_max_retries = env::var("BROKER_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("failed to parse BROKER_MAX_RETRIES")?;

        let token_cache_path =
            env::var("TOKEN_CACHE_PATH").unwrap_or_else(|_| ".broker_token_cache.json".to_string());

        Ok(Config {
            run_mode,
            broker_app_key,
            broker_app_secret,
            broker_account_no,
            broker_base_url,
            broker_ws_url,
            database_url,
            webhook_url,
            universe_symbols,
            tick_interval_ms,
            warmup_on_start,
            daily_sync_hour_kst,
            macro_refresh_interval_minutes,
            broker_min_request_interval_ms,
            broker_max_retries,
            token_cache_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parses_case_insensitively() {
        assert_eq!(RunMode::from_str("LIVE").unwrap(), RunMode::Live);
        assert_eq!(RunMode::from_str("paper").unwrap(), RunMode::Paper);
        assert!(RunMode::from_str("bogus").is_err());
    }
}
