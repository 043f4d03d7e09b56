// src/config.rs - env-driven runtime configuration
//
// Everything is read once at startup. Values that merely look wrong fall
// back to their defaults the way the individual env parsers always have;
// values that would corrupt the trade plans or the store (multiplier
// ordering, zero lengths) are validated and abort startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::scoring::ScoreParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub symbols: Vec<String>,
    pub timeframes: Vec<String>,
    pub scan_interval_secs: u64,
    pub track_interval_secs: u64,

    pub vi_length: usize,
    pub atr_length: usize,
    pub ema_length: usize,

    pub atr_sl_mult: f64,
    pub atr_tp1_mult: f64,
    pub atr_tp2_mult: f64,
    pub atr_tp3_mult: f64,

    pub min_strength: f64,
    pub min_atr_pct: f64,
    pub min_score: i32,

    pub mtf_enabled: bool,
    pub mtf_timeframe: String,

    pub max_active_trades: usize,
    pub state_file: PathBuf,
    pub logs_dir: String,

    pub telegram_bot_token: Option<String>,
    pub chat_id: Option<i64>,

    pub status_api_port: u16,
    pub scan_concurrency_limit: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            api_key: env_or("TWELVE_API_KEY", "").trim().to_string(),
            symbols: parse_csv_list(&env_or("DEFAULT_SYMBOLS", "XAUUSD")),
            timeframes: parse_csv_list(&env_or("AUTO_TFS", "1min,5min,15min,1h")),
            scan_interval_secs: parse_env("SCAN_INTERVAL_SECONDS", 60),
            // The price endpoint is cheap but not free; never poll below 5s.
            track_interval_secs: parse_env("TRACK_INTERVAL_SECONDS", 15u64).max(5),

            vi_length: parse_env("VI_LENGTH", 14),
            atr_length: parse_env("ATR_LENGTH", 14),
            ema_length: parse_env("EMA_LENGTH", 200),

            atr_sl_mult: parse_env("ATR_SL_MULT", 1.5),
            atr_tp1_mult: parse_env("ATR_TP1_MULT", 1.0),
            atr_tp2_mult: parse_env("ATR_TP2_MULT", 2.0),
            atr_tp3_mult: parse_env("ATR_TP3_MULT", 3.0),

            min_strength: parse_env("MIN_STRENGTH", 0.12),
            min_atr_pct: parse_env("MIN_ATR_PCT", 0.001),
            min_score: parse_env("MIN_SCORE", 70),

            mtf_enabled: env_or("MTF_FILTER", "1").trim() == "1",
            mtf_timeframe: env_or("MTF_TIMEFRAME", "1h").trim().to_string(),

            max_active_trades: parse_env("MAX_ACTIVE_TRADES", 20),
            state_file: PathBuf::from(env_or("STATE_FILE", "state_trades.json")),
            logs_dir: env_or("LOGS_DIR", "logs"),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            chat_id: env::var("TELEGRAM_CHAT_ID")
                .ok()
                .and_then(|v| v.trim().parse().ok()),

            status_api_port: parse_env("STATUS_API_PORT", 8080),
            scan_concurrency_limit: parse_env("SCAN_CONCURRENCY_LIMIT", 4usize).max(1),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vi_length == 0 || self.atr_length == 0 || self.ema_length == 0 {
            return Err(ConfigError::Invalid(
                "indicator lengths (VI_LENGTH, ATR_LENGTH, EMA_LENGTH) must be positive".into(),
            ));
        }
        if self.atr_sl_mult <= 0.0 {
            return Err(ConfigError::Invalid("ATR_SL_MULT must be positive".into()));
        }
        if !(self.atr_tp1_mult > 0.0
            && self.atr_tp1_mult < self.atr_tp2_mult
            && self.atr_tp2_mult < self.atr_tp3_mult)
        {
            return Err(ConfigError::Invalid(
                "ATR TP multipliers must satisfy 0 < tp1 < tp2 < tp3".into(),
            ));
        }
        if self.max_active_trades == 0 {
            return Err(ConfigError::Invalid(
                "MAX_ACTIVE_TRADES must be positive".into(),
            ));
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid(
                "DEFAULT_SYMBOLS must name at least one symbol".into(),
            ));
        }
        if self.timeframes.is_empty() {
            return Err(ConfigError::Invalid(
                "AUTO_TFS must name at least one timeframe".into(),
            ));
        }
        Ok(())
    }

    pub fn score_params(&self) -> ScoreParams {
        ScoreParams {
            vi_length: self.vi_length,
            atr_length: self.atr_length,
            ema_length: self.ema_length,
            atr_sl_mult: self.atr_sl_mult,
            atr_tp1_mult: self.atr_tp1_mult,
            atr_tp2_mult: self.atr_tp2_mult,
            atr_tp3_mult: self.atr_tp3_mult,
            min_strength: self.min_strength,
            min_atr_pct: self.min_atr_pct,
            min_score: self.min_score,
        }
    }
}
