// =============================================================================
// src/price_feed.rs - TwelveData market data client
// =============================================================================

use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::types::Candle;

const BASE_URL: &str = "https://api.twelvedata.com";

/// Candle depth for the primary timeframe analysis.
pub const CANDLE_OUTPUT_SIZE: usize = 260;
/// Candle depth for the higher-timeframe confirmation fetch.
pub const HTF_CANDLE_OUTPUT_SIZE: usize = 220;

pub struct PriceFeed {
    client: Client,
    api_key: String,
}

impl PriceFeed {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .build()?;
        Ok(Self { client, api_key })
    }

    /// Provider symbol form: `XAUUSD` -> `XAU/USD`, `#`/`$` stripped,
    /// already-slashed symbols pass through.
    pub fn normalize_symbol(raw: &str) -> String {
        let s: String = raw
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| *c != '#' && *c != '$')
            .collect();
        if s.contains('/') {
            return s;
        }
        if s.len() == 6 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            return format!("{}/{}", &s[..3], &s[3..]);
        }
        s
    }

    /// Fetch up to `output_size` candles for one symbol/interval, oldest
    /// first. The provider answers newest-first, so the rows are reversed.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        output_size: usize,
    ) -> Result<Vec<Candle>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let output_size = output_size.to_string();
        let params = [
            ("symbol", symbol),
            ("interval", interval),
            ("outputsize", output_size.as_str()),
            ("apikey", self.api_key.as_str()),
            ("format", "JSON"),
        ];
        let response = self
            .client
            .get(format!("{}/time_series", BASE_URL))
            .query(&params)
            .timeout(Duration::from_secs(12))
            .send()
            .await?
            .error_for_status()?;

        let data: Value = response.json().await?;

        if data.get("status").and_then(Value::as_str) == Some("error") {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api { message });
        }

        let values = match data.get("values").and_then(Value::as_array) {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Err(ProviderError::EmptyData),
        };

        let mut candles = Vec::with_capacity(values.len());
        for row in values.iter().rev() {
            candles.push(Candle {
                time: row
                    .get("datetime")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                open: price_field(row, "open")?,
                high: price_field(row, "high")?,
                low: price_field(row, "low")?,
                close: price_field(row, "close")?,
            });
        }

        debug!(
            "🕯️ [FEED] {} {}: fetched {} candles",
            symbol,
            interval,
            candles.len()
        );
        Ok(candles)
    }

    /// Last traded price, or `None` on any provider hiccup. Much cheaper than
    /// a candle fetch, which is why the monitor loop leans on it.
    pub async fn fetch_last_price(&self, symbol: &str) -> Option<f64> {
        if self.api_key.is_empty() {
            return None;
        }

        let params = [
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
            ("format", "JSON"),
        ];
        let result = self
            .client
            .get(format!("{}/price", BASE_URL))
            .query(&params)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("⚠️ [FEED] price fetch failed for {}: {}", symbol, e);
                return None;
            }
        };

        let data: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️ [FEED] price response for {} unreadable: {}", symbol, e);
                return None;
            }
        };

        if data.get("status").and_then(Value::as_str) == Some("error") {
            // Out of credits or an API-side rejection; not fatal.
            return None;
        }

        data.get("price").and_then(value_as_f64)
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn price_field(row: &Value, key: &str) -> Result<f64, ProviderError> {
    row.get(key)
        .and_then(value_as_f64)
        .ok_or_else(|| ProviderError::Api {
            message: format!("malformed candle field `{}`", key),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_letter_symbols_gain_a_slash() {
        assert_eq!(PriceFeed::normalize_symbol("XAUUSD"), "XAU/USD");
        assert_eq!(PriceFeed::normalize_symbol("eurusd"), "EUR/USD");
        assert_eq!(PriceFeed::normalize_symbol("BTCUSD"), "BTC/USD");
    }

    #[test]
    fn slashed_and_odd_length_symbols_pass_through() {
        assert_eq!(PriceFeed::normalize_symbol("XAU/USD"), "XAU/USD");
        assert_eq!(PriceFeed::normalize_symbol("US500"), "US500");
    }

    #[test]
    fn decorations_are_stripped() {
        assert_eq!(PriceFeed::normalize_symbol(" #XAUUSD "), "XAU/USD");
        assert_eq!(PriceFeed::normalize_symbol("$eurusd"), "EUR/USD");
    }

    #[test]
    fn json_numbers_and_strings_both_parse() {
        assert_eq!(value_as_f64(&serde_json::json!("2001.5")), Some(2001.5));
        assert_eq!(value_as_f64(&serde_json::json!(2001.5)), Some(2001.5));
        assert_eq!(value_as_f64(&serde_json::json!(null)), None);
    }
}
