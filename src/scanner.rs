// src/scanner.rs - periodic signal scan service
//
// Each tick fans one fetch-and-score task out per (symbol, timeframe) under
// a small concurrency cap, joins them all, then applies the results in
// order: anti-spam gate, Telegram alert, virtual trade registration. A
// failed unit is logged and skipped; it never takes the iteration down.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use dashmap::DashMap;

use crate::config::Config;
use crate::price_feed::{PriceFeed, CANDLE_OUTPUT_SIZE, HTF_CANDLE_OUTPUT_SIZE};
use crate::scoring::{score_signal, SignalScore};
use crate::telegram_notifier::TelegramNotifier;
use crate::trade_store::{TradeStore, VirtualTrade};
use crate::types::Signal;

/// Last emitted signal per (chat, symbol, timeframe). Process-local and
/// rebuilt empty on restart; its only job is suppressing repeat alerts for
/// an unchanged directional state.
type LastSignalMap = DashMap<(i64, String, String), Signal>;

pub struct SignalScanner {
    config: Arc<Config>,
    feed: Arc<PriceFeed>,
    store: Arc<TradeStore>,
    notifier: Arc<TelegramNotifier>,
    last_signal: LastSignalMap,
}

impl SignalScanner {
    pub fn new(
        config: Arc<Config>,
        feed: Arc<PriceFeed>,
        store: Arc<TradeStore>,
        notifier: Arc<TelegramNotifier>,
    ) -> Self {
        Self {
            config,
            feed,
            store,
            notifier,
            last_signal: DashMap::new(),
        }
    }

    pub async fn run(&self) {
        info!(
            "[SCANNER] Service started. Interval: {}s, symbols: {:?}, timeframes: {:?}",
            self.config.scan_interval_secs, self.config.symbols, self.config.timeframes
        );
        if self.config.chat_id.is_none() {
            warn!("[SCANNER] TELEGRAM_CHAT_ID not set - signals will be logged, not tracked");
        }

        let mut ticker = interval(Duration::from_secs(self.config.scan_interval_secs));
        loop {
            ticker.tick().await;
            self.scan_once().await;
        }
    }

    /// One full sweep over every watched (symbol, timeframe) unit.
    pub async fn scan_once(&self) {
        let semaphore = Arc::new(Semaphore::new(self.config.scan_concurrency_limit));
        let mut handles = Vec::new();

        for raw_symbol in &self.config.symbols {
            let symbol = PriceFeed::normalize_symbol(raw_symbol);
            for timeframe in &self.config.timeframes {
                let semaphore = Arc::clone(&semaphore);
                let feed = Arc::clone(&self.feed);
                let config = Arc::clone(&self.config);
                let symbol = symbol.clone();
                let timeframe = timeframe.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("Semaphore permit acquisition failed");
                    let outcome = analyze_unit(&feed, &config, &symbol, &timeframe).await;
                    (symbol, timeframe, outcome)
                }));
            }
        }

        for joined in join_all(handles).await {
            let (symbol, timeframe, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("[SCANNER] analysis task panicked: {}", e);
                    continue;
                }
            };

            match outcome {
                Ok(score) => self.apply_outcome(symbol, timeframe, score).await,
                Err(e) => warn!("[SCANNER] {} {}: {}", symbol, timeframe, e),
            }
        }
    }

    /// Anti-spam gate plus the alert-and-track side effects of a signal.
    async fn apply_outcome(&self, symbol: String, timeframe: String, outcome: SignalScore) {
        let chat_id = self.config.chat_id;
        let key = (chat_id.unwrap_or(0), symbol.clone(), timeframe.clone());

        match outcome.signal {
            Signal::Buy | Signal::Sell => {
                let previous = self.last_signal.get(&key).map(|entry| *entry);
                if previous == Some(outcome.signal) {
                    return;
                }
                self.last_signal.insert(key, outcome.signal);

                info!(
                    "[SCANNER] {} {} -> {} (score {}/100, strength {:.3})",
                    symbol, timeframe, outcome.signal, outcome.score, outcome.strength
                );

                let Some(chat_id) = chat_id else {
                    return;
                };

                self.notifier
                    .send_signal_alert(chat_id, &symbol, &timeframe, &outcome)
                    .await;

                let trade = VirtualTrade::new(
                    chat_id,
                    &symbol,
                    &timeframe,
                    outcome.side,
                    outcome.score,
                    &outcome.plan,
                );
                if let Err(e) = self.store.open(trade).await {
                    error!(
                        "[SCANNER] failed to record virtual trade for {} {}: {}",
                        symbol, timeframe, e
                    );
                }
            }
            // WAIT resets the anti-spam state silently, so the next
            // directional flip alerts again.
            Signal::Wait => {
                self.last_signal.insert(key, Signal::Wait);
            }
        }
    }
}

/// Fetch and score one (symbol, timeframe) unit. The higher-timeframe fetch
/// only happens when confirmation is enabled.
async fn analyze_unit(
    feed: &PriceFeed,
    config: &Config,
    symbol: &str,
    timeframe: &str,
) -> Result<SignalScore, Box<dyn std::error::Error + Send + Sync>> {
    let candles = feed
        .fetch_candles(symbol, timeframe, CANDLE_OUTPUT_SIZE)
        .await?;

    let higher_tf = if config.mtf_enabled {
        Some(
            feed.fetch_candles(symbol, &config.mtf_timeframe, HTF_CANDLE_OUTPUT_SIZE)
                .await?,
        )
    } else {
        None
    };

    let outcome = score_signal(&candles, higher_tf.as_deref(), &config.score_params())?;
    Ok(outcome)
}
