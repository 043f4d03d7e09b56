// src/trade_monitor.rs - virtual TP/SL monitor service
//
// Each tick loads the open trades, fetches one last price per distinct
// symbol concurrently, then walks the trades one by one: crossing check,
// persist, notify. Persist-before-notify keeps retries safe: if the write
// fails the record's flags and last observed price stay at the last durable
// state, and the same crossing fires again on the next tick.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use crate::price_feed::PriceFeed;
use crate::telegram_notifier::TelegramNotifier;
use crate::trade_event_logger::TradeEventLogger;
use crate::trade_store::TradeStore;
use crate::trade_tracker::check_hits;

pub struct TradeMonitor {
    feed: Arc<PriceFeed>,
    store: Arc<TradeStore>,
    notifier: Arc<TelegramNotifier>,
    event_log: TradeEventLogger,
    interval_secs: u64,
}

impl TradeMonitor {
    pub fn new(
        feed: Arc<PriceFeed>,
        store: Arc<TradeStore>,
        notifier: Arc<TelegramNotifier>,
        event_log: TradeEventLogger,
        interval_secs: u64,
    ) -> Self {
        Self {
            feed,
            store,
            notifier,
            event_log,
            interval_secs,
        }
    }

    pub async fn run(&self) {
        info!(
            "[MONITOR] Service started. Interval: {}s",
            self.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        loop {
            ticker.tick().await;
            self.check_open_trades().await;
        }
    }

    /// One monitor pass over every open trade.
    pub async fn check_open_trades(&self) {
        let trades = match self.store.list_open().await {
            Ok(trades) => trades,
            Err(e) => {
                error!("[MONITOR] failed to load open trades: {}", e);
                return;
            }
        };
        if trades.is_empty() {
            return;
        }

        // One price request per distinct symbol; trades whose symbol yields
        // no price this tick are simply skipped until the next one.
        let mut symbols: Vec<String> = trades.iter().map(|t| t.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();

        let fetches = symbols.into_iter().map(|symbol| {
            let feed = Arc::clone(&self.feed);
            async move {
                let price = feed.fetch_last_price(&symbol).await;
                (symbol, price)
            }
        });
        let prices: HashMap<String, f64> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(symbol, price)| price.map(|p| (symbol, p)))
            .collect();

        for mut trade in trades {
            let Some(&price) = prices.get(&trade.symbol) else {
                debug!(
                    "[MONITOR] no price for {} this tick, skipping {}",
                    trade.symbol, trade.id
                );
                continue;
            };

            let events = check_hits(&mut trade, price);
            if events.is_empty() {
                // Nothing fired: leave the durable record alone so the last
                // observed price cannot advance past a missed crossing.
                continue;
            }

            if let Err(e) = self.store.update(&trade).await {
                error!(
                    "[MONITOR] failed to persist {} {} ({}): {} - will retry next tick",
                    trade.symbol, trade.timeframe, trade.id, e
                );
                continue;
            }

            for event in events {
                info!(
                    "[MONITOR] {} {} {} @ {} -> {}",
                    trade.symbol, trade.timeframe, trade.side, price, event
                );
                self.notifier.send_trade_event(&trade, event, price).await;
                self.event_log.log_event(&trade, event, price).await;
            }
        }
    }
}
