// src/telegram_notifier.rs
use log::{error, info, warn};
use reqwest::Client;
use serde_json::json;

use crate::scoring::SignalScore;
use crate::trade_store::VirtualTrade;
use crate::trade_tracker::TradeEvent;

/// Outbound-only Telegram sink. Every send is fire-and-forget: failures are
/// logged and never bubble into the scan or monitor loops.
pub struct TelegramNotifier {
    client: Client,
    bot_token: Option<String>,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>) -> Self {
        let enabled = bot_token.is_some();

        if enabled {
            info!("📱 Telegram notifier initialized");
        } else {
            warn!("📱 Telegram notifier disabled - missing TELEGRAM_BOT_TOKEN");
        }

        Self {
            client: Client::new(),
            bot_token,
            enabled,
        }
    }

    /// Send raw Markdown text to a chat.
    pub async fn notify(&self, chat_id: i64, text: &str) {
        if !self.enabled {
            return;
        }
        let Some(bot_token) = self.bot_token.as_deref() else {
            return;
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", bot_token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                error!("📱 Failed to send Telegram notification: {}", error_text);
            }
            Err(e) => {
                error!("📱 Telegram request failed: {}", e);
            }
        }
    }

    /// Alert for a fresh directional signal, with the full price plan.
    pub async fn send_signal_alert(
        &self,
        chat_id: i64,
        symbol: &str,
        interval: &str,
        outcome: &SignalScore,
    ) {
        info!(
            "📱 {} alert for {} {} @ {} (score {}/100)",
            outcome.signal,
            symbol,
            interval,
            fmt_price(outcome.plan.entry),
            outcome.score
        );
        let message = format_signal_alert(symbol, interval, outcome);
        self.notify(chat_id, &message).await;
    }

    /// Alert for one lifecycle milestone of a tracked trade.
    pub async fn send_trade_event(&self, trade: &VirtualTrade, event: TradeEvent, price: f64) {
        info!(
            "📱 {} alert for {} {} {} @ {}",
            event,
            trade.symbol,
            trade.timeframe,
            trade.side,
            fmt_price(price)
        );
        let message = format_hit_message(trade, event, price);
        self.notify(trade.chat_id, &message).await;
    }
}

/// Two decimals for big quotes, five for FX-sized ones.
pub fn fmt_price(x: f64) -> String {
    if x >= 100.0 {
        format!("{:.2}", x)
    } else {
        format!("{:.5}", x)
    }
}

fn format_signal_alert(symbol: &str, interval: &str, outcome: &SignalScore) -> String {
    format!(
        "🚨 *SIGNAL ALERT*\n\
         • Symbol: *{}*\n\
         • TF: *{}*\n\n\
         ✅ *Signal:* *{}*\n\
         🎯 Entry: `{}`\n\
         🛡 Stop: `{}`\n\
         🏁 TP1: `{}` | TP2: `{}` | TP3: `{}`\n\n\
         🔎 VI+ `{:.3}` vs VI- `{:.3}` | Strength `{:.3}` | ATR `{:.3}`\n\
         ⭐ Score: *{}/100*\n\n\
         ⏳ Monitoring TP/SL...",
        symbol,
        interval,
        outcome.signal,
        fmt_price(outcome.plan.entry),
        fmt_price(outcome.plan.stop_loss),
        fmt_price(outcome.plan.take_profit1),
        fmt_price(outcome.plan.take_profit2),
        fmt_price(outcome.plan.take_profit3),
        outcome.vi_plus,
        outcome.vi_minus,
        outcome.strength,
        outcome.atr,
        outcome.score
    )
}

fn format_hit_message(trade: &VirtualTrade, event: TradeEvent, price: f64) -> String {
    match event {
        TradeEvent::StopLoss => format!(
            "🛑 *STOP LOSS hit*\n\
             • Symbol: *{}*\n\
             • TF: *{}*\n\
             • Side: *{}*\n\
             • Price: `{}`\n\
             • SL: `{}`\n\
             ✅ Trade closed.",
            trade.symbol,
            trade.timeframe,
            trade.side,
            fmt_price(price),
            fmt_price(trade.stop_loss)
        ),
        TradeEvent::TakeProfit1 => format!(
            "✅ *TP1 hit*\n\
             {} {} — *{}*\n\
             Price: `{}` | TP1: `{}`",
            trade.symbol,
            trade.timeframe,
            trade.side,
            fmt_price(price),
            fmt_price(trade.take_profit1)
        ),
        TradeEvent::TakeProfit2 => format!(
            "✅ *TP2 hit*\n\
             {} {} — *{}*\n\
             Price: `{}` | TP2: `{}`",
            trade.symbol,
            trade.timeframe,
            trade.side,
            fmt_price(price),
            fmt_price(trade.take_profit2)
        ),
        TradeEvent::TakeProfit3 => format!(
            "🏁 *TP3 FINAL hit*\n\
             • Symbol: *{}*\n\
             • TF: *{}*\n\
             • Side: *{}*\n\
             • Price: `{}`\n\
             • TP3: `{}`\n\
             ✅ Trade complete.",
            trade.symbol,
            trade.timeframe,
            trade.side,
            fmt_price(price),
            fmt_price(trade.take_profit3)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TradePlan, TradeSide};

    #[test]
    fn price_formatting_switches_precision_at_one_hundred() {
        assert_eq!(fmt_price(2015.371), "2015.37");
        assert_eq!(fmt_price(100.0), "100.00");
        assert_eq!(fmt_price(1.234567), "1.23457");
    }

    #[test]
    fn hit_messages_carry_the_level_that_fired() {
        let trade = VirtualTrade::new(
            7,
            "XAU/USD",
            "5min",
            TradeSide::Buy,
            85,
            &TradePlan {
                entry: 2000.0,
                stop_loss: 1980.0,
                take_profit1: 2010.0,
                take_profit2: 2020.0,
                take_profit3: 2030.0,
            },
        );

        let sl = format_hit_message(&trade, TradeEvent::StopLoss, 1979.0);
        assert!(sl.contains("STOP LOSS"));
        assert!(sl.contains("1980.00"));
        assert!(sl.contains("XAU/USD"));

        let tp3 = format_hit_message(&trade, TradeEvent::TakeProfit3, 2031.0);
        assert!(tp3.contains("TP3 FINAL"));
        assert!(tp3.contains("2030.00"));
        assert!(tp3.contains("BUY"));
    }
}
