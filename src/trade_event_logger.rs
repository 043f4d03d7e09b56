// src/trade_event_logger.rs
// CSV log of virtual trade lifecycle events, one file per day.

use chrono::Utc;
use log::error;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::trade_store::VirtualTrade;
use crate::trade_tracker::TradeEvent;

pub struct TradeEventLogger {
    logs_dir: String,
}

impl TradeEventLogger {
    pub fn new(logs_dir: impl Into<String>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    fn filename(&self) -> String {
        format!(
            "{}/trade_events_{}.csv",
            self.logs_dir,
            Utc::now().format("%Y-%m-%d")
        )
    }

    /// Append one event row. Logging is best-effort: a failed append is
    /// reported and swallowed, the monitor keeps going.
    pub async fn log_event(&self, trade: &VirtualTrade, event: TradeEvent, price: f64) {
        if let Err(e) = self.write_row(trade, event, price).await {
            error!(
                "📝 [EVENT_LOG] failed to append {} for {} {}: {}",
                event, trade.symbol, trade.timeframe, e
            );
        }
    }

    async fn write_row(
        &self,
        trade: &VirtualTrade,
        event: TradeEvent,
        price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !Path::new(&self.logs_dir).exists() {
            tokio::fs::create_dir_all(&self.logs_dir).await?;
        }

        let filename = self.filename();
        let needs_headers = match tokio::fs::metadata(&filename).await {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        if needs_headers {
            writer.write_record([
                "timestamp",
                "trade_id",
                "chat_id",
                "symbol",
                "timeframe",
                "side",
                "event",
                "price",
                "entry",
                "score",
            ])?;
        }
        writer.write_record([
            Utc::now().to_rfc3339(),
            trade.id.to_string(),
            trade.chat_id.to_string(),
            trade.symbol.clone(),
            trade.timeframe.clone(),
            trade.side.to_string(),
            event.to_string(),
            price.to_string(),
            trade.entry.to_string(),
            trade.score.to_string(),
        ])?;
        writer.flush()?;
        let data = writer.into_inner().map_err(|e| e.to_string())?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)
            .await?;
        file.write_all(&data).await?;
        Ok(())
    }
}
