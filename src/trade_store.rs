// src/trade_store.rs - durable collection of virtual trades
//
// One JSON file holds every trade ever opened, open and closed alike. Every
// mutation is a full read-modify-write: load the collection, change it in
// memory, write it to a temp file and rename over the canonical path so a
// reader never sees a half-written file. The scan and monitor loops both
// write here, so the whole cycle is serialized behind one async mutex.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::types::{TradePlan, TradeSide};

/// A hypothetical position opened for a signal, tracked until stop-loss or
/// the final target. Never deleted; closing is a soft flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTrade {
    pub id: Uuid,
    pub chat_id: i64,
    pub symbol: String,
    #[serde(rename = "tf")]
    pub timeframe: String,
    pub side: TradeSide,
    pub score: i32,
    pub entry: f64,
    #[serde(rename = "sl")]
    pub stop_loss: f64,
    #[serde(rename = "tp1")]
    pub take_profit1: f64,
    #[serde(rename = "tp2")]
    pub take_profit2: f64,
    #[serde(rename = "tp3")]
    pub take_profit3: f64,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub hit_tp1: bool,
    #[serde(default)]
    pub hit_tp2: bool,
    #[serde(default)]
    pub hit_tp3: bool,
    #[serde(default)]
    pub hit_sl: bool,
    #[serde(default)]
    pub closed: bool,

    #[serde(default)]
    pub last_price: Option<f64>,
}

impl VirtualTrade {
    pub fn new(
        chat_id: i64,
        symbol: &str,
        timeframe: &str,
        side: TradeSide,
        score: i32,
        plan: &TradePlan,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            side,
            score,
            entry: plan.entry,
            stop_loss: plan.stop_loss,
            take_profit1: plan.take_profit1,
            take_profit2: plan.take_profit2,
            take_profit3: plan.take_profit3,
            created_at: Utc::now(),
            hit_tp1: false,
            hit_tp2: false,
            hit_tp3: false,
            hit_sl: false,
            closed: false,
            last_price: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TradeStateFile {
    #[serde(default)]
    trades: Vec<VirtualTrade>,
}

pub struct TradeStore {
    path: PathBuf,
    max_active_trades: usize,
    // Linearizes every read-modify-write cycle across both service loops.
    write_lock: Mutex<()>,
}

impl TradeStore {
    pub fn new(path: impl Into<PathBuf>, max_active_trades: usize) -> Self {
        Self {
            path: path.into(),
            max_active_trades,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a new trade. If the open count is already at the configured
    /// maximum, the single oldest open trade is force-closed first; that is a
    /// capacity eviction, not a notification-worthy close.
    pub async fn open(&self, trade: VirtualTrade) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;

        let open_count = state.trades.iter().filter(|t| !t.closed).count();
        if open_count >= self.max_active_trades {
            if let Some(oldest) = state
                .trades
                .iter_mut()
                .filter(|t| !t.closed)
                .min_by_key(|t| t.created_at)
            {
                warn!(
                    "💾 [STORE] open trade cap {} reached - force-closing oldest {} {} ({})",
                    self.max_active_trades, oldest.symbol, oldest.timeframe, oldest.id
                );
                oldest.closed = true;
            }
        }

        info!(
            "💾 [STORE] recording {} {} {} @ {} (score {}/100)",
            trade.side, trade.symbol, trade.timeframe, trade.entry, trade.score
        );
        state.trades.push(trade);
        self.save(&state).await
    }

    /// All trades not yet closed, as independent copies.
    pub async fn list_open(&self) -> Result<Vec<VirtualTrade>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let state = self.load().await?;
        Ok(state.trades.into_iter().filter(|t| !t.closed).collect())
    }

    /// Every trade ever recorded, open and closed.
    pub async fn list_all(&self) -> Result<Vec<VirtualTrade>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let state = self.load().await?;
        Ok(state.trades)
    }

    /// Replace the stored record with the same id wholesale. A missing id is
    /// a no-op, not an error: the record may have been evicted between the
    /// caller's read and this write.
    pub async fn update(&self, updated: &VirtualTrade) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;

        match state.trades.iter_mut().find(|t| t.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => {
                warn!("💾 [STORE] update for unknown trade {} ignored", updated.id);
                return Ok(());
            }
        }
        self.save(&state).await
    }

    async fn load(&self) -> Result<TradeStateFile, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TradeStateFile::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn save(&self, state: &TradeStateFile) -> Result<(), StoreError> {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
