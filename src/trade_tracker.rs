// src/trade_tracker.rs - TP/SL crossing detection for virtual trades
//
// One call per price observation. The trade record itself carries the
// previous observation (`last_price`), so the whole engine is a pure function
// over (record, price) and safe to repeat every few seconds forever: every
// level's hit flag guards against re-emitting its event.

use serde::Serialize;
use std::fmt;

use crate::trade_store::VirtualTrade;

/// Lifecycle milestones in the order they can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeEvent {
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TP1")]
    TakeProfit1,
    #[serde(rename = "TP2")]
    TakeProfit2,
    #[serde(rename = "TP3")]
    TakeProfit3,
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeEvent::StopLoss => write!(f, "SL"),
            TradeEvent::TakeProfit1 => write!(f, "TP1"),
            TradeEvent::TakeProfit2 => write!(f, "TP2"),
            TradeEvent::TakeProfit3 => write!(f, "TP3"),
        }
    }
}

/// Did the price path cross `level` between `prev` and `now`?
///
/// With no previous observation a touch counts: there is no prior value to
/// bound a crossing, so `now` merely having reached the level reports a hit.
/// Otherwise the crossing must straddle the level, which keeps a repeated
/// observation on the far side from re-triggering.
fn crossed(level: f64, prev: Option<f64>, now: f64, upward: bool) -> bool {
    match prev {
        None => {
            if upward {
                now >= level
            } else {
                now <= level
            }
        }
        Some(prev) => {
            if upward {
                prev < level && level <= now
            } else {
                prev > level && level >= now
            }
        }
    }
}

/// Evaluate one price observation against a trade's levels.
///
/// Returns the events fired by this observation, in order. Stop-loss is
/// checked first and ends the evaluation; the three targets are checked
/// independently, so one large move can fire several of them. TP3 closes the
/// trade. `last_price` is advanced unconditionally, before any level check.
pub fn check_hits(trade: &mut VirtualTrade, price: f64) -> Vec<TradeEvent> {
    let mut events = Vec::new();
    let buy = trade.side.is_buy();

    let prev = trade.last_price;
    trade.last_price = Some(price);

    // Stop-loss terminates the trade; no target is looked at on this tick.
    if !trade.hit_sl && !trade.closed && crossed(trade.stop_loss, prev, price, !buy) {
        trade.hit_sl = true;
        trade.closed = true;
        events.push(TradeEvent::StopLoss);
        return events;
    }

    if !trade.hit_tp1 && !trade.closed && crossed(trade.take_profit1, prev, price, buy) {
        trade.hit_tp1 = true;
        events.push(TradeEvent::TakeProfit1);
    }

    if !trade.hit_tp2 && !trade.closed && crossed(trade.take_profit2, prev, price, buy) {
        trade.hit_tp2 = true;
        events.push(TradeEvent::TakeProfit2);
    }

    if !trade.hit_tp3 && !trade.closed && crossed(trade.take_profit3, prev, price, buy) {
        trade.hit_tp3 = true;
        trade.closed = true;
        events.push(TradeEvent::TakeProfit3);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TradePlan, TradeSide};

    fn buy_trade() -> VirtualTrade {
        VirtualTrade::new(
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
        )
    }

    fn sell_trade() -> VirtualTrade {
        VirtualTrade::new(
            7,
            "XAU/USD",
            "5min",
            TradeSide::Sell,
            85,
            &TradePlan {
                entry: 2000.0,
                stop_loss: 2020.0,
                take_profit1: 1990.0,
                take_profit2: 1980.0,
                take_profit3: 1970.0,
            },
        )
    }

    #[test]
    fn first_observation_below_the_stop_closes_a_buy() {
        let mut trade = buy_trade();
        let events = check_hits(&mut trade, 1975.0);
        assert_eq!(events, vec![TradeEvent::StopLoss]);
        assert!(trade.hit_sl);
        assert!(trade.closed);
        assert_eq!(trade.last_price, Some(1975.0));
    }

    #[test]
    fn targets_fire_one_by_one_across_sequential_ticks() {
        let mut trade = buy_trade();

        assert!(check_hits(&mut trade, 2005.0).is_empty());
        assert_eq!(check_hits(&mut trade, 2012.0), vec![TradeEvent::TakeProfit1]);
        assert_eq!(check_hits(&mut trade, 2022.0), vec![TradeEvent::TakeProfit2]);
        assert_eq!(check_hits(&mut trade, 2035.0), vec![TradeEvent::TakeProfit3]);

        assert!(trade.hit_tp1 && trade.hit_tp2 && trade.hit_tp3);
        assert!(!trade.hit_sl);
        assert!(trade.closed);
    }

    #[test]
    fn a_single_jump_fires_every_target_it_crosses_in_order() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 1995.0).is_empty());

        let events = check_hits(&mut trade, 2025.0);
        assert_eq!(events, vec![TradeEvent::TakeProfit1, TradeEvent::TakeProfit2]);
        assert!(!trade.hit_tp3);
        assert!(!trade.closed);
    }

    #[test]
    fn a_hit_level_never_fires_twice() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 2005.0).is_empty());
        assert_eq!(check_hits(&mut trade, 2012.0), vec![TradeEvent::TakeProfit1]);

        // Dip back below and cross TP1 again: only stale news.
        assert!(check_hits(&mut trade, 2004.0).is_empty());
        assert!(check_hits(&mut trade, 2013.0).is_empty());
    }

    #[test]
    fn landing_exactly_on_the_level_counts_as_a_hit() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 2005.0).is_empty());
        assert_eq!(check_hits(&mut trade, 2010.0), vec![TradeEvent::TakeProfit1]);
    }

    #[test]
    fn a_repeated_price_beyond_the_level_only_fires_once() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 2005.0).is_empty());
        assert_eq!(check_hits(&mut trade, 2012.0), vec![TradeEvent::TakeProfit1]);
        // Same price again: prev is no longer below the level.
        assert!(check_hits(&mut trade, 2012.0).is_empty());
    }

    #[test]
    fn stop_loss_ends_the_trade_for_good() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 1995.0).is_empty());
        // Straight down through the stop.
        let events = check_hits(&mut trade, 1975.0);
        assert_eq!(events, vec![TradeEvent::StopLoss]);
        assert!(trade.closed);

        // Closed is terminal: a rocket back up changes nothing.
        assert!(check_hits(&mut trade, 2050.0).is_empty());
        assert!(!trade.hit_tp1 && !trade.hit_tp2 && !trade.hit_tp3);
    }

    #[test]
    fn stop_and_final_target_are_mutually_exclusive() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 2005.0).is_empty());
        assert_eq!(
            check_hits(&mut trade, 2035.0),
            vec![
                TradeEvent::TakeProfit1,
                TradeEvent::TakeProfit2,
                TradeEvent::TakeProfit3
            ]
        );
        assert!(trade.closed);

        // Terminal: even a collapse through the stop emits nothing.
        assert!(check_hits(&mut trade, 1900.0).is_empty());
        assert!(!trade.hit_sl);
    }

    #[test]
    fn sell_side_mirrors_every_direction() {
        let mut trade = sell_trade();
        assert!(check_hits(&mut trade, 2005.0).is_empty());

        // Down through TP1 and TP2 at once.
        assert_eq!(
            check_hits(&mut trade, 1978.0),
            vec![TradeEvent::TakeProfit1, TradeEvent::TakeProfit2]
        );

        // Back up through the stop.
        let events = check_hits(&mut trade, 2025.0);
        assert_eq!(events, vec![TradeEvent::StopLoss]);
        assert!(trade.hit_sl);
        assert!(trade.closed);
        assert!(!trade.hit_tp3);
    }

    #[test]
    fn first_observation_touch_semantics_apply_to_targets_too() {
        let mut trade = buy_trade();
        // Fresh trade, first tick already past TP1 and TP2.
        let events = check_hits(&mut trade, 2021.0);
        assert_eq!(events, vec![TradeEvent::TakeProfit1, TradeEvent::TakeProfit2]);
    }

    #[test]
    fn last_price_advances_even_when_nothing_fires() {
        let mut trade = buy_trade();
        assert!(check_hits(&mut trade, 2001.0).is_empty());
        assert_eq!(trade.last_price, Some(2001.0));
        assert!(check_hits(&mut trade, 2002.0).is_empty());
        assert_eq!(trade.last_price, Some(2002.0));
    }
}
