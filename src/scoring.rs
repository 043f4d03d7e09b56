// src/scoring.rs - multi-factor signal scoring
//
// Pure: candles in, `SignalScore` out. The scanner owns the data fetches and
// the anti-spam state; nothing here touches the network or the store.

use crate::errors::IndicatorError;
use crate::indicators::{atr_percent, average_true_range, exponential_moving_average, vortex};
use crate::types::{Candle, Signal, TradePlan, TradeSide};

/// Tunables for one scoring pass. Mirrors the env configuration but kept as a
/// plain value so the scorer stays a pure function.
#[derive(Debug, Clone)]
pub struct ScoreParams {
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
}

/// Everything one analysis produces: the gated signal, the price plan built
/// for the dominant direction (returned even on WAIT), and the raw indicator
/// readings behind the score.
#[derive(Debug, Clone)]
pub struct SignalScore {
    pub signal: Signal,
    pub side: TradeSide,
    pub plan: TradePlan,
    pub strength: f64,
    pub vi_plus: f64,
    pub vi_minus: f64,
    pub atr: f64,
    pub score: i32,
}

/// Stop and targets from the last price and the ATR, mirrored around the
/// entry by side.
pub fn build_trade_plan(last_price: f64, side: TradeSide, atr: f64, params: &ScoreParams) -> TradePlan {
    let entry = last_price;
    match side {
        TradeSide::Buy => TradePlan {
            entry,
            stop_loss: entry - atr * params.atr_sl_mult,
            take_profit1: entry + atr * params.atr_tp1_mult,
            take_profit2: entry + atr * params.atr_tp2_mult,
            take_profit3: entry + atr * params.atr_tp3_mult,
        },
        TradeSide::Sell => TradePlan {
            entry,
            stop_loss: entry + atr * params.atr_sl_mult,
            take_profit1: entry - atr * params.atr_tp1_mult,
            take_profit2: entry - atr * params.atr_tp2_mult,
            take_profit3: entry - atr * params.atr_tp3_mult,
        },
    }
}

/// Score one candle sequence, optionally confirmed by a higher timeframe.
///
/// Five gates must all pass for a directional signal: directional strength,
/// higher-timeframe confirmation (granted when no higher-timeframe sequence
/// is supplied), trend filter, volatility filter, and the minimum score.
/// Failing any of them yields WAIT no matter how high the score is.
pub fn score_signal(
    primary: &[Candle],
    higher_tf: Option<&[Candle]>,
    params: &ScoreParams,
) -> Result<SignalScore, IndicatorError> {
    let (vi_plus, vi_minus) = vortex(primary, params.vi_length)?;
    let atr = average_true_range(primary, params.atr_length)?;

    let Some(last) = primary.last() else {
        return Err(IndicatorError::InsufficientData { needed: 1, got: 0 });
    };
    let last_price = last.close;

    let strength = (vi_plus - vi_minus).abs();
    let side = if vi_plus > vi_minus {
        TradeSide::Buy
    } else {
        TradeSide::Sell
    };
    let base_signal = if strength < params.min_strength {
        Signal::Wait
    } else if side.is_buy() {
        Signal::Buy
    } else {
        Signal::Sell
    };

    let plan = build_trade_plan(last_price, side, atr, params);

    let closes: Vec<f64> = primary.iter().map(|c| c.close).collect();
    let ema = exponential_moving_average(&closes, params.ema_length)?;
    let trend_ok = if side.is_buy() {
        last_price > ema
    } else {
        last_price < ema
    };

    let vol_ok = atr_percent(atr, last_price) >= params.min_atr_pct;

    let confirmation_ok = match higher_tf {
        Some(candles) => {
            let (htf_plus, htf_minus) = vortex(candles, params.vi_length)?;
            let htf_side = if htf_plus > htf_minus {
                TradeSide::Buy
            } else {
                TradeSide::Sell
            };
            htf_side == side
        }
        None => true,
    };

    let mut score = 0;
    if confirmation_ok {
        score += 30;
    }
    if trend_ok {
        score += 25;
    }
    score += if strength >= params.min_strength + 0.10 {
        20
    } else if strength >= params.min_strength {
        10
    } else {
        0
    };
    if vol_ok {
        score += 15;
    }
    let body_agrees = if side.is_buy() {
        last.close >= last.open
    } else {
        last.close <= last.open
    };
    if body_agrees {
        score += 10;
    }

    let signal = if base_signal == Signal::Wait
        || !confirmation_ok
        || !trend_ok
        || !vol_ok
        || score < params.min_score
    {
        Signal::Wait
    } else {
        base_signal
    };

    Ok(SignalScore {
        signal,
        side,
        plan,
        strength,
        vi_plus,
        vi_minus,
        atr,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            time: String::new(),
            open,
            high,
            low,
            close,
        }
    }

    fn params() -> ScoreParams {
        ScoreParams {
            vi_length: 3,
            atr_length: 3,
            ema_length: 5,
            atr_sl_mult: 1.5,
            atr_tp1_mult: 1.0,
            atr_tp2_mult: 2.0,
            atr_tp3_mult: 3.0,
            min_strength: 0.05,
            min_atr_pct: 0.0,
            min_score: 0,
        }
    }

    /// Steady up-trend: closes above the EMA, positive vortex bias, bullish
    /// last body.
    fn bullish_series(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + 2.0 * i as f64;
                candle(base, base + 3.0, base - 1.0, base + 2.0)
            })
            .collect()
    }

    fn bearish_series(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 200.0 - 2.0 * i as f64;
                candle(base, base + 1.0, base - 3.0, base - 2.0)
            })
            .collect()
    }

    #[test]
    fn bullish_series_passes_all_gates() {
        let outcome = score_signal(&bullish_series(20), None, &params()).unwrap();
        assert_eq!(outcome.signal, Signal::Buy);
        assert_eq!(outcome.side, TradeSide::Buy);
        assert!(outcome.vi_plus > outcome.vi_minus);
        assert!(outcome.score >= 70);
    }

    #[test]
    fn bearish_series_signals_sell() {
        let outcome = score_signal(&bearish_series(20), None, &params()).unwrap();
        assert_eq!(outcome.signal, Signal::Sell);
        assert_eq!(outcome.side, TradeSide::Sell);
    }

    #[test]
    fn buy_plan_orders_levels_around_the_entry() {
        let outcome = score_signal(&bullish_series(20), None, &params()).unwrap();
        let plan = outcome.plan;
        assert!(plan.stop_loss < plan.entry);
        assert!(plan.entry < plan.take_profit1);
        assert!(plan.take_profit1 < plan.take_profit2);
        assert!(plan.take_profit2 < plan.take_profit3);
    }

    #[test]
    fn sell_plan_mirrors_the_levels() {
        let outcome = score_signal(&bearish_series(20), None, &params()).unwrap();
        let plan = outcome.plan;
        assert!(plan.stop_loss > plan.entry);
        assert!(plan.entry > plan.take_profit1);
        assert!(plan.take_profit1 > plan.take_profit2);
        assert!(plan.take_profit2 > plan.take_profit3);
    }

    #[test]
    fn weak_strength_waits_even_with_a_perfect_score_setup() {
        let mut p = params();
        p.min_strength = 100.0; // unreachable
        let outcome = score_signal(&bullish_series(20), None, &p).unwrap();
        assert_eq!(outcome.signal, Signal::Wait);
    }

    #[test]
    fn opposing_higher_timeframe_forces_wait() {
        let outcome =
            score_signal(&bullish_series(20), Some(&bearish_series(20)), &params()).unwrap();
        assert_eq!(outcome.signal, Signal::Wait);
    }

    #[test]
    fn matching_higher_timeframe_confirms() {
        let outcome =
            score_signal(&bullish_series(20), Some(&bullish_series(20)), &params()).unwrap();
        assert_eq!(outcome.signal, Signal::Buy);
    }

    #[test]
    fn volatility_gate_forces_wait() {
        let mut p = params();
        p.min_atr_pct = 10.0; // ATR would have to be 10x the price
        let outcome = score_signal(&bullish_series(20), None, &p).unwrap();
        assert_eq!(outcome.signal, Signal::Wait);
    }

    #[test]
    fn min_score_gate_forces_wait() {
        let mut p = params();
        p.min_score = 101;
        let outcome = score_signal(&bullish_series(20), None, &p).unwrap();
        assert_eq!(outcome.signal, Signal::Wait);
    }

    #[test]
    fn confirmation_contributes_exactly_thirty_points() {
        let with = score_signal(&bullish_series(20), Some(&bullish_series(20)), &params())
            .unwrap()
            .score;
        let without = score_signal(&bullish_series(20), Some(&bearish_series(20)), &params())
            .unwrap()
            .score;
        assert_eq!(with - without, 30);
    }

    #[test]
    fn trend_filter_contributes_exactly_twenty_five_points() {
        // Same trailing candles for vortex/ATR/body, but one series carries a
        // huge historical prefix that drags the EMA far above the last price.
        let tail = bullish_series(8);
        let mut inflated: Vec<Candle> = (0..8)
            .map(|_| candle(100_000.0, 100_001.0, 99_999.0, 100_000.0))
            .collect();
        inflated.extend(tail.clone());

        let mut p = params();
        p.ema_length = 16; // spans the inflated prefix
        let trending = {
            let mut series = bullish_series(8);
            let mut prefix: Vec<Candle> = (0..8).map(|_| candle(1.0, 2.0, 0.5, 1.0)).collect();
            prefix.extend(series.drain(..));
            prefix
        };

        let up = score_signal(&trending, None, &p).unwrap();
        let down = score_signal(&inflated, None, &p).unwrap();
        assert!(up.score - down.score == 25);
    }

    #[test]
    fn strength_band_steps_from_zero_to_ten_to_twenty() {
        let series = bullish_series(20);
        let strength = score_signal(&series, None, &params()).unwrap().strength;

        let score_at = |min_strength: f64| {
            let mut p = params();
            p.min_strength = min_strength;
            score_signal(&series, None, &p).unwrap().score
        };

        let full_band = score_at(strength - 0.2);
        let half_band = score_at(strength - 0.05);
        let below = score_at(strength + 0.01);
        assert_eq!(full_band - half_band, 10);
        assert_eq!(half_band - below, 10);
    }

    #[test]
    fn volatility_contributes_exactly_fifteen_points() {
        let series = bullish_series(20);
        let passing = score_signal(&series, None, &params()).unwrap().score;
        let mut p = params();
        p.min_atr_pct = 10.0;
        let failing = score_signal(&series, None, &p).unwrap().score;
        assert_eq!(passing - failing, 15);
    }

    #[test]
    fn candle_body_contributes_exactly_ten_points() {
        let mut agreeing = bullish_series(20);
        let mut opposing = agreeing.clone();
        // Flip only the last open: the body direction is the sole input that
        // reads it.
        let last = opposing.len() - 1;
        opposing[last].open = opposing[last].close + 1.0;
        agreeing[last].open = agreeing[last].close - 1.0;

        let a = score_signal(&agreeing, None, &params()).unwrap().score;
        let b = score_signal(&opposing, None, &params()).unwrap().score;
        assert_eq!(a - b, 10);
    }

    #[test]
    fn short_series_reports_insufficient_data() {
        let err = score_signal(&bullish_series(3), None, &params()).unwrap_err();
        assert!(matches!(err, IndicatorError::InsufficientData { .. }));
    }
}
