// src/indicators.rs - True Range / ATR / Vortex / EMA over candle sequences
//
// All functions are pure. Sequences are oldest-first; ATR and Vortex need
// `length + 1` candles because they work on pairwise steps, EMA needs
// `length` values.

use crate::errors::IndicatorError;
use crate::types::Candle;

/// True range of one candle against the previous close.
pub fn true_range(curr: &Candle, prev_close: f64) -> f64 {
    let high_low = curr.high - curr.low;
    let high_close = (curr.high - prev_close).abs();
    let low_close = (curr.low - prev_close).abs();
    high_low.max(high_close).max(low_close)
}

/// Mean of the last `length` true-range values.
pub fn average_true_range(candles: &[Candle], length: usize) -> Result<f64, IndicatorError> {
    if candles.len() < length + 1 {
        return Err(IndicatorError::InsufficientData {
            needed: length + 1,
            got: candles.len(),
        });
    }

    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .collect();

    let window = &ranges[ranges.len() - length..];
    Ok(window.iter().sum::<f64>() / window.len() as f64)
}

/// Vortex pair (VI+, VI-) over the trailing `length` pairwise steps.
pub fn vortex(candles: &[Candle], length: usize) -> Result<(f64, f64), IndicatorError> {
    if candles.len() < length + 1 {
        return Err(IndicatorError::InsufficientData {
            needed: length + 1,
            got: candles.len(),
        });
    }

    let mut vm_plus = Vec::with_capacity(candles.len() - 1);
    let mut vm_minus = Vec::with_capacity(candles.len() - 1);
    let mut ranges = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let prev = &pair[0];
        let curr = &pair[1];
        vm_plus.push((curr.high - prev.low).abs());
        vm_minus.push((curr.low - prev.high).abs());
        ranges.push(true_range(curr, prev.close));
    }

    let sum_vm_plus: f64 = vm_plus[vm_plus.len() - length..].iter().sum();
    let sum_vm_minus: f64 = vm_minus[vm_minus.len() - length..].iter().sum();
    let mut sum_tr: f64 = ranges[ranges.len() - length..].iter().sum();

    // Flat windows would divide by zero.
    if sum_tr == 0.0 {
        sum_tr = 1e-9;
    }

    Ok((sum_vm_plus / sum_tr, sum_vm_minus / sum_tr))
}

/// EMA over the trailing `length` values, seeded with the first value of that
/// window, smoothing constant `k = 2 / (length + 1)`.
pub fn exponential_moving_average(values: &[f64], length: usize) -> Result<f64, IndicatorError> {
    if values.len() < length {
        return Err(IndicatorError::InsufficientData {
            needed: length,
            got: values.len(),
        });
    }

    let window = &values[values.len() - length..];
    let k = 2.0 / (length as f64 + 1.0);
    let mut ema = window[0];
    for value in &window[1..] {
        ema = value * k + ema * (1.0 - k);
    }
    Ok(ema)
}

/// ATR as a fraction of price, `0` for a zero price.
pub fn atr_percent(atr: f64, price: f64) -> f64 {
    if price == 0.0 {
        0.0
    } else {
        atr / price
    }
}
