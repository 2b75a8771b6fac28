//! Implied and realized volatility measures.
//!
//! - IV rank: position of current IV within the historical min/max range
//! - IV percentile: share of historical observations below current IV
//! - Realized volatility: close-to-close and Garman-Klass estimators
//!
//! All outputs are annualized with 252 trading days where applicable.

use crate::data::UnderlyingBar;

/// Trading days per year.
pub const TRADING_DAYS: f64 = 252.0;

/// Neutral rank/percentile when no history is available.
const NEUTRAL: f64 = 50.0;

/// IV rank (0-100). Neutral 50 when history is empty or flat.
pub fn iv_rank(current_iv: f64, history: &[f64]) -> f64 {
    if history.is_empty() {
        return NEUTRAL;
    }

    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return NEUTRAL;
    }

    ((current_iv - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}

/// IV percentile (0-100): share of history strictly below `current_iv`.
pub fn iv_percentile(current_iv: f64, history: &[f64]) -> f64 {
    if history.is_empty() {
        return NEUTRAL;
    }

    let count_below = history.iter().filter(|&&iv| iv < current_iv).count();
    count_below as f64 / history.len() as f64 * 100.0
}

/// Rolling window of historical implied volatility.
#[derive(Debug, Clone)]
pub struct IvHistory {
    values: Vec<f64>,
    max_len: usize,
}

impl Default for IvHistory {
    fn default() -> Self {
        Self::with_capacity(TRADING_DAYS as usize)
    }
}

impl IvHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_len: usize) -> Self {
        Self {
            values: Vec::with_capacity(max_len),
            max_len: max_len.max(1),
        }
    }

    /// Build from a series, keeping the most recent observations.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut history = Self::default();
        for v in values {
            history.push(v);
        }
        history
    }

    pub fn push(&mut self, iv: f64) {
        self.values.push(iv);
        if self.values.len() > self.max_len {
            self.values.remove(0);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rank(&self, current_iv: f64) -> f64 {
        iv_rank(current_iv, &self.values)
    }

    pub fn percentile(&self, current_iv: f64) -> f64 {
        iv_percentile(current_iv, &self.values)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .map(|iv| (iv - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        Some(variance.sqrt())
    }

    /// Standard deviations from the historical mean; needs 20 observations.
    pub fn zscore(&self, current_iv: f64) -> Option<f64> {
        if self.values.len() < 20 {
            return None;
        }
        let std = self.std_dev()?;
        if std == 0.0 {
            return None;
        }
        Some((current_iv - self.mean()?) / std)
    }
}

/// Close-to-close realized volatility (population std of log returns).
pub fn realized_vol_close_to_close(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }

    let log_returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect();

    if log_returns.is_empty() {
        return 0.0;
    }

    let n = log_returns.len() as f64;
    let mean = log_returns.iter().sum::<f64>() / n;
    let variance = log_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

    variance.sqrt() * TRADING_DAYS.sqrt()
}

/// Garman-Klass realized volatility from OHLC bars.
pub fn realized_vol_garman_klass(bars: &[UnderlyingBar]) -> f64 {
    let k = 2.0 * std::f64::consts::LN_2 - 1.0;

    let daily: Vec<f64> = bars
        .iter()
        .filter_map(|bar| {
            let open: f64 = bar.open.try_into().unwrap_or(0.0);
            let high: f64 = bar.high.try_into().unwrap_or(0.0);
            let low: f64 = bar.low.try_into().unwrap_or(0.0);
            let close: f64 = bar.close.try_into().unwrap_or(0.0);
            if open <= 0.0 || high <= 0.0 || low <= 0.0 || close <= 0.0 || high < low {
                return None;
            }
            Some(0.5 * (high / low).ln().powi(2) - k * (close / open).ln().powi(2))
        })
        .collect();

    if daily.is_empty() {
        return 0.0;
    }

    let avg = daily.iter().sum::<f64>() / daily.len() as f64;
    avg.max(0.0).sqrt() * TRADING_DAYS.sqrt()
}

/// Best available realized volatility: Garman-Klass when bars are present,
/// otherwise close-to-close, otherwise 0.
pub fn realized_volatility(closes: &[f64], bars: &[UnderlyingBar]) -> f64 {
    if !bars.is_empty() {
        realized_vol_garman_klass(bars)
    } else if !closes.is_empty() {
        realized_vol_close_to_close(closes)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_iv_rank() {
        let history = vec![0.10, 0.20, 0.30];
        assert!((iv_rank(0.20, &history) - 50.0).abs() < 1e-9);
        assert_eq!(iv_rank(0.50, &history), 100.0);
        assert_eq!(iv_rank(0.05, &history), 0.0);
        assert_eq!(iv_rank(0.20, &[]), 50.0);
        assert_eq!(iv_rank(0.20, &[0.2, 0.2]), 50.0);
    }

    #[test]
    fn test_iv_percentile() {
        let history: Vec<f64> = (0..100).map(|i| 0.10 + 0.01 * i as f64).collect();
        let pct = iv_percentile(0.60, &history);
        assert!((pct - 50.0).abs() < 1.0);
        assert_eq!(iv_percentile(0.20, &[]), 50.0);
    }

    #[test]
    fn test_history_rolls() {
        let mut history = IvHistory::with_capacity(3);
        for iv in [0.1, 0.2, 0.3, 0.4] {
            history.push(iv);
        }
        assert_eq!(history.values(), &[0.2, 0.3, 0.4]);
        assert!((history.mean().unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_history_rank_after_wraparound() {
        let mut history = IvHistory::with_capacity(3);
        for iv in [0.1, 0.2, 0.3, 0.4, 0.5] {
            history.push(iv);
        }
        assert!((history.rank(0.4) - 50.0).abs() < 1e-9);
        assert!((history.percentile(0.45) - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zscore_needs_history() {
        let short = IvHistory::from_values(vec![0.2; 5]);
        assert!(short.zscore(0.3).is_none());

        let history = IvHistory::from_values((0..100).map(|i| 0.18 + 0.0004 * i as f64));
        assert!(history.zscore(0.24).unwrap() > 0.0);
    }

    #[test]
    fn test_close_to_close() {
        assert_eq!(realized_vol_close_to_close(&[100.0]), 0.0);
        // Constant growth: zero variance.
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        assert!(realized_vol_close_to_close(&closes) < 1e-9);

        let choppy = vec![100.0, 102.0, 99.0, 101.0, 98.0];
        assert!(realized_vol_close_to_close(&choppy) > 0.0);
    }

    #[test]
    fn test_garman_klass_preferred() {
        let bars = vec![UnderlyingBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: dec!(100),
            high: dec!(102),
            low: dec!(99),
            close: dec!(101),
        }];
        let gk = realized_vol_garman_klass(&bars);
        assert!(gk > 0.0);
        assert_eq!(realized_volatility(&[100.0, 120.0], &bars), gk);
        assert_eq!(realized_volatility(&[], &[]), 0.0);
    }
}
