//! Daily OHLCV bar representation and true-range math.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct QuoteBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl QuoteBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Average true range over the trailing `window` bars at the end of `bars`.
///
/// The bar immediately before the window seeds the first previous close, so
/// `window + 1` bars are consumed. Returns `None` when the slice is too short
/// to cover the window plus its seed bar.
pub fn trailing_atr(bars: &[QuoteBar], window: usize) -> Option<f64> {
    if window == 0 || bars.len() < window + 1 {
        return None;
    }

    let tail = &bars[bars.len() - (window + 1)..];
    let mut prev_close = tail[0].close;
    let mut sum = 0.0;
    for bar in &tail[1..] {
        sum += bar.true_range(prev_close);
        prev_close = bar.close;
    }
    Some(sum / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> QuoteBar {
        QuoteBar {
            symbol: "ABX".into(),
            date: NaiveDate::from_ymd_opt(2016, 10, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 10_000,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = make_bar(3, 110.0, 90.0, 105.0);
        // high-low=20, |110-100|=10, |90-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = make_bar(3, 110.0, 90.0, 105.0);
        // |110-70|=40 dominates
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = make_bar(3, 110.0, 90.0, 105.0);
        // |90-130|=40 dominates
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trailing_atr_needs_window_plus_one_bars() {
        let bars: Vec<QuoteBar> = (1..=10)
            .map(|d| make_bar(d, 110.0, 90.0, 100.0))
            .collect();
        assert!(trailing_atr(&bars, 10).is_none());
        assert!(trailing_atr(&bars, 9).is_some());
    }

    #[test]
    fn trailing_atr_zero_window_is_none() {
        let bars = vec![make_bar(1, 110.0, 90.0, 100.0)];
        assert!(trailing_atr(&bars, 0).is_none());
    }

    #[test]
    fn trailing_atr_flat_bars() {
        // Identical bars: every true range is high-low = 20.
        let bars: Vec<QuoteBar> = (1..=11)
            .map(|d| make_bar(d, 110.0, 90.0, 100.0))
            .collect();
        let atr = trailing_atr(&bars, 10).unwrap();
        assert!((atr - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trailing_atr_uses_only_the_window_tail() {
        // A wild bar outside the window must not affect the result.
        let mut bars = vec![make_bar(1, 500.0, 10.0, 100.0)];
        bars.extend((2..=12).map(|d| make_bar(d, 110.0, 90.0, 100.0)));
        let atr = trailing_atr(&bars, 10).unwrap();
        assert!((atr - 20.0).abs() < f64::EPSILON);
    }
}
