//! Trailing arithmetic mean over a fixed number of observations.
//!
//! Lookback: window - 1 (first defined value at index window-1).
//! A window that contains a missing value has no mean.

use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    name: String,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "rolling window must be >= 1");
        Self {
            window,
            name: format!("MA{window}"),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for RollingMean {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, series: &[f64]) -> Vec<Option<f64>> {
        let mut result = vec![None; series.len()];
        if series.len() < self.window {
            return result;
        }

        for (offset, slice) in series.windows(self.window).enumerate() {
            if slice.iter().any(|v| v.is_nan()) {
                continue;
            }
            let sum: f64 = slice.iter().sum();
            result[offset + self.window - 1] = Some(sum / self.window as f64);
        }

        result
    }
}
