//! Trend Estimator
//!
//! Fits an ordinary least-squares line through the most recent points of a
//! cutoff-date series and projects it month by month into the future.
//!
//! Points are `(x, y)` pairs of epoch milliseconds: x is the bulletin month,
//! y the cutoff date published in it.

use crate::calendar::{add_months, from_millis, to_millis};
use crate::selection::Lookback;
use serde::Serialize;

/// How far a projection reaches past the last real point
pub const PROJECTION_MONTHS: u32 = 60;

/// Fitted line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub n_observations: usize,
}

impl TrendLine {
    /// Least-squares fit. `None` for fewer than two points, identical x
    /// values, or any non-finite result.
    pub fn fit(points: &[(f64, f64)]) -> Option<TrendLine> {
        if points.len() < 2 {
            return None;
        }

        // Shifting the origin to the first point leaves the slope unchanged
        // and keeps the sums small enough for f64.
        let (x0, y0) = points[0];
        let n = points.len() as f64;

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_xy = 0.0;
        for &(x, y) in points {
            let dx = x - x0;
            let dy = y - y0;
            sum_x += dx;
            sum_y += dy;
            sum_xx += dx * dx;
            sum_xy += dx * dy;
        }

        let denominator = n * sum_xx - sum_x * sum_x;
        if denominator == 0.0 || !denominator.is_finite() {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let shifted_intercept = (sum_y - slope * sum_x) / n;
        let intercept = y0 + shifted_intercept - slope * x0;

        if !slope.is_finite() || !intercept.is_finite() {
            return None;
        }

        Some(TrendLine {
            slope,
            intercept,
            n_observations: points.len(),
        })
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Project `points` forward using a line fitted over the lookback window.
///
/// Returns one point per month for `PROJECTION_MONTHS` months after the last
/// real point, anchored on that point so the projection continues the
/// series without a jump. `None` when no usable fit exists.
pub fn estimate(points: &[(f64, f64)], lookback: Lookback) -> Option<Vec<(f64, f64)>> {
    let window_start = points.len().saturating_sub(lookback.points());
    let window = &points[window_start..];
    let trend = TrendLine::fit(window)?;

    let &(last_x, last_y) = window.last()?;
    let last_month = from_millis(last_x)?;

    let mut projected = Vec::with_capacity(PROJECTION_MONTHS as usize);
    for offset in 1..=PROJECTION_MONTHS {
        let Some(month) = add_months(last_month, offset) else {
            break;
        };
        let x = to_millis(month);
        let y = last_y + trend.slope * (x - last_x);
        projected.push((x, y));
    }

    tracing::debug!(
        slope = trend.slope,
        observations = trend.n_observations,
        projected = projected.len(),
        "Estimated cutoff trend"
    );

    Some(projected)
}
