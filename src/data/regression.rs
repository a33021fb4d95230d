use log::debug;
use serde::Serialize;

use super::filter::{slice, DateInterval};
use super::model::NormalizedTable;
use crate::error::{EngineError, Result};

/// Ordinary-least-squares line through the (x, y) pairs of two columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionFit {
    /// Pairs actually used: both values numeric, table order.
    pub points: Vec<(f64, f64)>,
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
}

impl RegressionFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// End points of the fitted line across the observed x range.
    pub fn trend_line(&self) -> [(f64, f64); 2] {
        let (lo, hi) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
                (lo.min(x), hi.max(x))
            });
        [(lo, self.predict(lo)), (hi, self.predict(hi))]
    }
}

/// Fit `y_id` against `x_id`, dropping rows where either is not numeric.
pub fn fit(table: &NormalizedTable, x_id: &str, y_id: &str) -> Result<RegressionFit> {
    let xs = table.require(x_id)?;
    let ys = table.require(y_id)?;

    let points: Vec<(f64, f64)> = xs
        .cells
        .iter()
        .zip(&ys.cells)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    debug!(
        "regression {y_id} ~ {x_id}: {} of {} row(s) usable",
        points.len(),
        table.len()
    );

    let (slope, intercept, r_squared) = ols(&points)?;
    Ok(RegressionFit {
        points,
        slope,
        intercept,
        r_squared,
    })
}

/// Closed-form simple linear regression: `(slope, intercept, r²)`.
pub fn ols(points: &[(f64, f64)]) -> Result<(f64, f64, f64)> {
    if points.len() < 2 {
        return Err(EngineError::InsufficientData {
            retained: points.len(),
        });
    }

    let x0 = points[0].0;
    if points.iter().all(|p| p.0 == x0) {
        return Err(EngineError::DegenerateRegression(x0));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = points
        .iter()
        .map(|&(x, y)| {
            let r = y - (intercept + slope * x);
            r * r
        })
        .sum();
    // Constant y: the flat fitted line reproduces every point.
    let r_squared = if syy == 0.0 { 1.0 } else { 1.0 - ss_res / syy };

    Ok((slope, intercept, r_squared))
}

// ---------------------------------------------------------------------------
// RegressionQuery
// ---------------------------------------------------------------------------

/// Y-vs-X request over a date range; the two columns must differ.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionQuery {
    pub interval: DateInterval,
    x: String,
    y: String,
}

impl RegressionQuery {
    pub fn new(interval: DateInterval, x: impl Into<String>, y: impl Into<String>) -> Result<Self> {
        let (x, y) = (x.into(), y.into());
        if x == y {
            return Err(EngineError::InvalidQuery(format!(
                "regression needs two distinct columns, got '{x}' twice"
            )));
        }
        Ok(Self { interval, x, y })
    }

    pub fn x(&self) -> &str {
        &self.x
    }

    pub fn y(&self) -> &str {
        &self.y
    }

    pub fn run(&self, table: &NormalizedTable) -> Result<RegressionFit> {
        fit(&slice(table, &self.interval)?, &self.x, &self.y)
    }
}
