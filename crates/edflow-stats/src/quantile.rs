//! Empirical quantiles
//!
//! A single definition is used throughout the crate: the i-th order
//! statistic of `n` values sits at probability `(i - 0.5) / n` (the Hazen
//! plotting position) and values in between are interpolated linearly.
//! Probabilities below the first position or above the last one clamp to the
//! sample minimum or maximum.

/// A sorted copy of a sample, answering quantile queries.
///
/// # Examples
///
/// ```
/// use edflow_stats::quantile::Quantiles;
///
/// let quantiles = Quantiles::new(&[40.0, 10.0, 30.0, 20.0]).unwrap();
/// assert_eq!(quantiles.median(), 25.0);
/// assert_eq!(quantiles.percentile(5.0), 10.0);
/// assert_eq!(quantiles.percentile(95.0), 40.0);
/// ```
#[derive(Debug, Clone)]
pub struct Quantiles {
    sorted: Vec<f64>,
}

impl Quantiles {
    /// Returns `None` for an empty sample or one with a non-finite value.
    #[must_use]
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self { sorted })
    }

    /// Quantile at probability `p` in `[0, 1]`.
    #[must_use]
    pub fn quantile(&self, p: f64) -> f64 {
        hazen_quantile(&self.sorted, p)
    }

    /// Quantile at `point` percent.
    #[must_use]
    pub fn percentile(&self, point: f64) -> f64 {
        self.quantile(point / 100.0)
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// `(point, value)` pairs for each of `points`, in percent.
    pub fn percentiles<'a>(&'a self, points: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
        points.iter().map(|&point| (point, self.percentile(point)))
    }

    #[must_use]
    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }
}

/// Interpolated quantile of a non-empty sorted sample.
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
pub(crate) fn hazen_quantile(sorted: &[f64], p: f64) -> f64 {
    let len = sorted.len();
    let h = p * len as f64 + 0.5;
    if h <= 1.0 {
        return sorted[0];
    }
    if h >= len as f64 {
        return sorted[len - 1];
    }
    let lower = h.floor() as usize;
    let frac = h - h.floor();
    sorted[lower - 1] + frac * (sorted[lower] - sorted[lower - 1])
}
