/// Descriptive statistics summarizing a sample of durations.
///
/// This structure contains common measures of central tendency, dispersion
/// and shape for a dataset of `f64` values. Moments are population moments
/// (divided by `n`).
#[derive(Debug, Clone)]
pub struct DescriptiveStats {
    /// Number of values in the dataset.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean of the dataset.
    pub mean: f64,
    /// The median value of the dataset.
    pub median: f64,
    /// The variance of the dataset.
    pub variance: f64,
    /// The standard deviation of the dataset.
    pub std_dev: f64,
    /// Moment skewness (`m3 / m2^1.5`), `0.0` for a constant sample.
    pub skewness: f64,
    /// Moment kurtosis (`m4 / m2^2`, not excess), `0.0` for a constant sample.
    pub kurtosis: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty or holds a NaN or infinite value
    ///
    /// # Examples
    ///
    /// ```
    /// # use edflow_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// Returns `None` for an empty slice or one with a non-finite value.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        if sorted_values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = if count % 2 == 1 {
            sorted_values[count / 2]
        } else {
            f64::midpoint(sorted_values[count / 2 - 1], sorted_values[count / 2])
        };
        let moments = CentralMoments::from_values(sorted_values, mean);
        let variance = moments.m2;
        let std_dev = variance.sqrt();
        let (skewness, kurtosis) = if variance > 0.0 {
            (
                moments.m3 / variance.powf(1.5),
                moments.m4 / (variance * variance),
            )
        } else {
            (0.0, 0.0)
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
            skewness,
            kurtosis,
        })
    }

    /// Coefficient of variation (`std_dev / mean`), `None` when the mean is zero.
    #[must_use]
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        (self.mean != 0.0).then(|| self.std_dev / self.mean)
    }
}

/// Second to fourth central moments of a sample.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CentralMoments {
    pub m2: f64,
    pub m3: f64,
    pub m4: f64,
}

impl CentralMoments {
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn from_values(values: &[f64], mean: f64) -> Self {
        let n = values.len() as f64;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for v in values {
            let d = v - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        Self {
            m2: m2 / n,
            m3: m3 / n,
            m4: m4 / n,
        }
    }
}

/// Bias-corrected sample skewness and kurtosis.
///
/// These are the estimators conventionally plotted on a Cullen-and-Frey
/// graph. Kurtosis is reported on the non-excess scale (normal = 3).
/// Returns `None` for fewer than four values or a zero-variance sample.
///
/// # Examples
///
/// ```
/// # use edflow_stats::descriptive::unbiased_shape;
/// let (skew, kurt) = unbiased_shape(&[1.0, 2.0, 3.0, 4.0, 10.0]).unwrap();
/// assert!(skew > 0.0);
/// assert!(kurt > 0.0);
/// assert!(unbiased_shape(&[2.0, 2.0, 2.0, 2.0]).is_none());
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn unbiased_shape(values: &[f64]) -> Option<(f64, f64)> {
    let count = values.len();
    if count < 4 {
        return None;
    }
    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let CentralMoments { m2, m3, m4 } = CentralMoments::from_values(values, mean);
    if m2 <= 0.0 || !m2.is_finite() {
        return None;
    }
    let skewness = (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5);
    let kurtosis =
        (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * m4 / (m2 * m2) - 3.0 * (n - 1.0)) + 3.0;
    Some((skewness, kurtosis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(DescriptiveStats::new(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_non_finite_values_have_no_stats() {
        assert!(DescriptiveStats::new([10.0, f64::NAN, 30.0, 45.0]).is_none());
        assert!(DescriptiveStats::new([10.0, f64::INFINITY]).is_none());
        assert!(DescriptiveStats::from_sorted(&[f64::NEG_INFINITY, 1.0]).is_none());
    }

    #[test]
    fn test_even_median_is_midpoint() {
        let stats = DescriptiveStats::new([4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((stats.median - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_sample_has_zero_shape() {
        let stats = DescriptiveStats::new([7.0; 5]).unwrap();
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.skewness, 0.0);
        assert_eq!(stats.kurtosis, 0.0);
        assert!((stats.coefficient_of_variation().unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_sample_has_zero_skewness() {
        let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(stats.skewness.abs() < 1e-12);
        assert!((stats.variance - 2.0).abs() < 1e-12);
        // m4 / m2^2 for 1..=5 is 6.8 / 4
        assert!((stats.kurtosis - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_unbiased_shape_requires_four_values() {
        assert!(unbiased_shape(&[1.0, 2.0, 3.0]).is_none());
        let (skew, _) = unbiased_shape(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(skew.abs() < 1e-12);
    }
}
