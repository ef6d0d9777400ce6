use serde::{Deserialize, Serialize};

use super::Model;
use crate::quantile::hazen_quantile;

/// Probabilities are clamped away from 0 and 1 before taking logarithms.
const PROB_EPSILON: f64 = 1e-300;

/// Goodness-of-fit statistics of a fitted distribution against a sample.
///
/// The three EDF statistics follow the usual definitions on the sorted
/// sample `x(1) <= ... <= x(n)` with `F_i = F(x(i))`:
///
/// - Kolmogorov-Smirnov `D = max_i max(i/n - F_i, F_i - (i-1)/n)`
/// - Cramér-von Mises `W² = 1/(12n) + Σ (F_i - (2i-1)/(2n))²`
/// - Anderson-Darling `A² = -n - (1/n) Σ (2i-1) (ln F_i + ln(1 - F_(n+1-i)))`
///
/// The quantile errors compare empirical and fitted percentiles P1..P99,
/// relative to the empirical value, summarizing how well the fit tracks a
/// Q-Q plot across the whole range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    pub kolmogorov_smirnov: f64,
    pub cramer_von_mises: f64,
    pub anderson_darling: f64,
    pub mean_quantile_error: f64,
    pub max_quantile_error: f64,
}

impl GoodnessOfFit {
    pub(crate) fn undefined() -> Self {
        Self {
            kolmogorov_smirnov: f64::NAN,
            cramer_von_mises: f64::NAN,
            anderson_darling: f64::NAN,
            mean_quantile_error: f64::NAN,
            max_quantile_error: f64::NAN,
        }
    }

    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn compute(model: &Model, sample: &[f64]) -> Self {
        if sample.is_empty() {
            return Self::undefined();
        }
        let mut sorted = sample.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let cdf = sorted
            .iter()
            .map(|&x| model.cdf(x).clamp(PROB_EPSILON, 1.0 - f64::EPSILON))
            .collect::<Vec<_>>();

        let mut ks: f64 = 0.0;
        let mut cvm = 1.0 / (12.0 * n);
        let mut ad = 0.0;
        for (i, &f) in cdf.iter().enumerate() {
            let rank = (i + 1) as f64;
            ks = ks.max(rank / n - f).max(f - (rank - 1.0) / n);
            cvm += (f - (2.0 * rank - 1.0) / (2.0 * n)).powi(2);
            let mirrored = cdf[cdf.len() - 1 - i];
            ad += (2.0 * rank - 1.0) * (f.ln() + (1.0 - mirrored).ln());
        }
        let ad = -n - ad / n;

        let (mean_quantile_error, max_quantile_error) = quantile_errors(model, &sorted);

        Self {
            kolmogorov_smirnov: ks,
            cramer_von_mises: cvm,
            anderson_darling: ad,
            mean_quantile_error,
            max_quantile_error,
        }
    }
}

fn quantile_errors(model: &Model, sorted: &[f64]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut max: f64 = 0.0;
    let mut count = 0;
    for percent in 1..100 {
        let p = f64::from(percent) / 100.0;
        let empirical = hazen_quantile(sorted, p);
        if empirical <= 0.0 {
            continue;
        }
        let error = ((model.inverse_cdf(p) - empirical) / empirical).abs();
        if error.is_finite() {
            sum += error;
            max = max.max(error);
            count += 1;
        }
    }
    if count == 0 {
        (f64::NAN, f64::NAN)
    } else {
        (sum / f64::from(count), max)
    }
}

#[cfg(test)]
mod tests {
    use statrs::distribution::Exp;

    use super::*;

    #[test]
    fn test_perfect_quantiles_have_small_statistics() {
        // Sample placed exactly at the Hazen positions of Exp(1)
        let n = 200;
        let sample = (1..=n)
            .map(|i| -(1.0 - (f64::from(i) - 0.5) / f64::from(n)).ln())
            .collect::<Vec<_>>();
        let model = Model::Exponential(Exp::new(1.0).unwrap());
        let gof = GoodnessOfFit::compute(&model, &sample);
        assert!(gof.kolmogorov_smirnov <= 0.5 / f64::from(n) + 1e-12);
        // W² reduces to its 1/(12n) floor
        assert!((gof.cramer_von_mises - 1.0 / (12.0 * f64::from(n))).abs() < 1e-9);
        assert!(gof.anderson_darling < 0.5);
        assert!(gof.max_quantile_error < 0.05);
    }

    #[test]
    fn test_wrong_scale_is_detected() {
        let sample = (1..=100).map(f64::from).collect::<Vec<_>>();
        let good = GoodnessOfFit::compute(&Model::Exponential(Exp::new(1.0 / 50.0).unwrap()), &sample);
        let bad = GoodnessOfFit::compute(&Model::Exponential(Exp::new(1.0).unwrap()), &sample);
        assert!(bad.kolmogorov_smirnov > good.kolmogorov_smirnov);
        assert!(bad.anderson_darling > good.anderson_darling);
        assert!(bad.mean_quantile_error > good.mean_quantile_error);
    }
}
