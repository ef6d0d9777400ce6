//! Maximum-likelihood estimators per family
//!
//! Samples reaching these functions are already validated: at least
//! [`MIN_SAMPLE_SIZE`](super::MIN_SAMPLE_SIZE) finite values, positive
//! where the family requires it.

use statrs::function::gamma::digamma;

use super::{
    Family, FitError, Parameters,
    root::{self, RootError},
};

/// `pi / sqrt(6)`, the standard deviation of a standard Gumbel variable.
const GUMBEL_STD_DEV: f64 = 1.282_549_830_161_864;

#[expect(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    values.sum::<f64>() / n as f64
}

fn log_stats(sample: &[f64]) -> (Vec<f64>, f64, f64) {
    let logs = sample.iter().map(|x| x.ln()).collect::<Vec<_>>();
    let mean_ln = mean(logs.iter().copied(), logs.len());
    let var_ln = mean(logs.iter().map(|l| (l - mean_ln).powi(2)), logs.len());
    (logs, mean_ln, var_ln.sqrt())
}

fn is_degenerate_spread(spread: f64, location: f64) -> bool {
    spread.is_nan() || spread <= f64::EPSILON * location.abs().max(1.0)
}

fn positive(family: Family, values: &[f64]) -> Result<(), FitError> {
    if values.iter().all(|v| v.is_finite() && *v > 0.0) {
        Ok(())
    } else {
        Err(FitError::InvalidParameters { family })
    }
}

fn root_error(family: Family) -> impl Fn(RootError) -> FitError {
    move |err| match err {
        RootError::NotBracketed => FitError::NotBracketed { family },
        RootError::NotConverged { iterations } => FitError::NotConverged { family, iterations },
    }
}

pub(super) fn exponential(sample: &[f64]) -> Result<Parameters, FitError> {
    let family = Family::Exponential;
    let mean = mean(sample.iter().copied(), sample.len());
    if mean <= 0.0 {
        return Err(FitError::DegenerateSample { family });
    }
    let rate = 1.0 / mean;
    positive(family, &[rate])?;
    Ok(Parameters::Exponential { rate })
}

pub(super) fn gamma(sample: &[f64]) -> Result<Parameters, FitError> {
    let family = Family::Gamma;
    let mean = mean(sample.iter().copied(), sample.len());
    let (_, mean_ln, _) = log_stats(sample);
    // s >= 0 by Jensen's inequality, zero only for a constant sample
    let s = mean.ln() - mean_ln;
    if s.is_nan() || s <= 1e-12 {
        return Err(FitError::DegenerateSample { family });
    }

    // Closed-form approximation (Minka) as the starting point
    let initial = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
    let shape = root::solve_positive(initial, |k| k.ln() - digamma(k) - s)
        .map_err(root_error(family))?;
    let rate = shape / mean;
    positive(family, &[shape, rate])?;
    Ok(Parameters::Gamma { shape, rate })
}

pub(super) fn lognormal(sample: &[f64]) -> Result<Parameters, FitError> {
    let family = Family::LogNormal;
    let (_, meanlog, sdlog) = log_stats(sample);
    if is_degenerate_spread(sdlog, meanlog) {
        return Err(FitError::DegenerateSample { family });
    }
    positive(family, &[sdlog])?;
    Ok(Parameters::LogNormal { meanlog, sdlog })
}

pub(super) fn weibull(sample: &[f64]) -> Result<Parameters, FitError> {
    let family = Family::Weibull;
    let (logs, mean_ln, sd_ln) = log_stats(sample);
    if is_degenerate_spread(sd_ln, mean_ln) {
        return Err(FitError::DegenerateSample { family });
    }

    // Work on x / max(x) so that x^k never overflows; the score is invariant.
    let max_ln = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let scaled = logs.iter().map(|l| l - max_ln).collect::<Vec<_>>();
    let mean_scaled = mean_ln - max_ln;
    let score = |k: f64| {
        let (mut weight_sum, mut weighted_ln) = (0.0, 0.0);
        for &l in &scaled {
            let w = (k * l).exp();
            weight_sum += w;
            weighted_ln += w * l;
        }
        weighted_ln / weight_sum - 1.0 / k - mean_scaled
    };

    let shape = root::solve_positive(GUMBEL_STD_DEV / sd_ln, score).map_err(root_error(family))?;
    let power_mean = mean(scaled.iter().map(|l| (shape * l).exp()), scaled.len());
    let scale = max_ln.exp() * power_mean.powf(1.0 / shape);
    positive(family, &[shape, scale])?;
    Ok(Parameters::Weibull { shape, scale })
}
