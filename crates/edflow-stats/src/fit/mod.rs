//! Maximum-likelihood fitting of duration distributions
//!
//! Four parametric families are supported, all with positive support:
//!
//! | Family        | Parameters                 | Estimator                              |
//! |---------------|----------------------------|----------------------------------------|
//! | `exponential` | rate                       | closed form (`1 / mean`)               |
//! | `gamma`       | shape, rate                | bracketed root of `ln k - ψ(k) = s`    |
//! | `lognormal`   | meanlog, sdlog             | closed form on `ln x`                  |
//! | `weibull`     | shape, scale               | bracketed root of the profile score    |
//!
//! Every call to [`fit`] is independent and returns a fresh [`FitResult`];
//! a failure is a [`FitError`] value for that sample and family only.
//!
//! # Examples
//!
//! ```
//! use edflow_stats::fit::{self, Family, Parameters};
//!
//! let sample = [12.0, 30.0, 45.0, 18.0, 60.0, 25.0, 90.0, 33.0];
//! let result = fit::fit(&sample, Family::Exponential).unwrap();
//! let Parameters::Exponential { rate } = result.parameters else { unreachable!() };
//! assert!((rate - 1.0 / 39.125).abs() < 1e-12);
//!
//! let gof = result.goodness_of_fit(&sample);
//! assert!(gof.kolmogorov_smirnov > 0.0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Exp, Gamma, LogNormal, Weibull};

pub use self::{
    gof::GoodnessOfFit,
    selection::{Selection, select_by_aic},
};

mod gof;
mod mle;
mod root;
mod selection;

/// Minimum number of observations accepted by [`fit`].
pub const MIN_SAMPLE_SIZE: usize = 2;

/// A candidate parametric family.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Exponential,
    Gamma,
    LogNormal,
    Weibull,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.to_str(), f)
    }
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::Exponential,
        Family::Gamma,
        Family::LogNormal,
        Family::Weibull,
    ];

    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            Family::Exponential => "exponential",
            Family::Gamma => "gamma",
            Family::LogNormal => "lognormal",
            Family::Weibull => "weibull",
        }
    }

    /// Number of free parameters, used for information criteria.
    #[must_use]
    pub fn num_params(self) -> usize {
        match self {
            Family::Exponential => 1,
            Family::Gamma | Family::LogNormal | Family::Weibull => 2,
        }
    }
}

/// Point estimates of a fitted family.
///
/// Serialized with a `family` tag so the simulation side can read one flat
/// object per cohort variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Parameters {
    Exponential { rate: f64 },
    Gamma { shape: f64, rate: f64 },
    LogNormal { meanlog: f64, sdlog: f64 },
    Weibull { shape: f64, scale: f64 },
}

impl Parameters {
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Parameters::Exponential { .. } => Family::Exponential,
            Parameters::Gamma { .. } => Family::Gamma,
            Parameters::LogNormal { .. } => Family::LogNormal,
            Parameters::Weibull { .. } => Family::Weibull,
        }
    }

    /// Mean of the fitted distribution.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match *self {
            Parameters::Exponential { rate } => 1.0 / rate,
            Parameters::Gamma { shape, rate } => shape / rate,
            Parameters::LogNormal { meanlog, sdlog } => (meanlog + sdlog * sdlog / 2.0).exp(),
            Parameters::Weibull { shape, scale } => {
                scale * statrs::function::gamma::gamma(1.0 + 1.0 / shape)
            }
        }
    }

    pub(crate) fn model(&self) -> Result<Model, FitError> {
        let family = self.family();
        let model = match *self {
            Parameters::Exponential { rate } => Exp::new(rate).ok().map(Model::Exponential),
            Parameters::Gamma { shape, rate } => Gamma::new(shape, rate).ok().map(Model::Gamma),
            Parameters::LogNormal { meanlog, sdlog } => {
                LogNormal::new(meanlog, sdlog).ok().map(Model::LogNormal)
            }
            Parameters::Weibull { shape, scale } => {
                Weibull::new(shape, scale).ok().map(Model::Weibull)
            }
        };
        model.ok_or(FitError::InvalidParameters { family })
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameters::Exponential { rate } => write!(f, "rate={rate:.6}"),
            Parameters::Gamma { shape, rate } => write!(f, "shape={shape:.4} rate={rate:.6}"),
            Parameters::LogNormal { meanlog, sdlog } => {
                write!(f, "meanlog={meanlog:.4} sdlog={sdlog:.4}")
            }
            Parameters::Weibull { shape, scale } => write!(f, "shape={shape:.4} scale={scale:.3}"),
        }
    }
}

/// A validated distribution backing a set of [`Parameters`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Model {
    Exponential(Exp),
    Gamma(Gamma),
    LogNormal(LogNormal),
    Weibull(Weibull),
}

impl Model {
    pub(crate) fn ln_pdf(&self, x: f64) -> f64 {
        match self {
            Model::Exponential(d) => d.ln_pdf(x),
            Model::Gamma(d) => d.ln_pdf(x),
            Model::LogNormal(d) => d.ln_pdf(x),
            Model::Weibull(d) => d.ln_pdf(x),
        }
    }

    pub(crate) fn cdf(&self, x: f64) -> f64 {
        match self {
            Model::Exponential(d) => d.cdf(x),
            Model::Gamma(d) => d.cdf(x),
            Model::LogNormal(d) => d.cdf(x),
            Model::Weibull(d) => d.cdf(x),
        }
    }

    pub(crate) fn inverse_cdf(&self, p: f64) -> f64 {
        match self {
            Model::Exponential(d) => d.inverse_cdf(p),
            Model::Gamma(d) => d.inverse_cdf(p),
            Model::LogNormal(d) => d.inverse_cdf(p),
            Model::Weibull(d) => d.inverse_cdf(p),
        }
    }
}

/// Outcome of a successful maximum-likelihood fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub parameters: Parameters,
    pub sample_size: usize,
    pub log_likelihood: f64,
    /// Akaike information criterion, `2k - 2 ln L`.
    pub aic: f64,
    /// Bayesian information criterion, `k ln n - 2 ln L`.
    pub bic: f64,
}

impl FitResult {
    #[must_use]
    pub fn family(&self) -> Family {
        self.parameters.family()
    }

    /// Computes goodness-of-fit statistics of this fit against `sample`.
    ///
    /// Usually `sample` is the same data the fit was estimated from.
    #[must_use]
    pub fn goodness_of_fit(&self, sample: &[f64]) -> GoodnessOfFit {
        match self.parameters.model() {
            Ok(model) => GoodnessOfFit::compute(&model, sample),
            Err(_) => GoodnessOfFit::undefined(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("sample has {count} values, at least {required} required")]
    TooFewValues { count: usize, required: usize },
    #[display("{family} requires positive values, found {value}")]
    NonPositiveValue { family: Family, value: f64 },
    #[display("sample contains a non-finite value")]
    NonFiniteValue,
    #[display("sample has zero spread, {family} is degenerate")]
    DegenerateSample { family: Family },
    #[display("{family} likelihood equation has no root in the search range")]
    NotBracketed { family: Family },
    #[display("{family} root search did not converge after {iterations} iterations")]
    NotConverged { family: Family, iterations: usize },
    #[display("{family} estimates are outside the valid parameter space")]
    InvalidParameters { family: Family },
}

/// Fits `family` to `sample` by maximum likelihood.
///
/// The sample does not need to be sorted.
pub fn fit(sample: &[f64], family: Family) -> Result<FitResult, FitError> {
    validate_sample(sample, family)?;
    let parameters = match family {
        Family::Exponential => mle::exponential(sample)?,
        Family::Gamma => mle::gamma(sample)?,
        Family::LogNormal => mle::lognormal(sample)?,
        Family::Weibull => mle::weibull(sample)?,
    };
    let model = parameters.model()?;
    let log_likelihood = sample.iter().map(|&x| model.ln_pdf(x)).sum::<f64>();
    if !log_likelihood.is_finite() {
        return Err(FitError::InvalidParameters { family });
    }

    #[expect(clippy::cast_precision_loss)]
    let (k, n) = (family.num_params() as f64, sample.len() as f64);
    Ok(FitResult {
        parameters,
        sample_size: sample.len(),
        log_likelihood,
        aic: 2.0 * k - 2.0 * log_likelihood,
        bic: k * n.ln() - 2.0 * log_likelihood,
    })
}

fn validate_sample(sample: &[f64], family: Family) -> Result<(), FitError> {
    if sample.len() < MIN_SAMPLE_SIZE {
        return Err(FitError::TooFewValues {
            count: sample.len(),
            required: MIN_SAMPLE_SIZE,
        });
    }
    if sample.iter().any(|x| !x.is_finite()) {
        return Err(FitError::NonFiniteValue);
    }
    let allows_zero = family == Family::Exponential;
    if let Some(&value) = sample
        .iter()
        .find(|&&x| x < 0.0 || (x == 0.0 && !allows_zero))
    {
        return Err(FitError::NonPositiveValue { family, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_distr::Distribution;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn draw<D>(dist: &D, n: usize, seed: u64) -> Vec<f64>
    where
        D: Distribution<f64>,
    {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
        assert!(
            ((actual - expected) / expected).abs() <= rel_tol,
            "{actual} not within {rel_tol} of {expected}"
        );
    }

    #[test]
    fn test_gamma_recovers_shape_and_rate() {
        // rand_distr parameterizes gamma by scale = 1 / rate
        let dist = rand_distr::Gamma::new(2.0, 2.0).unwrap();
        let sample = draw(&dist, 10_000, 7);
        let result = fit(&sample, Family::Gamma).unwrap();
        let Parameters::Gamma { shape, rate } = result.parameters else {
            panic!("unexpected parameters {:?}", result.parameters);
        };
        assert_close(shape, 2.0, 0.10);
        assert_close(rate, 0.5, 0.10);
    }

    #[test]
    fn test_exponential_recovers_rate() {
        let dist = rand_distr::Exp::new(1.0 / 300.0).unwrap();
        let sample = draw(&dist, 10_000, 11);
        let result = fit(&sample, Family::Exponential).unwrap();
        let Parameters::Exponential { rate } = result.parameters else {
            panic!("unexpected parameters {:?}", result.parameters);
        };
        assert_close(rate, 1.0 / 300.0, 0.10);
    }

    #[test]
    fn test_lognormal_recovers_location_and_scale() {
        let dist = rand_distr::LogNormal::new(6.0, 0.8).unwrap();
        let sample = draw(&dist, 10_000, 13);
        let result = fit(&sample, Family::LogNormal).unwrap();
        let Parameters::LogNormal { meanlog, sdlog } = result.parameters else {
            panic!("unexpected parameters {:?}", result.parameters);
        };
        assert_close(meanlog, 6.0, 0.10);
        assert_close(sdlog, 0.8, 0.10);
    }

    #[test]
    fn test_weibull_recovers_shape_and_scale() {
        // rand_distr::Weibull::new takes (scale, shape)
        let dist = rand_distr::Weibull::new(1200.0, 1.5).unwrap();
        let sample = draw(&dist, 10_000, 17);
        let result = fit(&sample, Family::Weibull).unwrap();
        let Parameters::Weibull { shape, scale } = result.parameters else {
            panic!("unexpected parameters {:?}", result.parameters);
        };
        assert_close(shape, 1.5, 0.10);
        assert_close(scale, 1200.0, 0.10);
    }

    #[test]
    fn test_matching_family_has_lowest_aic() {
        let dist = rand_distr::Gamma::new(2.0, 2.0).unwrap();
        let sample = draw(&dist, 5_000, 19);
        let gamma = fit(&sample, Family::Gamma).unwrap();
        let exponential = fit(&sample, Family::Exponential).unwrap();
        assert!(gamma.aic < exponential.aic);
    }

    #[test]
    fn test_rejects_small_and_invalid_samples() {
        assert_eq!(
            fit(&[1.0], Family::Gamma).unwrap_err(),
            FitError::TooFewValues {
                count: 1,
                required: MIN_SAMPLE_SIZE
            }
        );
        assert!(matches!(
            fit(&[1.0, 0.0, 2.0], Family::Weibull),
            Err(FitError::NonPositiveValue { .. })
        ));
        assert!(fit(&[1.0, 0.0, 2.0], Family::Exponential).is_ok());
        assert_eq!(
            fit(&[1.0, f64::NAN], Family::LogNormal).unwrap_err(),
            FitError::NonFiniteValue
        );
    }

    #[test]
    fn test_constant_sample_is_degenerate() {
        let sample = [42.0; 20];
        for family in [Family::Gamma, Family::LogNormal, Family::Weibull] {
            assert_eq!(
                fit(&sample, family).unwrap_err(),
                FitError::DegenerateSample { family }
            );
        }
        // exponential only needs a positive mean
        assert!(fit(&sample, Family::Exponential).is_ok());
    }

    #[test]
    fn test_family_parses_from_config_names() {
        for family in Family::ALL {
            assert_eq!(family.to_str().parse::<Family>().unwrap(), family);
        }
    }

    #[test]
    fn test_goodness_of_fit_is_finite() {
        let dist = rand_distr::LogNormal::new(5.0, 0.5).unwrap();
        let sample = draw(&dist, 2_000, 23);
        let result = fit(&sample, Family::LogNormal).unwrap();
        let gof = result.goodness_of_fit(&sample);
        assert!(gof.kolmogorov_smirnov.is_finite() && gof.kolmogorov_smirnov < 0.05);
        assert!(gof.cramer_von_mises.is_finite());
        assert!(gof.anderson_darling.is_finite());
        assert!(gof.max_quantile_error < 0.25);
    }
}
