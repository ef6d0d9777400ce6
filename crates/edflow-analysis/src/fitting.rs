//! Per-cohort distribution fitting
//!
//! Every (cohort, duration) pair and the inter-arrival sample form an
//! independent unit. For each unit the Cullen-and-Frey diagnostic optionally
//! narrows the configured families, each remaining family is fitted by
//! maximum likelihood, and the lowest-AIC fit is selected. A family that
//! fails to fit is recorded and the unit carries on with the others.

use std::{collections::BTreeMap, fmt};

use edflow_stats::{
    cullen_frey::CullenFrey,
    descriptive::DescriptiveStats,
    fit::{self, Family, FitError, FitResult, GoodnessOfFit, Parameters, Selection},
};
use serde::{Deserialize, Serialize};

use crate::{segment::Segmentation, visit::DurationKind};

/// Cohort name under which the inter-arrival sample is reported.
pub const ARRIVALS_COHORT: &str = "arrivals";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Families tried for every sample, in report order.
    pub families: Vec<Family>,
    /// Only fit the families the Cullen-and-Frey diagnostic keeps.
    pub narrow_with_cullen_frey: bool,
    /// Minimum distance on the (β1, β2) plane within which a family is kept.
    pub cullen_frey_tolerance: f64,
    pub bootstrap_samples: usize,
    pub seed: u64,
    /// Families within this AIC difference of the best are reported as
    /// contenders.
    pub aic_margin: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            families: Family::ALL.to_vec(),
            narrow_with_cullen_frey: true,
            cullen_frey_tolerance: 0.5,
            bootstrap_samples: 500,
            seed: 0x5eed,
            aic_margin: 2.0,
        }
    }
}

/// What a sample measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    Duration(DurationKind),
    InterArrival,
    /// A sample read from a file outside the pipeline.
    External,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Duration(kind) => fmt::Display::fmt(kind, f),
            Variable::InterArrival => f.write_str("inter_arrival"),
            Variable::External => f.write_str("sample"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FamilyFit {
    pub result: FitResult,
    pub goodness: GoodnessOfFit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitFailure {
    pub family: Family,
    pub error: FitError,
}

/// Everything computed for one sample.
#[derive(Debug, Clone)]
pub struct SampleFit {
    pub cohort: String,
    pub variable: Variable,
    pub stats: Option<DescriptiveStats>,
    pub cullen_frey: Option<CullenFrey>,
    /// Families that were fitted.
    pub candidates: Vec<Family>,
    pub fits: Vec<FamilyFit>,
    pub failures: Vec<FitFailure>,
    pub selection: Option<Selection>,
}

impl SampleFit {
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.stats.as_ref().map_or(0, |stats| stats.count)
    }

    /// The fit of the selected family.
    #[must_use]
    pub fn chosen(&self) -> Option<&FamilyFit> {
        let selection = self.selection.as_ref()?;
        self.fits
            .iter()
            .find(|fit| fit.result.family() == selection.chosen)
    }
}

/// Runs the diagnostic, fits and selection for one sample.
///
/// # Examples
///
/// ```
/// use edflow_analysis::fitting::{FitConfig, Variable, fit_sample};
///
/// let sample = (1..=400).map(|i| 60.0 * -(1.0 - f64::from(i) / 401.0).ln()).collect::<Vec<_>>();
/// let fit = fit_sample("arrivals", Variable::InterArrival, &sample, &FitConfig::default());
/// assert!(fit.selection.is_some());
/// assert!(fit.failures.is_empty());
/// ```
#[must_use]
pub fn fit_sample(cohort: &str, variable: Variable, sample: &[f64], config: &FitConfig) -> SampleFit {
    // Non-finite values fail every family below; no stats or diagnostic for them
    let finite = sample.iter().all(|v| v.is_finite());
    let stats = DescriptiveStats::new(sample.iter().copied());
    let cullen_frey = (finite && config.narrow_with_cullen_frey)
        .then(|| CullenFrey::analyze(sample, config.bootstrap_samples, config.seed))
        .flatten();

    let candidates = match &cullen_frey {
        Some(diagnostic) => {
            let kept = diagnostic.candidates(config.cullen_frey_tolerance);
            let narrowed = config
                .families
                .iter()
                .copied()
                .filter(|family| kept.contains(family))
                .collect::<Vec<_>>();
            if narrowed.is_empty() {
                config.families.clone()
            } else {
                narrowed
            }
        }
        None => config.families.clone(),
    };

    let mut fits = vec![];
    let mut failures = vec![];
    for &family in &candidates {
        match fit::fit(sample, family) {
            Ok(result) => {
                let goodness = result.goodness_of_fit(sample);
                tracing::debug!(
                    %cohort,
                    %variable,
                    %family,
                    parameters = %result.parameters,
                    aic = result.aic,
                    ks = goodness.kolmogorov_smirnov,
                    "fitted"
                );
                fits.push(FamilyFit { result, goodness });
            }
            Err(error) => {
                tracing::warn!(%cohort, %variable, %family, %error, "fit failed");
                failures.push(FitFailure { family, error });
            }
        }
    }

    let selection = fit::select_by_aic(fits.iter().map(|fit| &fit.result), config.aic_margin);
    if let Some(selection) = &selection
        && selection.is_ambiguous()
    {
        tracing::info!(
            %cohort,
            %variable,
            chosen = %selection.chosen,
            contenders = ?selection.contenders,
            "comparable fits"
        );
    }

    SampleFit {
        cohort: cohort.to_owned(),
        variable,
        stats,
        cullen_frey,
        candidates,
        fits,
        failures,
        selection,
    }
}

/// Fits every cohort duration of interest, then the inter-arrival gaps.
#[must_use]
pub fn fit_cohorts(segmentation: &Segmentation, gaps: &[f64], config: &FitConfig) -> FitReport {
    let mut samples = vec![];
    for (name, members) in &segmentation.cohorts {
        for &kind in &members.durations {
            let sample = members.sample(kind);
            samples.push(fit_sample(name, Variable::Duration(kind), &sample, config));
        }
    }
    samples.push(fit_sample(
        ARRIVALS_COHORT,
        Variable::InterArrival,
        gaps,
        config,
    ));

    let report = FitReport { samples };
    tracing::info!(
        samples = report.samples.len(),
        selected = report.samples.iter().filter(|s| s.selection.is_some()).count(),
        failures = report.failures().count(),
        "fitted distributions"
    );
    report
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub samples: Vec<SampleFit>,
}

impl FitReport {
    #[must_use]
    pub fn get(&self, cohort: &str, variable: Variable) -> Option<&SampleFit> {
        self.samples
            .iter()
            .find(|sample| sample.cohort == cohort && sample.variable == variable)
    }

    /// Every failed family fit, with its sample.
    pub fn failures(&self) -> impl Iterator<Item = (&SampleFit, &FitFailure)> + '_ {
        self.samples
            .iter()
            .flat_map(|sample| sample.failures.iter().map(move |failure| (sample, failure)))
    }

    /// The chosen family and parameters per cohort and variable.
    #[must_use]
    pub fn parameter_export(&self) -> ParameterExport {
        let mut cohorts = BTreeMap::<String, BTreeMap<String, ChosenDistribution>>::new();
        for sample in &self.samples {
            let (Some(selection), Some(chosen)) = (&sample.selection, sample.chosen()) else {
                continue;
            };
            cohorts.entry(sample.cohort.clone()).or_default().insert(
                sample.variable.to_string(),
                ChosenDistribution {
                    parameters: chosen.result.parameters,
                    sample_size: chosen.result.sample_size,
                    aic: chosen.result.aic,
                    contenders: selection.contenders.clone(),
                },
            );
        }
        ParameterExport { cohorts }
    }
}

/// Parameter file read by the simulation model.
///
/// ```json
/// {
///   "cohorts": {
///     "adult_trauma": {
///       "service_duration": { "family": "gamma", "shape": 1.8, "rate": 0.0004, ... }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterExport {
    pub cohorts: BTreeMap<String, BTreeMap<String, ChosenDistribution>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenDistribution {
    #[serde(flatten)]
    pub parameters: Parameters,
    pub sample_size: usize,
    pub aic: f64,
    /// Families whose AIC was within the margin of the chosen one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contenders: Vec<Family>,
}
