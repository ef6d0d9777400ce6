use std::path::PathBuf;

use clap::Args;
use edflow_analysis::fitting::{FitConfig, SampleFit, Variable, fit_sample};
use edflow_stats::fit::{Family, FitResult, GoodnessOfFit};
use serde::Serialize;

use crate::{command::table, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct FitArg {
    /// Sample file with one value per line (e.g. the inter-arrival output)
    pub sample: PathBuf,

    /// Families to fit (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = ["exponential", "gamma", "lognormal", "weibull"])]
    pub families: Vec<Family>,

    /// Fit every family instead of the Cullen-Frey candidates only
    #[arg(long)]
    pub no_narrow: bool,

    /// Cullen-Frey distance within which a family is kept
    #[arg(long, default_value_t = FitConfig::default().cullen_frey_tolerance)]
    pub tolerance: f64,

    /// Number of bootstrap resamples for the Cullen-Frey cloud
    #[arg(long, default_value_t = FitConfig::default().bootstrap_samples)]
    pub bootstrap: usize,

    /// Seed of the bootstrap generator
    #[arg(long, default_value_t = FitConfig::default().seed)]
    pub seed: u64,

    /// AIC difference within which fits are reported as comparable
    #[arg(long, default_value_t = FitConfig::default().aic_margin)]
    pub aic_margin: f64,

    /// Save the fits as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl FitArg {
    fn fit_config(&self) -> FitConfig {
        FitConfig {
            families: self.families.clone(),
            narrow_with_cullen_frey: !self.no_narrow,
            cullen_frey_tolerance: self.tolerance,
            bootstrap_samples: self.bootstrap,
            seed: self.seed,
            aic_margin: self.aic_margin,
        }
    }
}

#[derive(Debug, Serialize)]
struct FitRecord<'a> {
    #[serde(flatten)]
    result: &'a FitResult,
    goodness_of_fit: &'a GoodnessOfFit,
}

#[derive(Debug, Serialize)]
struct FitOutput<'a> {
    sample_size: usize,
    chosen: Option<Family>,
    contenders: &'a [Family],
    fits: Vec<FitRecord<'a>>,
    failures: Vec<(Family, String)>,
}

impl<'a> FitOutput<'a> {
    fn new(fit: &'a SampleFit) -> Self {
        Self {
            sample_size: fit.sample_size(),
            chosen: fit.selection.as_ref().map(|s| s.chosen),
            contenders: fit
                .selection
                .as_ref()
                .map_or(&[][..], |s| s.contenders.as_slice()),
            fits: fit
                .fits
                .iter()
                .map(|f| FitRecord {
                    result: &f.result,
                    goodness_of_fit: &f.goodness,
                })
                .collect(),
            failures: fit
                .failures
                .iter()
                .map(|f| (f.family, f.error.to_string()))
                .collect(),
        }
    }
}

pub(crate) fn run(arg: &FitArg) -> anyhow::Result<()> {
    let sample = util::read_sample_file(&arg.sample)?;
    let fit = fit_sample(
        &arg.sample.display().to_string(),
        Variable::External,
        &sample,
        &arg.fit_config(),
    );

    println!("Distribution Fit: {} (n={})", arg.sample.display(), sample.len());
    println!("==========================================\n");
    table::print_fit_legend();
    println!();
    table::print_cullen_frey(fit.cullen_frey.as_ref());
    table::print_fit_table(&fit);

    match &fit.selection {
        Some(selection) if selection.is_ambiguous() => {
            println!(
                "\nChosen: {} (comparable: {:?}), check a Q-Q plot before use",
                selection.chosen, selection.contenders
            );
        }
        Some(selection) => println!("\nChosen: {}", selection.chosen),
        None => println!("\nNo family could be fitted"),
    }

    if let Some(path) = &arg.output {
        util::write_json_file(path, &FitOutput::new(&fit))?;
        println!("\nFits saved to: {}", path.display());
    }
    Ok(())
}
