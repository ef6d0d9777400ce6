//! Full pipeline command
//!
//! Loads both extracts, cleans and segments the visits, fits every cohort
//! variable and writes the cleaned table, the inter-arrival sample and the
//! parameter export. Reports go to stdout, progress to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use edflow_analysis::{
    config::PipelineConfig,
    fitting::Variable,
    output,
    pipeline::{self, PipelineOutput},
};

use crate::{command::table, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct RunArg {
    /// Path to the TOML configuration file (defaults apply when omitted)
    #[arg(long, short, env = "EDFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Primary visit extract, overrides `input.primary.path`
    #[arg(long)]
    pub primary: Option<PathBuf>,

    /// Priority extract, overrides `input.priorities.path`
    #[arg(long)]
    pub priorities: Option<PathBuf>,

    /// Cleaned CSV output, overrides `output.cleaned`
    #[arg(long)]
    pub cleaned: Option<PathBuf>,

    /// Inter-arrival output, overrides `output.inter_arrival`
    #[arg(long)]
    pub inter_arrival: Option<PathBuf>,

    /// Long-form CSV output, overrides `output.long_form`
    #[arg(long)]
    pub long_form: Option<PathBuf>,

    /// Parameter JSON output, overrides `output.parameters`
    #[arg(long)]
    pub parameters: Option<PathBuf>,

    /// Only print the run summary
    #[arg(long)]
    pub quiet: bool,
}

impl RunArg {
    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path).context("Configuration stage failed")?,
            None => PipelineConfig::default(),
        };
        let overrides = [
            (&self.primary, &mut config.input.primary.path),
            (&self.priorities, &mut config.input.priorities.path),
            (&self.cleaned, &mut config.output.cleaned),
            (&self.inter_arrival, &mut config.output.inter_arrival),
            (&self.parameters, &mut config.output.parameters),
        ];
        for (value, target) in overrides {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }
        if self.long_form.is_some() {
            config.output.long_form.clone_from(&self.long_form);
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    let config = arg.load_config()?;
    let output = pipeline::run(&config).context("Load stage failed")?;
    save_outputs(&config, &output)?;

    if !arg.quiet {
        print_report(&output);
    }
    println!("{}", output.summary);
    Ok(())
}

fn save_outputs(config: &PipelineConfig, output: &PipelineOutput) -> anyhow::Result<()> {
    let paths = &config.output;

    let writer = util::create_file(&paths.cleaned)?;
    output::write_cleaned_csv(writer, &output.cleaned)
        .with_context(|| format!("Failed to write cleaned table: {}", paths.cleaned.display()))?;
    tracing::info!(path = %paths.cleaned.display(), rows = output.cleaned.rows.len(), "wrote cleaned table");

    let writer = util::create_file(&paths.inter_arrival)?;
    output::write_gaps(writer, &output.inter_arrival).with_context(|| {
        format!(
            "Failed to write inter-arrival gaps: {}",
            paths.inter_arrival.display()
        )
    })?;
    tracing::info!(path = %paths.inter_arrival.display(), gaps = output.inter_arrival.len(), "wrote inter-arrival gaps");

    if let Some(path) = &paths.long_form {
        let rows = output.segmentation.long_form();
        let writer = util::create_file(path)?;
        output::write_long_form_csv(writer, &rows)
            .with_context(|| format!("Failed to write long-form table: {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote long-form table");
    }

    util::write_json_file(&paths.parameters, &output.fits.parameter_export())?;
    tracing::info!(path = %paths.parameters.display(), "wrote parameter export");
    Ok(())
}

fn print_report(output: &PipelineOutput) {
    println!("Duration Statistics (seconds)");
    println!("=============================\n");
    table::print_stats_header("Cohort/Variable");
    for sample in &output.fits.samples {
        let values = sample_values(output, &sample.cohort, sample.variable);
        table::print_stats_row(
            &format!("{}/{}", sample.cohort, sample.variable),
            &values,
            sample.stats.as_ref(),
        );
    }
    println!();

    println!("Distribution Fits");
    println!("=================\n");
    table::print_fit_legend();
    println!();
    for sample in &output.fits.samples {
        println!("{}/{} (n={})", sample.cohort, sample.variable, sample.sample_size());
        table::print_cullen_frey(sample.cullen_frey.as_ref());
        table::print_fit_table(sample);
        println!();
    }
}

fn sample_values(output: &PipelineOutput, cohort: &str, variable: Variable) -> Vec<f64> {
    match variable {
        Variable::Duration(kind) => output
            .segmentation
            .cohorts
            .get(cohort)
            .map(|members| members.sample(kind))
            .unwrap_or_default(),
        Variable::InterArrival => output.inter_arrival.clone(),
        Variable::External => vec![],
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        run: RunArg,
    }

    #[test]
    fn test_flags_override_config_paths() {
        let cli = Cli::try_parse_from([
            "run",
            "--primary",
            "in/visits.csv",
            "--long-form",
            "out/long.csv",
        ])
        .unwrap();
        let mut arg = cli.run;
        arg.config = None;
        let config = arg.load_config().unwrap();
        assert_eq!(config.input.primary.path, PathBuf::from("in/visits.csv"));
        assert_eq!(config.output.long_form, Some(PathBuf::from("out/long.csv")));
        let defaults = PipelineConfig::default();
        assert_eq!(config.input.priorities.path, defaults.input.priorities.path);
        assert_eq!(config.output.parameters, defaults.output.parameters);
    }
}
