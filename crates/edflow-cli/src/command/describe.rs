use std::path::PathBuf;

use clap::Args;
use edflow_analysis::fitting::FitConfig;
use edflow_stats::{cullen_frey::CullenFrey, descriptive::DescriptiveStats};

use crate::{command::table, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct DescribeArg {
    /// Sample file with one value per line
    pub sample: PathBuf,

    /// Number of bootstrap resamples for the Cullen-Frey cloud
    #[arg(long, default_value_t = FitConfig::default().bootstrap_samples)]
    pub bootstrap: usize,

    /// Seed of the bootstrap generator
    #[arg(long, default_value_t = FitConfig::default().seed)]
    pub seed: u64,

    /// Cullen-Frey distance within which a family is a candidate
    #[arg(long, default_value_t = FitConfig::default().cullen_frey_tolerance)]
    pub tolerance: f64,
}

pub(crate) fn run(arg: &DescribeArg) -> anyhow::Result<()> {
    let sample = util::read_sample_file(&arg.sample)?;
    let stats = DescriptiveStats::new(sample.iter().copied());

    println!("Sample: {}", arg.sample.display());
    println!("==========================================\n");
    table::print_stats_header("Sample");
    table::print_stats_row("values", &sample, stats.as_ref());
    if let Some(stats) = &stats {
        println!(
            "\n  Variance: {:.3}  Std dev: {:.3}  CV: {}",
            stats.variance,
            stats.std_dev,
            stats
                .coefficient_of_variation()
                .map_or("N/A".to_string(), |cv| format!("{cv:.3}")),
        );
        table::print_percentiles(&sample);
    }
    println!();

    let diagnostic = CullenFrey::analyze(&sample, arg.bootstrap, arg.seed);
    table::print_cullen_frey(diagnostic.as_ref());
    if let Some(diagnostic) = &diagnostic {
        let candidates = diagnostic
            .candidates(arg.tolerance)
            .iter()
            .map(|family| family.to_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Candidates: {candidates}");
        if let Some(nearest) = diagnostic.nearest() {
            println!("  Nearest locus: {nearest}");
        }
        let reach = arg.tolerance.max(diagnostic.bootstrap_radius());
        if diagnostic.distances.iter().all(|(_, distance)| *distance > reach) {
            println!("  (no locus within {reach:.3}, all families remain candidates)");
        }
    }
    Ok(())
}
