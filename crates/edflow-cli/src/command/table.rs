//! Text tables for descriptive statistics and fits

use edflow_analysis::fitting::SampleFit;
use edflow_stats::{
    cullen_frey::CullenFrey, descriptive::DescriptiveStats, fit::Family, quantile::Quantiles,
};

pub(crate) const PERCENTILE_POINTS: [f64; 5] = [5.0, 25.0, 50.0, 90.0, 95.0];

/// Print legend explaining fit table columns
pub(crate) fn print_fit_legend() {
    println!("Legend:");
    println!("  *        : Chosen family (lowest AIC)");
    println!("  ~        : Within the AIC margin of the chosen family");
    println!("  dAIC     : AIC difference to the chosen family");
    println!("  KS/CvM/AD: Kolmogorov-Smirnov, Cramér-von Mises, Anderson-Darling");
    println!("  MaxQErr  : Largest relative P1-P99 quantile error");
}

pub(crate) fn print_stats_header(label_col: &str) {
    println!(
        "  {:<36} {:>7} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10} {:>7} {:>7}",
        label_col, "N", "Min", "P05", "Median", "Mean", "P95", "Max", "Skew", "Kurt",
    );
    // label(36) + n(7) + 6 * values(9) + max(10) + skew(7) + kurt(7) + spaces(9)
    println!("  {}", "-".repeat(130));
}

pub(crate) fn print_stats_row(label: &str, values: &[f64], stats: Option<&DescriptiveStats>) {
    let Some(stats) = stats else {
        println!("  {label:<36} {:>7}", 0);
        return;
    };
    let quantiles = Quantiles::new(values);
    let p = |point| quantiles.as_ref().map_or(f64::NAN, |q| q.percentile(point));
    println!(
        "  {:<36} {:>7} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>10.1} {:>7.2} {:>7.2}",
        label,
        stats.count,
        stats.min,
        p(5.0),
        stats.median,
        stats.mean,
        p(95.0),
        stats.max,
        stats.skewness,
        stats.kurtosis,
    );
}

pub(crate) fn print_percentiles(values: &[f64]) {
    let Some(quantiles) = Quantiles::new(values) else {
        return;
    };
    let line = quantiles
        .percentiles(&PERCENTILE_POINTS)
        .map(|(point, value)| format!("P{point:02.0}={value:.1}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  Percentiles: {line}");
}

pub(crate) fn print_cullen_frey(diagnostic: Option<&CullenFrey>) {
    let Some(diagnostic) = diagnostic else {
        println!("  Cullen-Frey: not enough spread or values");
        return;
    };
    println!(
        "  Cullen-Frey: skewness^2={:.3} kurtosis={:.3} bootstrap radius={:.3}",
        diagnostic.observed.squared_skewness,
        diagnostic.observed.kurtosis,
        diagnostic.bootstrap_radius(),
    );
    let distances = diagnostic
        .distances
        .iter()
        .map(|(family, distance)| format!("{family}={distance:.3}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  Locus distance: {distances}");
}

pub(crate) fn print_fit_table(fit: &SampleFit) {
    let candidates = fit
        .candidates
        .iter()
        .map(|family| family.to_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Candidates: {candidates}");
    println!(
        "    {:<1} {:<12} {:<40} {:>12} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "", "Family", "Parameters", "AIC", "dAIC", "KS", "CvM", "AD", "MaxQErr",
    );
    // marker(1) + family(12) + params(40) + aic(12) + 5 * stats(8) + spaces(8)
    println!("    {}", "-".repeat(113));

    let best_aic = fit.selection.as_ref().map_or(f64::NAN, |s| s.aic);
    for family_fit in &fit.fits {
        let result = &family_fit.result;
        let gof = &family_fit.goodness;
        println!(
            "    {:<1} {:<12} {:<40} {:>12.1} {:>8.2} {:>8.4} {:>8.4} {:>8.3} {:>8.3}",
            marker(fit, result.family()),
            result.family(),
            result.parameters.to_string(),
            result.aic,
            result.aic - best_aic,
            gof.kolmogorov_smirnov,
            gof.cramer_von_mises,
            gof.anderson_darling,
            gof.max_quantile_error,
        );
    }
    for failure in &fit.failures {
        println!("    ! {:<12} {}", failure.family, failure.error);
    }
}

fn marker(fit: &SampleFit, family: Family) -> &'static str {
    match &fit.selection {
        Some(selection) if selection.chosen == family => "*",
        Some(selection) if selection.contenders.contains(&family) => "~",
        _ => "",
    }
}
