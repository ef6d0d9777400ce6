//! End-of-run data-quality notes

use std::{collections::BTreeMap, fmt};

use edflow_stats::fit::Family;
use serde::Serialize;

use crate::{
    cleaner::{CleaningReport, ExclusionReason},
    fitting::FitReport,
    loader::JoinedVisits,
    segment::Segmentation,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinNotes {
    pub visits: usize,
    pub duplicate_keys: usize,
    pub collapsed_rows: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNote {
    pub cohort: String,
    pub variable: String,
    pub family: Family,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguityNote {
    pub cohort: String,
    pub variable: String,
    pub chosen: Family,
    pub contenders: Vec<Family>,
}

/// Non-fatal findings of a pipeline run, printed once it finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub join: JoinNotes,
    pub cleaning: CleaningReport,
    pub cohort_sizes: BTreeMap<String, usize>,
    pub unmatched_rows: usize,
    pub inter_arrival_gaps: usize,
    pub fit_failures: Vec<FailureNote>,
    pub ambiguous: Vec<AmbiguityNote>,
    /// Samples for which no family could be fitted.
    pub unfitted: Vec<(String, String)>,
}

impl RunSummary {
    #[must_use]
    pub fn new(
        joined: &JoinedVisits,
        cleaning: &CleaningReport,
        segmentation: &Segmentation,
        inter_arrival_gaps: usize,
        fits: &FitReport,
    ) -> Self {
        let fit_failures = fits
            .failures()
            .map(|(sample, failure)| FailureNote {
                cohort: sample.cohort.clone(),
                variable: sample.variable.to_string(),
                family: failure.family,
                message: failure.error.to_string(),
            })
            .collect();
        let ambiguous = fits
            .samples
            .iter()
            .filter_map(|sample| {
                let selection = sample.selection.as_ref().filter(|s| s.is_ambiguous())?;
                Some(AmbiguityNote {
                    cohort: sample.cohort.clone(),
                    variable: sample.variable.to_string(),
                    chosen: selection.chosen,
                    contenders: selection.contenders.clone(),
                })
            })
            .collect();
        let unfitted = fits
            .samples
            .iter()
            .filter(|sample| sample.selection.is_none())
            .map(|sample| (sample.cohort.clone(), sample.variable.to_string()))
            .collect();

        Self {
            join: JoinNotes {
                visits: joined.visits.len(),
                duplicate_keys: joined.duplicate_keys,
                collapsed_rows: joined.collapsed_rows,
                unmatched: joined.unmatched,
            },
            cleaning: cleaning.clone(),
            cohort_sizes: segmentation.sizes(),
            unmatched_rows: segmentation.unmatched,
            inter_arrival_gaps,
            fit_failures,
            ambiguous,
            unfitted,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Summary")?;
        writeln!(f, "===========")?;

        let join = &self.join;
        writeln!(f, "Join:")?;
        writeln!(f, "  Visits: {}", join.visits)?;
        writeln!(
            f,
            "  Repeated priority ids: {} ({} rows collapsed, first kept)",
            join.duplicate_keys, join.collapsed_rows
        )?;
        writeln!(f, "  Visits without priority: {}", join.unmatched)?;

        let cleaning = &self.cleaning;
        writeln!(f, "Cleaning:")?;
        writeln!(f, "  Input rows: {}", cleaning.input_rows)?;
        writeln!(f, "  Duplicates removed: {}", cleaning.duplicates_removed)?;
        for reason in ExclusionReason::ALL {
            writeln!(
                f,
                "  Excluded ({reason}): {}",
                cleaning.excluded(reason)
            )?;
        }
        writeln!(f, "  Retained: {}", cleaning.retained)?;

        writeln!(f, "Cohorts:")?;
        for (name, size) in &self.cohort_sizes {
            writeln!(f, "  {name:<24} {size:>8}")?;
        }
        writeln!(f, "  Rows outside specific cohorts: {}", self.unmatched_rows)?;
        writeln!(f, "Inter-arrival gaps: {}", self.inter_arrival_gaps)?;

        writeln!(f, "Fit failures: {}", self.fit_failures.len())?;
        for note in &self.fit_failures {
            writeln!(
                f,
                "  {}/{} {}: {}",
                note.cohort, note.variable, note.family, note.message
            )?;
        }
        writeln!(f, "Comparable fits: {}", self.ambiguous.len())?;
        for note in &self.ambiguous {
            let contenders = note
                .contenders
                .iter()
                .map(|family| family.to_str())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "  {}/{}: chose {}, also within margin: {contenders}",
                note.cohort, note.variable, note.chosen
            )?;
        }
        if !self.unfitted.is_empty() {
            writeln!(f, "Samples without any fit: {}", self.unfitted.len())?;
            for (cohort, variable) in &self.unfitted {
                writeln!(f, "  {cohort}/{variable}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            join: JoinNotes {
                visits: 12,
                duplicate_keys: 1,
                collapsed_rows: 2,
                unmatched: 3,
            },
            cleaning: CleaningReport {
                input_rows: 12,
                duplicates_removed: 1,
                exclusions: BTreeMap::from([
                    (ExclusionReason::MissingStage, 2),
                    (ExclusionReason::AboveCap, 1),
                ]),
                retained: 8,
            },
            cohort_sizes: BTreeMap::from([("triage".to_owned(), 8), ("adult_trauma".to_owned(), 5)]),
            unmatched_rows: 3,
            inter_arrival_gaps: 10,
            fit_failures: vec![FailureNote {
                cohort: "adult_trauma".to_owned(),
                variable: "service_queue".to_owned(),
                family: Family::Weibull,
                message: "sample has zero spread, weibull is degenerate".to_owned(),
            }],
            ambiguous: vec![AmbiguityNote {
                cohort: "triage".to_owned(),
                variable: "triage_duration".to_owned(),
                chosen: Family::Gamma,
                contenders: vec![Family::Weibull, Family::LogNormal],
            }],
            unfitted: vec![],
        }
    }

    #[test]
    fn test_report_lists_exclusions_per_reason() {
        let text = summary().to_string();
        assert!(text.contains("  Excluded (missing stage): 2\n"));
        assert!(text.contains("  Excluded (below floor): 0\n"));
        assert!(text.contains("  Excluded (above cap): 1\n"));
        assert!(text.contains("  Retained: 8\n"));
        assert!(text.contains("  Repeated priority ids: 1 (2 rows collapsed, first kept)\n"));
    }

    #[test]
    fn test_report_lists_fit_failures_and_comparable_fits() {
        let text = summary().to_string();
        assert!(text.contains("Fit failures: 1\n"));
        assert!(text.contains(
            "  adult_trauma/service_queue weibull: sample has zero spread, weibull is degenerate\n"
        ));
        assert!(text.contains(
            "  triage/triage_duration: chose gamma, also within margin: weibull, lognormal\n"
        ));
        assert!(!text.contains("Samples without any fit"));
    }

    #[test]
    fn test_report_lists_unfitted_samples() {
        let summary = RunSummary {
            unfitted: vec![("pediatric_consult".to_owned(), "service_queue".to_owned())],
            ..summary()
        };
        let text = summary.to_string();
        assert!(text.contains("Samples without any fit: 1\n  pediatric_consult/service_queue\n"));
    }
}
