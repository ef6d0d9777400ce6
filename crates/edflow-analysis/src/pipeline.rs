//! Stage wiring: load, clean, segment, fit
//!
//! Each stage takes the previous stage's output by reference and returns a
//! new value; nothing is modified in place.

use crate::{
    cleaner::{CleanedTable, Cleaner},
    config::{InputConfig, PipelineConfig},
    fitting::{self, FitReport},
    loader::{self, JoinedVisits, LoadError},
    segment::{self, Segmentation},
    summary::RunSummary,
};

/// Every intermediate result of a run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub joined: JoinedVisits,
    pub cleaned: CleanedTable,
    pub segmentation: Segmentation,
    pub inter_arrival: Vec<f64>,
    pub fits: FitReport,
    pub summary: RunSummary,
}

/// Reads both extracts and joins priorities onto the visits.
pub fn load_visits(
    input: &InputConfig,
    timestamp_formats: &[String],
) -> Result<JoinedVisits, LoadError> {
    let primary = &input.primary;
    tracing::info!(path = %primary.path.display(), "reading primary extract");
    let table = loader::read_source(&primary.path, &primary.source)?;
    let visits = loader::parse_primary_visits(&table, &primary.columns, timestamp_formats)?;

    let priorities = &input.priorities;
    tracing::info!(path = %priorities.path.display(), "reading priority extract");
    let table = loader::read_source(&priorities.path, &priorities.source)?;
    let priorities = loader::parse_priorities(&table, &priorities.columns)?;

    tracing::info!(visits = visits.len(), priorities = priorities.len(), "joining");
    Ok(loader::join_priorities(visits, priorities))
}

/// Runs cleaning, segmentation and fitting on already loaded visits.
#[must_use]
pub fn analyze(joined: JoinedVisits, config: &PipelineConfig) -> PipelineOutput {
    let cleaned = Cleaner::new(config.thresholds).clean(&joined.visits);
    let segmentation = config.cohorts.segment(&cleaned);
    let inter_arrival = segment::inter_arrival_gaps(&cleaned);
    let fits = fitting::fit_cohorts(&segmentation, &inter_arrival, &config.fit);
    let summary = RunSummary::new(
        &joined,
        &cleaned.report,
        &segmentation,
        inter_arrival.len(),
        &fits,
    );
    PipelineOutput {
        joined,
        cleaned,
        segmentation,
        inter_arrival,
        fits,
        summary,
    }
}

pub fn run(config: &PipelineConfig) -> Result<PipelineOutput, LoadError> {
    let joined = load_visits(&config.input, &config.timestamp_formats)?;
    Ok(analyze(joined, config))
}
