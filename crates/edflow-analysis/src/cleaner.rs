//! Deduplication and threshold filtering
//!
//! Cleaning runs in a fixed order:
//!
//! 1. Drop visits whose counter-exit timestamp was already seen (missing
//!    timestamps count as one shared key).
//! 2. Derive the four durations.
//! 3. Drop visits with a missing stage or any duration at or below its floor.
//! 4. Drop visits whose triage queue or service queue exceeds its cap.
//!
//! Each dropped visit is counted under the first rule it violates.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::visit::{DurationKind, Durations, Visit};

/// Lower bound per duration, in seconds. Durations at or below it are
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Floors {
    pub triage_queue: f64,
    pub triage_duration: f64,
    pub service_queue: f64,
    pub service_duration: f64,
}

impl Default for Floors {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

impl Floors {
    #[must_use]
    pub const fn uniform(seconds: f64) -> Self {
        Self {
            triage_queue: seconds,
            triage_duration: seconds,
            service_queue: seconds,
            service_duration: seconds,
        }
    }

    #[must_use]
    pub fn get(&self, kind: DurationKind) -> f64 {
        match kind {
            DurationKind::TriageQueue => self.triage_queue,
            DurationKind::TriageDuration => self.triage_duration,
            DurationKind::ServiceQueue => self.service_queue,
            DurationKind::ServiceDuration => self.service_duration,
        }
    }
}

/// Validity bounds applied by the [`Cleaner`], in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub floor: Floors,
    /// Largest accepted triage queue (inclusive).
    pub triage_queue_cap: f64,
    /// Largest accepted service queue (inclusive).
    pub service_queue_cap: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            floor: Floors::default(),
            triage_queue_cap: 4.0 * 3600.0,
            service_queue_cap: 12.0 * 3600.0,
        }
    }
}

impl Thresholds {
    /// Checks derived durations, returning the first rule they violate.
    #[must_use]
    pub fn check(&self, durations: &Durations) -> Option<ExclusionReason> {
        if durations
            .iter()
            .any(|(kind, seconds)| seconds <= self.floor.get(kind))
        {
            return Some(ExclusionReason::BelowFloor);
        }
        if durations.triage_queue > self.triage_queue_cap
            || durations.service_queue > self.service_queue_cap
        {
            return Some(ExclusionReason::AboveCap);
        }
        None
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// A stage timestamp is missing.
    MissingStage,
    /// A duration is at or below its floor.
    BelowFloor,
    /// A queue duration exceeds its cap.
    AboveCap,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.to_str(), f)
    }
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 3] = [
        ExclusionReason::MissingStage,
        ExclusionReason::BelowFloor,
        ExclusionReason::AboveCap,
    ];

    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            ExclusionReason::MissingStage => "missing stage",
            ExclusionReason::BelowFloor => "below floor",
            ExclusionReason::AboveCap => "above cap",
        }
    }
}

/// Row counts of one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub exclusions: BTreeMap<ExclusionReason, usize>,
    pub retained: usize,
}

impl CleaningReport {
    #[must_use]
    pub fn excluded(&self, reason: ExclusionReason) -> usize {
        self.exclusions.get(&reason).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_excluded(&self) -> usize {
        self.exclusions.values().sum()
    }
}

/// A visit that passed every cleaning rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub visit: Visit,
    pub durations: Durations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub rows: Vec<CleanedRow>,
    /// Visits left after deduplication, before any threshold is applied.
    pub deduplicated: Vec<Visit>,
    pub report: CleaningReport,
}

#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    thresholds: Thresholds,
}

impl Cleaner {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Cleans `visits`, keeping the input order of retained rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{NaiveDate, TimeDelta};
    /// use edflow_analysis::{cleaner::{Cleaner, Thresholds}, visit::Visit};
    ///
    /// let t0 = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
    /// let at = |s| Some(t0 + TimeDelta::seconds(s));
    /// let visit = Visit {
    ///     id: "v1".to_owned(),
    ///     category: "Adult".to_owned(),
    ///     sub_category: "Trauma".to_owned(),
    ///     priority: None,
    ///     counter_exit: at(0),
    ///     triage_entry: at(60),
    ///     triage_exit: at(360),
    ///     service_entry: at(1200),
    ///     service_exit: at(4800),
    /// };
    ///
    /// let cleaned = Cleaner::new(Thresholds::default()).clean(&[visit.clone(), visit]);
    /// assert_eq!(cleaned.rows.len(), 1);
    /// assert_eq!(cleaned.report.duplicates_removed, 1);
    /// assert_eq!(cleaned.rows[0].durations.service_duration, 3600.0);
    /// ```
    #[must_use]
    pub fn clean(&self, visits: &[Visit]) -> CleanedTable {
        let mut seen = HashSet::new();
        let deduplicated = visits
            .iter()
            .filter(|visit| seen.insert(visit.counter_exit))
            .cloned()
            .collect::<Vec<_>>();

        let mut report = CleaningReport {
            input_rows: visits.len(),
            duplicates_removed: visits.len() - deduplicated.len(),
            ..CleaningReport::default()
        };

        let mut rows = Vec::new();
        for visit in &deduplicated {
            let verdict = match Durations::from_visit(visit) {
                None => Err(ExclusionReason::MissingStage),
                Some(durations) => match self.thresholds.check(&durations) {
                    Some(reason) => Err(reason),
                    None => Ok(durations),
                },
            };
            match verdict {
                Ok(durations) => rows.push(CleanedRow {
                    visit: visit.clone(),
                    durations,
                }),
                Err(reason) => *report.exclusions.entry(reason).or_default() += 1,
            }
        }
        report.retained = rows.len();

        tracing::info!(
            input = report.input_rows,
            duplicates = report.duplicates_removed,
            excluded = report.total_excluded(),
            retained = report.retained,
            "cleaned visits"
        );

        CleanedTable {
            rows,
            deduplicated,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::tests::visit;

    fn sample_visits() -> Vec<Visit> {
        let mut missing = visit("missing", "Adult", "Trauma", [300, 400, 500, 600, 700]);
        missing.triage_exit = None;
        vec![
            visit("ok", "Adult", "Trauma", [0, 5 + 10, 20 + 10, 25 + 20, 9000]),
            visit("short", "Adult", "Trauma", [100, 120, 123, 200, 400]),
            visit("dup", "Adult", "Trauma", [0, 50, 100, 150, 200]),
            missing,
            visit("queue", "Adult", "Trauma", [1000, 1000 + 14_401, 16_000, 16_100, 16_200]),
            visit("service-queue", "Adult", "Consult", [2000, 2100, 2200, 2200 + 43_201, 50_000]),
            visit("edge", "Pediatric", "Respiratory", [3000, 3000 + 14_400, 17_500, 17_600, 17_700]),
        ]
    }

    #[test]
    fn test_exclusions_are_counted_by_first_rule() {
        let cleaned = Cleaner::default().clean(&sample_visits());
        let ids = cleaned
            .rows
            .iter()
            .map(|row| row.visit.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["ok", "edge"]);

        let report = &cleaned.report;
        assert_eq!(report.input_rows, 7);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.excluded(ExclusionReason::MissingStage), 1);
        assert_eq!(report.excluded(ExclusionReason::BelowFloor), 1);
        assert_eq!(report.excluded(ExclusionReason::AboveCap), 2);
        assert_eq!(report.retained, 2);
        assert_eq!(cleaned.deduplicated.len(), 6);
    }

    #[test]
    fn test_floor_is_exclusive_and_caps_inclusive() {
        let thresholds = Thresholds::default();
        let visit_at_floor = visit("v", "Adult", "Trauma", [0, 10, 30, 50, 70]);
        let durations = Durations::from_visit(&visit_at_floor).unwrap();
        assert_eq!(thresholds.check(&durations), Some(ExclusionReason::BelowFloor));

        let at_cap = visit("v", "Adult", "Trauma", [0, 14_400, 14_420, 14_420 + 43_200, 60_000]);
        let durations = Durations::from_visit(&at_cap).unwrap();
        assert_eq!(thresholds.check(&durations), None);
    }

    #[test]
    fn test_retained_rows_satisfy_bounds() {
        let thresholds = Thresholds::default();
        let cleaned = Cleaner::new(thresholds).clean(&sample_visits());
        for row in &cleaned.rows {
            for (kind, seconds) in row.durations.iter() {
                assert!(seconds > thresholds.floor.get(kind));
            }
            assert!(row.durations.triage_queue <= thresholds.triage_queue_cap);
            assert!(row.durations.service_queue <= thresholds.service_queue_cap);
        }
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let cleaner = Cleaner::default();
        let once = cleaner.clean(&sample_visits());
        let visits = once
            .rows
            .iter()
            .map(|row| row.visit.clone())
            .collect::<Vec<_>>();
        let twice = cleaner.clean(&visits);
        assert_eq!(twice.rows, once.rows);
        assert_eq!(twice.report.duplicates_removed, 0);
        assert_eq!(twice.report.total_excluded(), 0);
    }

    #[test]
    fn test_missing_counter_exit_is_one_key() {
        let mut a = visit("a", "Adult", "Trauma", [0, 50, 100, 150, 200]);
        let mut b = visit("b", "Adult", "Trauma", [10, 50, 100, 150, 200]);
        a.counter_exit = None;
        b.counter_exit = None;
        let cleaned = Cleaner::default().clean(&[a, b]);
        assert_eq!(cleaned.report.duplicates_removed, 1);
        assert_eq!(cleaned.report.excluded(ExclusionReason::MissingStage), 1);
    }
}
