//! Visit records and the durations derived from them

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Triage priority level, 1 (most urgent) to 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    #[must_use]
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| {
            format!(
                "priority level must be between {} and {}, got {level}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One emergency-department encounter.
///
/// Timestamps follow the real-world order of the stages. A stage that was
/// never recorded is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: String,
    pub category: String,
    pub sub_category: String,
    pub priority: Option<Priority>,
    pub counter_exit: Option<NaiveDateTime>,
    pub triage_entry: Option<NaiveDateTime>,
    pub triage_exit: Option<NaiveDateTime>,
    pub service_entry: Option<NaiveDateTime>,
    pub service_exit: Option<NaiveDateTime>,
}

impl Visit {
    /// Seconds between the two endpoints of `kind`, `None` when either
    /// endpoint is missing.
    #[must_use]
    pub fn duration(&self, kind: DurationKind) -> Option<f64> {
        let (start, end) = match kind {
            DurationKind::TriageQueue => (self.counter_exit, self.triage_entry),
            DurationKind::TriageDuration => (self.triage_entry, self.triage_exit),
            DurationKind::ServiceQueue => (self.triage_exit, self.service_entry),
            DurationKind::ServiceDuration => (self.service_entry, self.service_exit),
        };
        Some(seconds_between(start?, end?))
    }
}

/// Signed difference `end - start` in seconds, at millisecond resolution.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

/// The four per-visit duration variables.
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
#[serde(rename_all = "snake_case")]
pub enum DurationKind {
    /// Counter exit to triage entry.
    TriageQueue,
    /// Triage entry to triage exit.
    TriageDuration,
    /// Triage exit to service entry.
    ServiceQueue,
    /// Service entry to service exit.
    ServiceDuration,
}

impl fmt::Display for DurationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.to_str(), f)
    }
}

impl DurationKind {
    pub const ALL: [DurationKind; 4] = [
        DurationKind::TriageQueue,
        DurationKind::TriageDuration,
        DurationKind::ServiceQueue,
        DurationKind::ServiceDuration,
    ];

    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            DurationKind::TriageQueue => "triage_queue",
            DurationKind::TriageDuration => "triage_duration",
            DurationKind::ServiceQueue => "service_queue",
            DurationKind::ServiceDuration => "service_duration",
        }
    }
}

/// Derived durations of a visit, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Durations {
    pub triage_queue: f64,
    pub triage_duration: f64,
    pub service_queue: f64,
    pub service_duration: f64,
}

impl Durations {
    /// Derives all four durations, `None` when any stage is missing.
    #[must_use]
    pub fn from_visit(visit: &Visit) -> Option<Self> {
        Some(Self {
            triage_queue: visit.duration(DurationKind::TriageQueue)?,
            triage_duration: visit.duration(DurationKind::TriageDuration)?,
            service_queue: visit.duration(DurationKind::ServiceQueue)?,
            service_duration: visit.duration(DurationKind::ServiceDuration)?,
        })
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

    pub fn iter(&self) -> impl Iterator<Item = (DurationKind, f64)> + '_ {
        DurationKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;

    /// Timestamp `seconds` after a fixed reference midnight.
    pub(crate) fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::seconds(seconds)
    }

    /// Visit with every stage present, offsets in seconds.
    pub(crate) fn visit(id: &str, category: &str, sub_category: &str, stages: [i64; 5]) -> Visit {
        Visit {
            id: id.to_owned(),
            category: category.to_owned(),
            sub_category: sub_category.to_owned(),
            priority: None,
            counter_exit: Some(at(stages[0])),
            triage_entry: Some(at(stages[1])),
            triage_exit: Some(at(stages[2])),
            service_entry: Some(at(stages[3])),
            service_exit: Some(at(stages[4])),
        }
    }

    #[test]
    fn test_durations_follow_stage_order() {
        let visit = visit("v1", "Adult", "Trauma", [0, 5, 20, 25, 9000]);
        let durations = Durations::from_visit(&visit).unwrap();
        assert_eq!(durations.triage_queue, 5.0);
        assert_eq!(durations.triage_duration, 15.0);
        assert_eq!(durations.service_queue, 5.0);
        assert_eq!(durations.service_duration, 8975.0);
    }

    #[test]
    fn test_missing_stage_has_no_durations() {
        let mut visit = visit("v1", "Adult", "Trauma", [0, 5, 20, 25, 9000]);
        visit.service_entry = None;
        assert_eq!(visit.duration(DurationKind::TriageDuration), Some(15.0));
        assert_eq!(visit.duration(DurationKind::ServiceQueue), None);
        assert!(Durations::from_visit(&visit).is_none());
    }

    #[test]
    fn test_milliseconds_are_kept() {
        let start = at(0);
        let end = start + TimeDelta::milliseconds(1500);
        assert_eq!(seconds_between(start, end), 1.5);
        assert_eq!(seconds_between(end, start), -1.5);
    }

    #[test]
    fn test_priority_range() {
        assert!(Priority::new(0).is_none());
        assert_eq!(Priority::new(3).map(Priority::level), Some(3));
        assert!(Priority::new(5).is_none());
    }
}
