//! Cohorts and the inter-arrival sample
//!
//! A cohort is a named predicate over visits plus the durations that matter
//! for it. Cohorts live in a [`CohortSet`] keyed by name, so adding one is a
//! configuration change rather than another hand-written filter.
//!
//! Membership depends only on a visit's own category fields: segmenting a
//! reordered table yields the same members, in the new order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    cleaner::{CleanedRow, CleanedTable},
    visit::{DurationKind, Visit, seconds_between},
};

/// Which visits belong to a cohort.
///
/// Category names are compared after trimming whitespace and ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CohortPredicate {
    /// Every visit.
    All,
    /// Visits in `category`, any sub-category.
    Category { category: String },
    /// Visits in `category` whose sub-category is listed.
    SubCategory {
        category: String,
        sub_categories: Vec<String>,
    },
    /// Visits in `category` whose sub-category is not listed.
    SubCategoryExcept {
        category: String,
        excluded: Vec<String>,
    },
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl CohortPredicate {
    #[must_use]
    pub fn matches(&self, visit: &Visit) -> bool {
        match self {
            CohortPredicate::All => true,
            CohortPredicate::Category { category } => same_name(&visit.category, category),
            CohortPredicate::SubCategory {
                category,
                sub_categories,
            } => {
                same_name(&visit.category, category)
                    && sub_categories
                        .iter()
                        .any(|sub| same_name(&visit.sub_category, sub))
            }
            CohortPredicate::SubCategoryExcept { category, excluded } => {
                same_name(&visit.category, category)
                    && !excluded
                        .iter()
                        .any(|sub| same_name(&visit.sub_category, sub))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub predicate: CohortPredicate,
    /// Duration variables fitted for this cohort.
    pub durations: Vec<DurationKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortSet {
    cohorts: BTreeMap<String, Cohort>,
}

impl Default for CohortSet {
    fn default() -> Self {
        Self::default_ed()
    }
}

impl FromIterator<(String, Cohort)> for CohortSet {
    fn from_iter<T: IntoIterator<Item = (String, Cohort)>>(iter: T) -> Self {
        Self {
            cohorts: iter.into_iter().collect(),
        }
    }
}

impl CohortSet {
    /// The standard emergency-department cohorts.
    ///
    /// | Cohort                  | Visits                                    | Durations       |
    /// |-------------------------|-------------------------------------------|-----------------|
    /// | `triage`                | all                                       | triage queue, triage duration |
    /// | `adult_short_stay`      | adult, short-stay beds                    | service queue, service duration |
    /// | `adult_trauma`          | adult, trauma                             | service queue, service duration |
    /// | `adult_consult`         | adult, any other room                     | service queue, service duration |
    /// | `pediatric_respiratory` | pediatric, respiratory                    | service queue, service duration |
    /// | `pediatric_consult`     | pediatric, consult                        | service queue, service duration |
    #[must_use]
    pub fn default_ed() -> Self {
        let service = || vec![DurationKind::ServiceQueue, DurationKind::ServiceDuration];
        let adult_specialties = ["Short-stay beds", "Trauma"];
        let sub = |category: &str, subs: &[&str]| CohortPredicate::SubCategory {
            category: category.to_owned(),
            sub_categories: subs.iter().map(|&s| s.to_owned()).collect(),
        };

        [
            (
                "triage",
                Cohort {
                    predicate: CohortPredicate::All,
                    durations: vec![DurationKind::TriageQueue, DurationKind::TriageDuration],
                },
            ),
            (
                "adult_short_stay",
                Cohort {
                    predicate: sub("Adult", &adult_specialties[..1]),
                    durations: service(),
                },
            ),
            (
                "adult_trauma",
                Cohort {
                    predicate: sub("Adult", &adult_specialties[1..]),
                    durations: service(),
                },
            ),
            (
                "adult_consult",
                Cohort {
                    predicate: CohortPredicate::SubCategoryExcept {
                        category: "Adult".to_owned(),
                        excluded: adult_specialties.iter().map(|&s| s.to_owned()).collect(),
                    },
                    durations: service(),
                },
            ),
            (
                "pediatric_respiratory",
                Cohort {
                    predicate: sub("Pediatric", &["Respiratory"]),
                    durations: service(),
                },
            ),
            (
                "pediatric_consult",
                Cohort {
                    predicate: sub("Pediatric", &["Consult"]),
                    durations: service(),
                },
            ),
        ]
        .into_iter()
        .map(|(name, cohort)| (name.to_owned(), cohort))
        .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Cohort> {
        self.cohorts.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, cohort: Cohort) -> Option<Cohort> {
        self.cohorts.insert(name.into(), cohort)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cohort)> + '_ {
        self.cohorts.iter().map(|(name, cohort)| (name.as_str(), cohort))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Splits the cleaned rows into cohorts.
    ///
    /// A row may belong to several cohorts (the `All` cohort overlaps every
    /// other one). Rows matching no cohort other than an `All` cohort are
    /// counted in [`Segmentation::unmatched`].
    #[must_use]
    pub fn segment(&self, table: &CleanedTable) -> Segmentation {
        let mut cohorts = self
            .cohorts
            .iter()
            .map(|(name, cohort)| {
                let members = CohortMembers {
                    durations: cohort.durations.clone(),
                    rows: vec![],
                };
                (name.clone(), members)
            })
            .collect::<BTreeMap<_, _>>();

        let mut unmatched = 0;
        for row in &table.rows {
            let mut specific = false;
            for (name, cohort) in &self.cohorts {
                if !cohort.predicate.matches(&row.visit) {
                    continue;
                }
                specific |= cohort.predicate != CohortPredicate::All;
                if let Some(members) = cohorts.get_mut(name) {
                    members.rows.push(row.clone());
                }
            }
            if !specific {
                unmatched += 1;
            }
        }

        for (name, members) in &cohorts {
            tracing::debug!(cohort = %name, rows = members.rows.len(), "segmented cohort");
        }
        if unmatched > 0 {
            tracing::info!(unmatched, "cleaned rows outside every specific cohort");
        }

        Segmentation { cohorts, unmatched }
    }
}

/// Rows of one cohort and the durations of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortMembers {
    pub durations: Vec<DurationKind>,
    pub rows: Vec<CleanedRow>,
}

impl CohortMembers {
    /// Values of `kind` across the cohort, in row order.
    #[must_use]
    pub fn sample(&self, kind: DurationKind) -> Vec<f64> {
        self.rows.iter().map(|row| row.durations.get(kind)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub cohorts: BTreeMap<String, CohortMembers>,
    /// Rows that fell only into `All` cohorts, or none at all.
    pub unmatched: usize,
}

/// One (cohort, visit, duration) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    pub cohort: String,
    pub visit_id: String,
    pub kind: DurationKind,
    pub seconds: f64,
}

impl Segmentation {
    /// Reshapes every cohort into one row per member and duration of
    /// interest, cohorts in name order.
    #[must_use]
    pub fn long_form(&self) -> Vec<LongRow> {
        self.cohorts
            .iter()
            .flat_map(|(name, members)| {
                members.rows.iter().flat_map(move |row| {
                    members.durations.iter().map(move |&kind| LongRow {
                        cohort: name.clone(),
                        visit_id: row.visit.id.clone(),
                        kind,
                        seconds: row.durations.get(kind),
                    })
                })
            })
            .collect()
    }

    /// Member counts per cohort.
    #[must_use]
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.cohorts
            .iter()
            .map(|(name, members)| (name.clone(), members.rows.len()))
            .collect()
    }
}

/// Gaps in seconds between consecutive distinct counter-exit timestamps of
/// the deduplicated visits.
///
/// Visits without a counter-exit are skipped. For `k` distinct timestamps
/// there are `k - 1` gaps, all non-negative.
#[must_use]
pub fn inter_arrival_gaps(table: &CleanedTable) -> Vec<f64> {
    let mut arrivals = table
        .deduplicated
        .iter()
        .filter_map(|visit| visit.counter_exit)
        .collect::<Vec<_>>();
    arrivals.sort_unstable();
    arrivals.dedup();
    arrivals
        .windows(2)
        .map(|pair| seconds_between(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, seq::SliceRandom as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{cleaner::Cleaner, visit::tests::visit};

    fn cleaned() -> CleanedTable {
        let visits = [
            ("a", "Adult", "Trauma"),
            ("b", "adult ", "short-stay BEDS"),
            ("c", "Adult", "Room 3"),
            ("d", "Pediatric", "Respiratory"),
            ("e", "Pediatric", "Consult"),
            ("f", "Pediatric", "Surgery"),
            ("g", "Obstetrics", "Delivery"),
            ("h", "Adult", "Room 1"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (id, category, sub))| {
            let t = i64::try_from(i).unwrap() * 1000;
            visit(id, category, sub, [t, t + 60, t + 300, t + 600, t + 3600])
        })
        .collect::<Vec<_>>();
        Cleaner::default().clean(&visits)
    }

    fn member_ids(segmentation: &Segmentation, cohort: &str) -> Vec<String> {
        let mut ids = segmentation.cohorts[cohort]
            .rows
            .iter()
            .map(|row| row.visit.id.clone())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    #[test]
    fn test_default_cohorts() {
        let segmentation = CohortSet::default_ed().segment(&cleaned());
        assert_eq!(member_ids(&segmentation, "triage").len(), 8);
        assert_eq!(member_ids(&segmentation, "adult_trauma"), ["a"]);
        assert_eq!(member_ids(&segmentation, "adult_short_stay"), ["b"]);
        assert_eq!(member_ids(&segmentation, "adult_consult"), ["c", "h"]);
        assert_eq!(member_ids(&segmentation, "pediatric_respiratory"), ["d"]);
        assert_eq!(member_ids(&segmentation, "pediatric_consult"), ["e"]);
        // Pediatric surgery and obstetrics fall outside every specific cohort
        assert_eq!(segmentation.unmatched, 2);
    }

    #[test]
    fn test_segmenting_is_stable_under_reordering() {
        let table = cleaned();
        let cohorts = CohortSet::default_ed();
        let expected = cohorts.segment(&table);

        let mut shuffled = table.clone();
        shuffled.rows.shuffle(&mut Pcg64Mcg::seed_from_u64(9));
        let actual = cohorts.segment(&shuffled);

        for name in expected.cohorts.keys() {
            assert_eq!(member_ids(&actual, name), member_ids(&expected, name));
        }
        assert_eq!(actual.unmatched, expected.unmatched);
    }

    #[test]
    fn test_long_form_has_one_row_per_member_and_duration() {
        let segmentation = CohortSet::default_ed().segment(&cleaned());
        let long = segmentation.long_form();
        let expected = segmentation
            .cohorts
            .values()
            .map(|members| members.rows.len() * members.durations.len())
            .sum::<usize>();
        assert_eq!(long.len(), expected);

        let trauma = long
            .iter()
            .filter(|row| row.cohort == "adult_trauma")
            .collect::<Vec<_>>();
        assert_eq!(trauma.len(), 2);
        assert_eq!(trauma[0].kind, DurationKind::ServiceQueue);
        assert_eq!(trauma[0].seconds, 300.0);
        assert_eq!(trauma[1].seconds, 3000.0);
    }

    #[test]
    fn test_inter_arrival_gaps() {
        let mut visits = vec![
            visit("a", "Adult", "Trauma", [500, 560, 600, 700, 800]),
            visit("b", "Adult", "Trauma", [0, 60, 100, 200, 300]),
            visit("c", "Adult", "Trauma", [0, 70, 100, 200, 300]),
            visit("d", "Adult", "Trauma", [200, 201, 202, 203, 204]),
        ];
        visits[3].triage_exit = None;
        let mut missing = visit("e", "Adult", "Trauma", [0, 1, 2, 3, 4]);
        missing.counter_exit = None;
        visits.push(missing);

        let table = Cleaner::default().clean(&visits);
        let gaps = inter_arrival_gaps(&table);
        // distinct counter exits: 0, 200, 500
        assert_eq!(gaps, [200.0, 300.0]);
        assert!(gaps.iter().all(|gap| *gap >= 0.0));
    }

    #[test]
    fn test_predicate_matching_ignores_case_and_whitespace() {
        let predicate = CohortPredicate::SubCategoryExcept {
            category: "ADULT".to_owned(),
            excluded: vec![" trauma".to_owned()],
        };
        let v = visit("x", " Adult ", "Trauma ", [0, 1, 2, 3, 4]);
        assert!(!predicate.matches(&v));
        let v = visit("x", "adult", "Room 2", [0, 1, 2, 3, 4]);
        assert!(predicate.matches(&v));
        assert!(
            CohortPredicate::Category {
                category: "adult".to_owned()
            }
            .matches(&v)
        );
    }
}
