//! Cullen-and-Frey skewness/kurtosis diagnostic
//!
//! The diagnostic places a sample on the plane of squared skewness (β1)
//! against kurtosis (β2) and compares it with the locus each candidate family
//! can reach:
//!
//! ```text
//! exponential : the single point (4, 9)
//! gamma       : the ray β2 = 3 + 1.5 β1
//! lognormal   : the curve traced by sdlog > 0
//! weibull     : the curve traced by shape > 0
//! ```
//!
//! A bootstrap cloud of resampled (β1, β2) points shows how much the sample
//! point itself can move. Families whose locus passes within the larger of
//! a fixed tolerance and the cloud radius are kept as fitting candidates.
//! This only narrows the candidate set; selection between fitted families
//! is done on the fits themselves.

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::gamma;

use crate::{descriptive::unbiased_shape, fit::Family};

/// Number of points used to trace each curved locus.
const LOCUS_POINTS: usize = 400;

/// A point on the Cullen-and-Frey plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentPoint {
    /// Squared skewness (β1).
    pub squared_skewness: f64,
    /// Kurtosis on the non-excess scale (β2).
    pub kurtosis: f64,
}

impl MomentPoint {
    #[must_use]
    pub fn from_sample(sample: &[f64]) -> Option<Self> {
        let (skewness, kurtosis) = unbiased_shape(sample)?;
        let point = Self {
            squared_skewness: skewness * skewness,
            kurtosis,
        };
        (point.squared_skewness.is_finite() && point.kurtosis.is_finite()).then_some(point)
    }

    fn distance(self, other: Self) -> f64 {
        (self.squared_skewness - other.squared_skewness).hypot(self.kurtosis - other.kurtosis)
    }

    fn distance_to_segment(self, a: Self, b: Self) -> f64 {
        let (dx, dy) = (
            b.squared_skewness - a.squared_skewness,
            b.kurtosis - a.kurtosis,
        );
        let len2 = dx * dx + dy * dy;
        if len2 == 0.0 {
            return self.distance(a);
        }
        let t = (((self.squared_skewness - a.squared_skewness) * dx
            + (self.kurtosis - a.kurtosis) * dy)
            / len2)
            .clamp(0.0, 1.0);
        self.distance(Self {
            squared_skewness: a.squared_skewness + t * dx,
            kurtosis: a.kurtosis + t * dy,
        })
    }
}

/// Result of the Cullen-and-Frey diagnostic for one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CullenFrey {
    pub observed: MomentPoint,
    pub bootstrap: Vec<MomentPoint>,
    /// Distance from the observed point to each family's locus.
    pub distances: Vec<(Family, f64)>,
}

impl CullenFrey {
    /// Runs the diagnostic with `bootstrap_samples` resamples drawn from a
    /// generator seeded with `seed`.
    ///
    /// Returns `None` when the sample has fewer than four values or no
    /// spread.
    ///
    /// # Examples
    ///
    /// ```
    /// use edflow_stats::cullen_frey::CullenFrey;
    ///
    /// let sample = (1..=200).map(|i| -(1.0 - f64::from(i) / 201.0).ln()).collect::<Vec<_>>();
    /// let diagnostic = CullenFrey::analyze(&sample, 50, 1).unwrap();
    /// assert_eq!(diagnostic.bootstrap.len(), 50);
    /// assert!(!diagnostic.candidates(1.0).is_empty());
    /// ```
    #[must_use]
    pub fn analyze(sample: &[f64], bootstrap_samples: usize, seed: u64) -> Option<Self> {
        let observed = MomentPoint::from_sample(sample)?;

        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut resample = vec![0.0; sample.len()];
        let bootstrap = (0..bootstrap_samples)
            .filter_map(|_| {
                for slot in &mut resample {
                    *slot = sample[rng.random_range(0..sample.len())];
                }
                MomentPoint::from_sample(&resample)
            })
            .collect();

        let distances = Family::ALL
            .iter()
            .map(|&family| (family, locus_distance(family, observed)))
            .collect();

        Some(Self {
            observed,
            bootstrap,
            distances,
        })
    }

    /// Root of the summed variances of the bootstrap cloud along both axes.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn bootstrap_radius(&self) -> f64 {
        if self.bootstrap.len() < 2 {
            return 0.0;
        }
        let n = self.bootstrap.len() as f64;
        let mean_x = self.bootstrap.iter().map(|p| p.squared_skewness).sum::<f64>() / n;
        let mean_y = self.bootstrap.iter().map(|p| p.kurtosis).sum::<f64>() / n;
        let var = self
            .bootstrap
            .iter()
            .map(|p| (p.squared_skewness - mean_x).powi(2) + (p.kurtosis - mean_y).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        var.sqrt()
    }

    /// Families whose locus lies within `max(tolerance, bootstrap radius)`
    /// of the observed point, or every family when none does.
    #[must_use]
    pub fn candidates(&self, tolerance: f64) -> Vec<Family> {
        let reach = tolerance.max(self.bootstrap_radius());
        let near = self
            .distances
            .iter()
            .filter(|(_, distance)| *distance <= reach)
            .map(|(family, _)| *family)
            .collect::<Vec<_>>();
        if near.is_empty() {
            Family::ALL.to_vec()
        } else {
            near
        }
    }

    /// Family whose locus is closest to the observed point.
    #[must_use]
    pub fn nearest(&self) -> Option<Family> {
        self.distances
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(family, _)| *family)
    }
}

/// Distance from `point` to the (β1, β2) locus of `family`.
#[must_use]
pub fn locus_distance(family: Family, point: MomentPoint) -> f64 {
    match family {
        Family::Exponential => point.distance(MomentPoint {
            squared_skewness: 4.0,
            kurtosis: 9.0,
        }),
        Family::Gamma => {
            // Ray from (0, 3) through the exponential point, extended far out
            let origin = MomentPoint {
                squared_skewness: 0.0,
                kurtosis: 3.0,
            };
            let far = MomentPoint {
                squared_skewness: 4.0e6,
                kurtosis: 3.0 + 6.0e6,
            };
            point.distance_to_segment(origin, far)
        }
        Family::LogNormal => polyline_distance(point, lognormal_locus()),
        Family::Weibull => polyline_distance(point, weibull_locus()),
    }
}

fn polyline_distance<I>(point: MomentPoint, locus: I) -> f64
where
    I: IntoIterator<Item = MomentPoint>,
{
    let mut iter = locus.into_iter();
    let Some(mut prev) = iter.next() else {
        return f64::INFINITY;
    };
    let mut best = point.distance(prev);
    for next in iter {
        best = best.min(point.distance_to_segment(prev, next));
        prev = next;
    }
    best
}

#[expect(clippy::cast_precision_loss)]
fn geometric_grid(min: f64, max: f64) -> impl Iterator<Item = f64> {
    let ratio = (max / min).ln() / (LOCUS_POINTS - 1) as f64;
    (0..LOCUS_POINTS).map(move |i| min * (ratio * i as f64).exp())
}

fn lognormal_locus() -> impl Iterator<Item = MomentPoint> {
    geometric_grid(1e-3, 1.5).map(|sdlog| {
        let w = (sdlog * sdlog).exp();
        MomentPoint {
            squared_skewness: (w + 2.0).powi(2) * (w - 1.0),
            kurtosis: w.powi(4) + 2.0 * w.powi(3) + 3.0 * w.powi(2) - 3.0,
        }
    })
}

fn weibull_locus() -> impl Iterator<Item = MomentPoint> {
    // Shapes above 50 sit next to the normal point (0, 3) already
    geometric_grid(0.3, 50.0).filter_map(|shape| {
        let g = |r: f64| gamma(1.0 + r / shape);
        let (g1, g2, g3, g4) = (g(1.0), g(2.0), g(3.0), g(4.0));
        let var = g2 - g1 * g1;
        if !(var.is_finite() && var > 0.0) {
            return None;
        }
        let skewness = (g3 - 3.0 * g1 * g2 + 2.0 * g1.powi(3)) / var.powf(1.5);
        let kurtosis =
            (g4 - 4.0 * g1 * g3 + 6.0 * g1 * g1 * g2 - 3.0 * g1.powi(4)) / (var * var);
        let point = MomentPoint {
            squared_skewness: skewness * skewness,
            kurtosis,
        };
        (point.squared_skewness.is_finite() && point.kurtosis.is_finite()).then_some(point)
    })
}
