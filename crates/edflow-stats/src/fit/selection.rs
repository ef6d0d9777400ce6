use serde::{Deserialize, Serialize};

use super::{Family, FitResult};

/// Family chosen for a sample among its converged fits.
///
/// The family with the lowest AIC is chosen. Every other family whose AIC is
/// within `margin` of the minimum is listed in `contenders`; such a
/// selection is ambiguous and should be reviewed on a Q-Q plot before the
/// parameters are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub chosen: Family,
    pub aic: f64,
    pub contenders: Vec<Family>,
}

impl Selection {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.contenders.is_empty()
    }
}

/// Selects the lowest-AIC fit.
///
/// Returns `None` when there are no fits or no fit has a finite AIC.
///
/// # Examples
///
/// ```
/// use edflow_stats::fit::{self, Family, select_by_aic};
///
/// let sample = [12.0, 30.0, 45.0, 18.0, 60.0, 25.0, 90.0, 33.0];
/// let fits = Family::ALL
///     .iter()
///     .filter_map(|&family| fit::fit(&sample, family).ok())
///     .collect::<Vec<_>>();
/// let selection = select_by_aic(&fits, 2.0).unwrap();
/// assert!(Family::ALL.contains(&selection.chosen));
/// ```
#[must_use]
pub fn select_by_aic<'a, I>(fits: I, margin: f64) -> Option<Selection>
where
    I: IntoIterator<Item = &'a FitResult>,
{
    let fits = fits
        .into_iter()
        .filter(|fit| fit.aic.is_finite())
        .collect::<Vec<_>>();
    let best = fits
        .iter()
        .copied()
        .min_by(|a, b| a.aic.total_cmp(&b.aic))?;
    let contenders = fits
        .iter()
        .filter(|fit| fit.family() != best.family() && fit.aic - best.aic <= margin)
        .map(|fit| fit.family())
        .collect();
    Some(Selection {
        chosen: best.family(),
        aic: best.aic,
        contenders,
    })
}
