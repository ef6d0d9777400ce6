//! Bracketed root search for monotone likelihood equations over `(0, inf)`

/// Smallest and largest parameter values the search will consider.
const SEARCH_MIN: f64 = 1e-8;
const SEARCH_MAX: f64 = 1e8;

const MAX_ITERATIONS: usize = 200;
const RELATIVE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RootError {
    NotBracketed,
    NotConverged { iterations: usize },
}

/// Finds the root of a monotone function of a positive parameter.
///
/// The bracket is grown geometrically around `initial` until the function
/// changes sign, then narrowed by bisection on the log scale. The function
/// may be increasing or decreasing.
pub(crate) fn solve_positive<F>(initial: f64, mut f: F) -> Result<f64, RootError>
where
    F: FnMut(f64) -> f64,
{
    let initial = if initial.is_finite() && initial > 0.0 {
        initial.clamp(SEARCH_MIN, SEARCH_MAX)
    } else {
        1.0
    };

    let (mut lo, mut hi) = (initial / 2.0, initial * 2.0);
    let (mut f_lo, mut f_hi) = (f(lo), f(hi));
    while !has_sign_change(f_lo, f_hi) {
        if lo <= SEARCH_MIN && hi >= SEARCH_MAX {
            return Err(RootError::NotBracketed);
        }
        if lo > SEARCH_MIN {
            lo = (lo / 10.0).max(SEARCH_MIN);
            f_lo = f(lo);
        }
        if hi < SEARCH_MAX {
            hi = (hi * 10.0).min(SEARCH_MAX);
            f_hi = f(hi);
        }
    }
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (lo * hi).sqrt();
        let f_mid = f(mid);
        if f_mid.is_nan() {
            break;
        }
        if f_mid == 0.0 || (hi - lo) <= RELATIVE_TOLERANCE * mid {
            return Ok(mid);
        }
        if has_sign_change(f_lo, f_mid) {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    Err(RootError::NotConverged {
        iterations: MAX_ITERATIONS,
    })
}

fn has_sign_change(a: f64, b: f64) -> bool {
    a == 0.0 || b == 0.0 || (!a.is_nan() && !b.is_nan() && (a < 0.0) != (b < 0.0))
}
