//! Statistical routines for emergency-department duration analysis.
//!
//! This crate provides:
//!
//! - **Descriptive statistics**: mean, median, spread and shape of a sample
//! - **Quantiles**: interpolated empirical quantiles shared by the summary
//!   tables and the goodness-of-fit statistics
//! - **Cullen-and-Frey diagnostic**: skewness/kurtosis placement of a sample
//!   against candidate families, with a seeded bootstrap cloud
//! - **Distribution fitting**: maximum-likelihood estimation of exponential,
//!   gamma, lognormal and Weibull distributions, goodness-of-fit statistics
//!   and AIC-based selection
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing samples
//! - [`quantile`]: Empirical quantiles and percentiles
//! - [`cullen_frey`]: Candidate-family narrowing from sample moments
//! - [`fit`]: Maximum-likelihood fits and model selection
//!
//! # Examples
//!
//! ## Fitting a sample
//!
//! ```
//! use edflow_stats::fit::{self, Family};
//!
//! let sample = [310.0, 95.0, 480.0, 150.0, 620.0, 275.0, 1020.0, 180.0];
//! let fits = Family::ALL
//!     .iter()
//!     .filter_map(|&family| fit::fit(&sample, family).ok())
//!     .collect::<Vec<_>>();
//! let selection = fit::select_by_aic(&fits, 2.0).unwrap();
//! println!("best family: {}", selection.chosen);
//! ```
//!
//! ## Narrowing candidates first
//!
//! ```
//! use edflow_stats::cullen_frey::CullenFrey;
//!
//! let sample = (1..=100).map(|i| f64::from(i).powf(1.5)).collect::<Vec<_>>();
//! let diagnostic = CullenFrey::analyze(&sample, 100, 7).unwrap();
//! for family in diagnostic.candidates(0.5) {
//!     println!("candidate: {family}");
//! }
//! ```

pub mod cullen_frey;
pub mod descriptive;
pub mod fit;
pub mod quantile;
