//! Emergency-department visit-time analysis
//!
//! This crate turns raw visit extracts into fitted duration distributions.
//! The pipeline runs four stages, each producing a new value for the next:
//!
//! 1. **Load** ([`loader`]): decode and parse the visit and priority extracts,
//!    join priorities by visit id (first occurrence wins)
//! 2. **Clean** ([`cleaner`]): deduplicate on counter-exit time, derive the
//!    four durations and drop rows outside the configured thresholds
//! 3. **Segment** ([`segment`]): split rows into named cohorts and extract the
//!    inter-arrival sample
//! 4. **Fit** ([`fitting`]): fit candidate families per cohort variable and
//!    select one by AIC
//!
//! [`pipeline`] wires the stages together, [`summary`] collects the
//! non-fatal notes of a run and [`output`] writes the result files.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! use edflow_analysis::{config::PipelineConfig, pipeline};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let config = PipelineConfig::load(Path::new("edflow.toml"))?;
//! let output = pipeline::run(&config)?;
//!
//! for sample in &output.fits.samples {
//!     if let Some(selection) = &sample.selection {
//!         println!("{}/{}: {}", sample.cohort, sample.variable, selection.chosen);
//!     }
//! }
//! println!("{}", output.summary);
//! # Ok(())
//! # }
//! ```

pub mod cleaner;
pub mod config;
pub mod fitting;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod segment;
pub mod summary;
pub mod visit;
