//! Accessors and summaries for the result of fitting a Bayesian model by
//! MCMC or variational inference.
//!
//! A [`FitResult`] holds the draws of every chain together with the
//! per-iteration sampler diagnostics and the metadata of the run.  From it
//! you can extract draws in four shapes, summarize parameters with means,
//! quantiles, effective sample size (n_eff) and split R hat, and read the
//! sampler parameters, initial values, seed and timings back.
//!
//! The convergence diagnostics follow Stan: split R hat and an
//! autocorrelation based effective sample size over split chains.
//!
//! ```
//! use ndarray::Array2;
//! use stanfit::{FitResultBuilder, ParamSpec, SummaryOptions};
//!
//! let fit = FitResultBuilder::new(vec![ParamSpec::scalar("mu")])
//!     .chain(Array2::from_shape_fn((100, 1), |(i, _)| (i % 7) as f64))
//!     .chain(Array2::from_shape_fn((100, 1), |(i, _)| (i % 5) as f64))
//!     .build()
//!     .unwrap();
//! let summary = fit.summarize(&["mu"], &SummaryOptions::new()).unwrap();
//! assert!(summary.pooled.get("mu", "Rhat").is_some());
//! ```
#[macro_use]
extern crate approx;

pub mod error;
/// Effective Sample Size (ESS)
pub mod ess;
pub mod extract;
pub mod fit;
#[cfg(feature = "csv")]
pub mod io;
pub mod metadata;
/// Parameter declarations and name filters
pub mod names;
/// Gelman-Rubin split potential scale reduction (Rhat)
pub mod rhat;
pub mod sampler;
pub mod summary;
pub mod table;
/// Chain splitting and small statistical helpers
pub mod utils;

pub use error::FitError;
pub use extract::{DrawMatrix, GroupedDraws, PerChainDraws};
pub use fit::{FitResult, FitResultBuilder, InferenceMode};
#[cfg(feature = "csv")]
pub use io::read_stan_csv;
pub use metadata::{ElapsedTime, InitValue, InitValues};
pub use names::{ParamSpec, ParameterSelector, Selection};
pub use summary::{Summary, SummaryOptions, DEFAULT_PROBS};
pub use table::Table;

/// Draws of one quantity from one chain
pub type Draws = Vec<f64>;
/// Draws of one quantity, one vector per chain
pub type Chains = Vec<Draws>;
