//! Per-iteration sampler internals and the checks built on them.
//!
//! The column set of the sampler tables belongs to the sampling algorithm
//! and is passed through untouched.  The checks below only read the usual
//! NUTS columns and fail if a column they need was not recorded.

use crate::error::FitError;
use crate::fit::FitResult;
use crate::table::Table;
use average::{Mean, Variance};

pub const DIVERGENT: &str = "divergent__";
pub const TREEDEPTH: &str = "treedepth__";
pub const ENERGY: &str = "energy__";

/// E-BFMI (energy Bayesian fraction of missing information) of one chain:
/// the mean squared change of energy between iterations over the energy
/// variance.  Values below 0.3 indicate that momentum resampling explores
/// the energy distribution poorly.  Undefined (`NaN`) for fewer than four
/// energies or a constant energy.
pub fn ebfmi(energies: &[f64]) -> f64 {
    if energies.len() < 4 {
        return f64::NAN;
    }
    let var = energies.iter().copied().collect::<Variance>().sample_variance();
    if var < 1e-30 {
        return f64::NAN;
    }
    let jumps: Mean = energies.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();
    jumps.mean() / var
}

impl FitResult {
    /// Sampler diagnostics, one table per chain.  Warmup rows are dropped
    /// from the front unless `include_warmup` is set.
    pub fn sampler_params(&self, include_warmup: bool) -> Vec<Table> {
        let skip = if include_warmup { 0 } else { self.warmup() };
        self.sampler_params
            .iter()
            .map(|table| table.skip_rows(skip))
            .collect()
    }

    /// Post-warmup values of one sampler column, per chain.
    fn sampler_column(&self, name: &str) -> Result<Vec<Vec<f64>>, FitError> {
        if self.sampler_params.is_empty() {
            return Err(FitError::MissingSamplerColumn(name.to_string()));
        }
        self.sampler_params(false)
            .iter()
            .map(|table| {
                table
                    .column(name)
                    .map(|c| c.to_vec())
                    .ok_or_else(|| FitError::MissingSamplerColumn(name.to_string()))
            })
            .collect()
    }

    /// Number of post-warmup iterations that ended in a divergence.
    pub fn num_divergent(&self) -> Result<usize, FitError> {
        let divergent = self.sampler_column(DIVERGENT)?;
        let count = divergent.iter().flatten().filter(|&&d| d != 0.0).count();
        if count > 0 {
            log::warn!(
                "{} of {} iterations ended with a divergence",
                count,
                self.num_draws()
            );
        }
        Ok(count)
    }

    /// Number of post-warmup iterations that saturated the tree depth.
    pub fn num_max_treedepth(&self, max_depth: u32) -> Result<usize, FitError> {
        let depths = self.sampler_column(TREEDEPTH)?;
        let count = depths
            .iter()
            .flatten()
            .filter(|&&d| d >= f64::from(max_depth))
            .count();
        if count > 0 {
            log::warn!(
                "{} of {} iterations saturated the maximum tree depth of {}",
                count,
                self.num_draws(),
                max_depth
            );
        }
        Ok(count)
    }

    /// E-BFMI of every chain from its post-warmup energies.
    pub fn bfmi(&self) -> Result<Vec<f64>, FitError> {
        let energies = self.sampler_column(ENERGY)?;
        let bfmi: Vec<f64> = energies.iter().map(|e| ebfmi(e)).collect();
        for (chain, value) in bfmi.iter().enumerate() {
            if *value < 0.3 {
                log::warn!("chain {} has E-BFMI {:.3}", chain + 1, value);
            }
        }
        Ok(bfmi)
    }
}
