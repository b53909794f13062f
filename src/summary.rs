//! Posterior summaries: moments, quantiles and convergence diagnostics.
//!
//! Convergence columns use split R-hat and split effective sample size as
//! computed by Stan 2.24 (see [`crate::rhat`] and [`crate::ess`]).  The
//! effective sample size is capped at the number of pooled draws and the
//! Monte Carlo standard error is `sd / sqrt(n_eff)`.

use crate::error::FitError;
use crate::ess::compute_split_effective_sample_size;
use crate::fit::{FitResult, InferenceMode};
use crate::rhat::split_potential_scale_reduction_factor;
use crate::table::Table;
use crate::utils::{flatten, quantile_sorted, sorted};
use crate::Draws;
use average::Variance;
use ndarray::{Array1, Array2};

/// Probabilities summarized when none are given.
pub const DEFAULT_PROBS: [f64; 5] = [0.025, 0.25, 0.5, 0.75, 0.975];

/// What [`FitResult::summarize`] computes.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    /// Quantile probabilities, each in `[0, 1]`.
    pub probs: Vec<f64>,
    /// Also produce one table per chain.
    pub per_chain: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            probs: DEFAULT_PROBS.to_vec(),
            per_chain: true,
        }
    }
}

impl SummaryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probs(mut self, probs: &[f64]) -> Self {
        self.probs = probs.to_vec();
        self
    }

    pub fn per_chain(mut self, per_chain: bool) -> Self {
        self.per_chain = per_chain;
        self
    }
}

/// Pooled summary and, when requested, one summary per chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub pooled: Table,
    pub per_chain: Vec<Table>,
}

/// Column label of a quantile, e.g. `2.5%` for 0.025.
pub fn quantile_label(p: f64) -> String {
    let pct = (p * 100.0 * 1e8).round() / 1e8;
    format!("{}%", pct)
}

/// Sorts the probabilities and keeps one per column label, rejecting an
/// empty set and values outside `[0, 1]`.
fn checked_probs(probs: &[f64]) -> Result<Vec<f64>, FitError> {
    if probs.is_empty() {
        return Err(FitError::InvalidProbability { value: None });
    }
    if let Some(&bad) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(FitError::InvalidProbability { value: Some(bad) });
    }
    let mut probs = sorted(probs);
    probs.dedup_by(|a, b| quantile_label(*a) == quantile_label(*b));
    Ok(probs)
}

/// Mean, standard deviation and quantiles of a set of draws.  The mean of
/// no draws and the standard deviation of fewer than two are `NaN`.
fn describe(draws: &[f64], probs: &[f64]) -> (f64, f64, Draws) {
    let moments: Variance = draws.iter().copied().collect();
    let mean = if draws.is_empty() { f64::NAN } else { moments.mean() };
    let sd = if draws.len() < 2 {
        f64::NAN
    } else {
        moments.sample_variance().sqrt()
    };
    let ordered = sorted(draws);
    let quantiles = probs.iter().map(|&p| quantile_sorted(&ordered, p)).collect();
    (mean, sd, quantiles)
}

impl FitResult {
    /// Summarizes the selected parameters over the post-warmup draws.
    ///
    /// The pooled table has columns `mean`, `se_mean`, `sd`, one column per
    /// probability in ascending order, `n_eff` and `Rhat`; the convergence
    /// columns are left out for variational fits.  Per-chain tables carry
    /// `mean`, `sd` and the quantiles.
    pub fn summarize<S: AsRef<str>>(
        &self,
        pars: &[S],
        options: &SummaryOptions,
    ) -> Result<Summary, FitError> {
        let probs = checked_probs(&options.probs)?;
        let selector = self.select(pars)?;
        let columns = selector.columns();
        let rows = selector.flat_names(&self.flat_names);
        let mcmc = self.mode == InferenceMode::Mcmc;
        let quantile_names: Vec<String> = probs.iter().map(|&p| quantile_label(p)).collect();
        log::debug!(
            "summarizing {} columns over {} draws",
            columns.len(),
            self.num_draws()
        );

        let mut pooled_cols = vec!["mean".to_string()];
        if mcmc {
            pooled_cols.push("se_mean".to_string());
        }
        pooled_cols.push("sd".to_string());
        pooled_cols.extend(quantile_names.iter().cloned());
        if mcmc {
            pooled_cols.push("n_eff".to_string());
            pooled_cols.push("Rhat".to_string());
        }

        let mut chain_cols = vec!["mean".to_string(), "sd".to_string()];
        chain_cols.extend(quantile_names);
        let num_tables = if options.per_chain { self.num_chains() } else { 0 };
        let mut chain_values =
            vec![Array2::<f64>::zeros((rows.len(), chain_cols.len())); num_tables];

        let mut pooled = Array2::<f64>::zeros((rows.len(), pooled_cols.len()));
        for (i, &column) in columns.iter().enumerate() {
            let chains = self.store.column_chains(column);
            let (mean, sd, quantiles) = describe(&flatten(&chains), &probs);
            let mut row = vec![mean];
            if mcmc {
                let n_eff = compute_split_effective_sample_size(&chains)
                    .map(|ess| ess.min(self.num_draws() as f64))
                    .unwrap_or_else(|e| {
                        log::warn!("n_eff for `{}` is undefined: {}", rows[i], e);
                        f64::NAN
                    });
                let rhat = split_potential_scale_reduction_factor(&chains).unwrap_or_else(|e| {
                    log::warn!("Rhat for `{}` is undefined: {}", rows[i], e);
                    f64::NAN
                });
                row.push(sd / n_eff.sqrt());
                row.push(sd);
                row.extend(quantiles);
                row.push(n_eff);
                row.push(rhat);
            } else {
                row.push(sd);
                row.extend(quantiles);
            }
            pooled.row_mut(i).assign(&Array1::from(row));

            for (values, draws) in chain_values.iter_mut().zip(&chains) {
                let (mean, sd, quantiles) = describe(draws, &probs);
                let mut row = vec![mean, sd];
                row.extend(quantiles);
                values.row_mut(i).assign(&Array1::from(row));
            }
        }

        let pooled = Table::new(rows.clone(), pooled_cols, pooled)?;
        let per_chain = chain_values
            .into_iter()
            .map(|values| Table::new(rows.clone(), chain_cols.clone(), values))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Summary { pooled, per_chain })
    }

    /// Posterior means of the selected columns: one column per chain
    /// (`mean-chain:1`, ...) followed by `mean-all chains`.
    pub fn posterior_mean<S: AsRef<str>>(&self, pars: &[S]) -> Result<Table, FitError> {
        let selector = self.select(pars)?;
        let columns = selector.columns();
        let num_chains = self.num_chains();
        let mut col_names: Vec<String> = (1..=num_chains)
            .map(|c| format!("mean-chain:{}", c))
            .collect();
        col_names.push("mean-all chains".to_string());

        let mut values = Array2::<f64>::zeros((columns.len(), num_chains + 1));
        for (i, &column) in columns.iter().enumerate() {
            let chains = self.store.column_chains(column);
            for (c, chain) in chains.iter().enumerate() {
                values[[i, c]] = mean_or_nan(chain);
            }
            values[[i, num_chains]] = mean_or_nan(&flatten(&chains));
        }
        Table::new(selector.flat_names(&self.flat_names), col_names, values)
    }
}

fn mean_or_nan(draws: &[f64]) -> f64 {
    crate::utils::mean(draws).unwrap_or(f64::NAN)
}
