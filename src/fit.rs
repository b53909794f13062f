//! The fitted-model result and the builder the sampling engine fills in.

use crate::error::FitError;
use crate::metadata::{ElapsedTime, InitValues, RunMetadata};
use crate::names::{flatten_names, ParamSpec};
use crate::table::Table;
use crate::{Chains, Draws};
use ndarray::{s, Array2, Array3, ArrayView3};

/// How the draws were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Independent Markov chains, each with a warmup phase.
    #[default]
    Mcmc,
    /// Draws from a fitted variational approximation: a single chain
    /// without warmup.
    Variational,
}

/// Draws indexed by (iteration, chain, column).  Every chain has the same
/// iteration count and column set; the first `warmup` iterations of each
/// chain are warmup.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawStore {
    draws: Array3<f64>,
    warmup: usize,
}

impl DrawStore {
    pub(crate) fn iterations(&self) -> usize {
        self.draws.dim().0
    }

    pub(crate) fn num_chains(&self) -> usize {
        self.draws.dim().1
    }

    pub(crate) fn warmup(&self) -> usize {
        self.warmup
    }

    pub(crate) fn view(&self, include_warmup: bool) -> ArrayView3<'_, f64> {
        let start = if include_warmup { 0 } else { self.warmup };
        self.draws.slice(s![start.., .., ..])
    }

    /// Post-warmup draws of one column, one vector per chain.
    pub(crate) fn column_chains(&self, column: usize) -> Chains {
        let kept = self.view(false);
        (0..self.num_chains())
            .map(|c| kept.slice(s![.., c, column]).to_vec())
            .collect()
    }

    /// Post-warmup draws of one column pooled in chain order.
    pub(crate) fn pooled(&self, column: usize) -> Draws {
        crate::utils::flatten(&self.column_chains(column))
    }
}

/// A finished fit: draws, sampler diagnostics and run metadata.
///
/// Built once by [`FitResultBuilder`] and read-only afterwards, so a fit can
/// be shared between threads (for example behind an `Arc`) without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) flat_names: Vec<String>,
    pub(crate) store: DrawStore,
    pub(crate) mode: InferenceMode,
    pub(crate) sampler_params: Vec<Table>,
    pub(crate) metadata: RunMetadata,
}

impl FitResult {
    /// Declared parameter names.
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Declared parameters with their shapes.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Scalar column names with vector and matrix parameters expanded.
    pub fn flat_names(&self) -> &[String] {
        &self.flat_names
    }

    /// Shape of a declared parameter.
    pub fn dims(&self, name: &str) -> Option<&[usize]> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dims.as_slice())
    }

    pub fn num_chains(&self) -> usize {
        self.store.num_chains()
    }

    /// Iterations per chain, warmup included.
    pub fn iterations(&self) -> usize {
        self.store.iterations()
    }

    /// Warmup iterations per chain.
    pub fn warmup(&self) -> usize {
        self.store.warmup()
    }

    /// Post-warmup draws pooled over all chains.
    pub fn num_draws(&self) -> usize {
        (self.iterations() - self.warmup()) * self.num_chains()
    }

    pub fn mode(&self) -> InferenceMode {
        self.mode
    }
}

/// Collects the output of a run and checks it before building a
/// [`FitResult`].
///
/// Each call to [`chain`](Self::chain) adds one chain as an
/// (iterations × flat columns) array, with columns in the order given by
/// [`ParamSpec::flat_names`].
#[derive(Debug, Clone, Default)]
pub struct FitResultBuilder {
    params: Vec<ParamSpec>,
    chains: Vec<Array2<f64>>,
    warmup: usize,
    mode: InferenceMode,
    sampler_params: Vec<Table>,
    metadata: RunMetadata,
}

impl FitResultBuilder {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn mode(mut self, mode: InferenceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of leading warmup iterations in every chain.
    pub fn warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Adds the draws of the next chain.
    pub fn chain(mut self, draws: Array2<f64>) -> Self {
        self.chains.push(draws);
        self
    }

    /// Sampler diagnostics, one table per chain with one row per iteration.
    pub fn sampler_params(mut self, tables: Vec<Table>) -> Self {
        self.sampler_params = tables;
        self
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.model_name = name.into();
        self
    }

    pub fn model_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.model_source = source.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.metadata.seed = seed;
        self
    }

    pub fn init_values(mut self, inits: Vec<InitValues>) -> Self {
        self.metadata.inits = inits;
        self
    }

    pub fn elapsed_time(mut self, elapsed: Vec<ElapsedTime>) -> Self {
        self.metadata.elapsed = elapsed;
        self
    }

    pub fn build(self) -> Result<FitResult, FitError> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(FitError::InvalidLayout(format!(
                    "parameter `{}` is declared twice",
                    param.name
                )));
            }
        }
        let flat_names = flatten_names(&self.params);
        for (i, name) in flat_names.iter().enumerate() {
            if flat_names[..i].contains(name) {
                return Err(FitError::InvalidLayout(format!(
                    "flat column `{}` appears twice",
                    name
                )));
            }
        }

        let first = self
            .chains
            .first()
            .ok_or_else(|| FitError::InvalidLayout("a fit needs at least one chain".into()))?;
        let iterations = first.nrows();
        for (c, chain) in self.chains.iter().enumerate() {
            if chain.ncols() != flat_names.len() {
                return Err(FitError::InconsistentChainShape {
                    chain: c,
                    what: "columns",
                    expected: flat_names.len(),
                    found: chain.ncols(),
                });
            }
            if chain.nrows() != iterations {
                return Err(FitError::InconsistentChainShape {
                    chain: c,
                    what: "iterations",
                    expected: iterations,
                    found: chain.nrows(),
                });
            }
        }
        if self.warmup > iterations {
            return Err(FitError::InvalidLayout(format!(
                "warmup ({}) exceeds iterations ({})",
                self.warmup, iterations
            )));
        }
        if self.mode == InferenceMode::Variational && (self.chains.len() != 1 || self.warmup != 0)
        {
            return Err(FitError::InvalidLayout(
                "variational draws come as one chain without warmup".into(),
            ));
        }

        let num_chains = self.chains.len();
        self.check_sampler_params(iterations)?;
        check_per_chain("initial values", self.metadata.inits.len(), num_chains)?;
        check_per_chain("elapsed times", self.metadata.elapsed.len(), num_chains)?;

        let mut draws = Array3::zeros((iterations, num_chains, flat_names.len()));
        for (c, chain) in self.chains.iter().enumerate() {
            draws.slice_mut(s![.., c, ..]).assign(chain);
        }
        log::debug!(
            "built fit `{}`: {} chains x {} iterations ({} warmup), {} columns",
            self.metadata.model_name,
            num_chains,
            iterations,
            self.warmup,
            flat_names.len()
        );

        Ok(FitResult {
            params: self.params,
            flat_names,
            store: DrawStore {
                draws,
                warmup: self.warmup,
            },
            mode: self.mode,
            sampler_params: self.sampler_params,
            metadata: self.metadata,
        })
    }

    fn check_sampler_params(&self, iterations: usize) -> Result<(), FitError> {
        check_per_chain("sampler tables", self.sampler_params.len(), self.chains.len())?;
        let first = match self.sampler_params.first() {
            Some(first) => first,
            None => return Ok(()),
        };
        for (c, table) in self.sampler_params.iter().enumerate() {
            if table.nrows() != iterations {
                return Err(FitError::InconsistentChainShape {
                    chain: c,
                    what: "sampler iterations",
                    expected: iterations,
                    found: table.nrows(),
                });
            }
            if table.col_names() != first.col_names() {
                return Err(FitError::InconsistentChainShape {
                    chain: c,
                    what: "sampler columns",
                    expected: first.ncols(),
                    found: table.ncols(),
                });
            }
        }
        Ok(())
    }
}

fn check_per_chain(what: &str, found: usize, num_chains: usize) -> Result<(), FitError> {
    if found != 0 && found != num_chains {
        return Err(FitError::InvalidLayout(format!(
            "{} {} for {} chains",
            found, what, num_chains
        )));
    }
    Ok(())
}
