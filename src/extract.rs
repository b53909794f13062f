//! Posterior draws in four shapes.
//!
//! All shapes hold the same values for a given name filter; they differ only
//! in how draws are arranged and labeled.  Pooled forms concatenate chains
//! in chain order and keep the within-chain iteration order.

use crate::error::FitError;
use crate::fit::FitResult;
use crate::names::ParameterSelector;
use crate::table::Table;
use indexmap::IndexMap;
use ndarray::{Array2, Array3, ArrayD, Axis, IxDyn};

/// Pooled post-warmup draws keyed by the requested name.  A scalar maps to
/// a 1-D array of draws; a parameter of shape `dims` maps to an array of
/// shape `[draws, dims...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedDraws {
    draws: IndexMap<String, ArrayD<f64>>,
}

impl GroupedDraws {
    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.draws.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.draws.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f64>)> {
        self.draws.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<String, ArrayD<f64>> {
        self.draws
    }
}

/// Pooled draws as a (draws × scalar columns) matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawMatrix {
    pub names: Vec<String>,
    pub draws: Array2<f64>,
}

/// Draws kept per chain: axis 0 is the iteration within a chain, axis 1 the
/// chain and axis 2 the scalar column.
#[derive(Debug, Clone, PartialEq)]
pub struct PerChainDraws {
    pub names: Vec<String>,
    pub draws: Array3<f64>,
    /// Whether axis 0 starts with the warmup iterations.
    pub include_warmup: bool,
}

impl FitResult {
    /// Resolves a name filter against this fit.
    pub fn select<S: AsRef<str>>(&self, pars: &[S]) -> Result<ParameterSelector, FitError> {
        ParameterSelector::resolve(&self.params, pars)
    }

    /// Post-warmup draws pooled across chains, one array per requested name.
    pub fn extract_grouped<S: AsRef<str>>(&self, pars: &[S]) -> Result<GroupedDraws, FitError> {
        let selector = self.select(pars)?;
        let kept = self.store.view(false);
        let n = self.num_draws();
        let mut draws = IndexMap::with_capacity(selector.selections().len());
        for selection in selector.selections() {
            let mut values = Vec::with_capacity(n * selection.columns.len());
            for chain in kept.axis_iter(Axis(1)) {
                for row in chain.outer_iter() {
                    values.extend(selection.columns.iter().map(|&c| row[c]));
                }
            }
            let mut shape = vec![n];
            shape.extend_from_slice(&selection.dims);
            let array = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| {
                FitError::InvalidLayout(format!("reshaping `{}`: {}", selection.label, e))
            })?;
            draws.insert(selection.label.clone(), array);
        }
        Ok(GroupedDraws { draws })
    }

    /// Post-warmup draws pooled across chains as a matrix with one column
    /// per scalar component.
    pub fn extract_matrix<S: AsRef<str>>(&self, pars: &[S]) -> Result<DrawMatrix, FitError> {
        let selector = self.select(pars)?;
        let columns = selector.columns();
        let kept = self.store.view(false);
        let (kept_iters, num_chains, _) = kept.dim();
        let mut draws = Array2::zeros((kept_iters * num_chains, columns.len()));
        for (c, chain) in kept.axis_iter(Axis(1)).enumerate() {
            let block = chain.select(Axis(1), &columns);
            draws
                .slice_mut(ndarray::s![c * kept_iters..(c + 1) * kept_iters, ..])
                .assign(&block);
        }
        Ok(DrawMatrix {
            names: selector.flat_names(&self.flat_names),
            draws,
        })
    }

    /// Same cells as [`extract_matrix`](Self::extract_matrix), as a labeled
    /// table whose rows are numbered from 1.
    pub fn extract_table<S: AsRef<str>>(&self, pars: &[S]) -> Result<Table, FitError> {
        let DrawMatrix { names, draws } = self.extract_matrix(pars)?;
        Table::with_numbered_rows(names, draws)
    }

    /// Draws kept per chain as an (iteration, chain, column) array.
    pub fn extract_per_chain<S: AsRef<str>>(
        &self,
        pars: &[S],
        include_warmup: bool,
    ) -> Result<PerChainDraws, FitError> {
        let selector = self.select(pars)?;
        let columns = selector.columns();
        let draws = self.store.view(include_warmup).select(Axis(2), &columns);
        Ok(PerChainDraws {
            names: selector.flat_names(&self.flat_names),
            draws,
            include_warmup,
        })
    }
}
