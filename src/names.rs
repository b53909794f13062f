//! Parameter declarations and resolution of user supplied name filters.
//!
//! Vector and matrix parameters are expanded once into indexed scalar
//! names (`theta[1]`, `Sigma[2,1]`) in row-major order.  A filter may name
//! a whole parameter (`theta`) or one of its scalar components
//! (`theta[3]`); component names are matched literally.

use crate::error::FitError;

/// A declared parameter: its name and its shape (`[]` for a scalar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub dims: Vec<usize>,
}

impl ParamSpec {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: Vec::new(),
        }
    }

    pub fn array(name: impl Into<String>, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            dims: dims.to_vec(),
        }
    }

    /// Number of scalar components.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexed scalar names in row-major order with 1-based indices.
    pub fn flat_names(&self) -> Vec<String> {
        if self.dims.is_empty() {
            return vec![self.name.clone()];
        }
        let mut names = Vec::with_capacity(self.len());
        let mut index = vec![0usize; self.dims.len()];
        for _ in 0..self.len() {
            let parts: Vec<String> = index.iter().map(|i| (i + 1).to_string()).collect();
            names.push(format!("{}[{}]", self.name, parts.join(",")));
            // odometer increment, last axis fastest
            for axis in (0..self.dims.len()).rev() {
                index[axis] += 1;
                if index[axis] < self.dims[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        names
    }
}

/// One resolved entry of a name filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The name as requested, or the parameter name for an empty filter.
    pub label: String,
    /// Draw Store columns, in row-major component order.
    pub columns: Vec<usize>,
    /// Shape of one draw of this selection (`[]` for a scalar).
    pub dims: Vec<usize>,
}

/// An ordered, fully resolved name filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSelector {
    selections: Vec<Selection>,
}

impl ParameterSelector {
    /// Resolves `requested` against the declared parameters.  An empty
    /// request selects every parameter in declaration order; otherwise the
    /// output follows the request order, with repeated names collapsed to
    /// their first occurrence.  Nothing is resolved if any name is unknown.
    pub fn resolve<S: AsRef<str>>(
        params: &[ParamSpec],
        requested: &[S],
    ) -> Result<Self, FitError> {
        let mut offsets = Vec::with_capacity(params.len());
        let mut next = 0;
        for p in params {
            offsets.push(next);
            next += p.len();
        }

        let whole = |i: usize| {
            let p = &params[i];
            Selection {
                label: p.name.clone(),
                columns: (offsets[i]..offsets[i] + p.len()).collect(),
                dims: p.dims.clone(),
            }
        };

        if requested.is_empty() {
            return Ok(Self {
                selections: (0..params.len()).map(whole).collect(),
            });
        }

        let mut selections: Vec<Selection> = Vec::with_capacity(requested.len());
        for name in requested {
            let name = name.as_ref();
            if selections.iter().any(|s| s.label == name) {
                continue;
            }
            let selection = match params.iter().position(|p| p.name == name) {
                Some(i) => whole(i),
                None => Self::component(params, &offsets, name)
                    .ok_or_else(|| FitError::UnknownParameter(name.to_string()))?,
            };
            selections.push(selection);
        }
        Ok(Self { selections })
    }

    fn component(params: &[ParamSpec], offsets: &[usize], name: &str) -> Option<Selection> {
        params
            .iter()
            .zip(offsets)
            .filter(|(p, _)| !p.dims.is_empty() && name.starts_with(p.name.as_str()))
            .find_map(|(p, &offset)| {
                let k = p.flat_names().iter().position(|n| n == name)?;
                Some(Selection {
                    label: name.to_string(),
                    columns: vec![offset + k],
                    dims: Vec::new(),
                })
            })
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// All selected Draw Store columns, in output order.
    pub fn columns(&self) -> Vec<usize> {
        self.selections
            .iter()
            .flat_map(|s| s.columns.iter().copied())
            .collect()
    }

    /// Flat scalar names of the selected columns, in output order.
    pub fn flat_names(&self, all_flat_names: &[String]) -> Vec<String> {
        self.columns()
            .into_iter()
            .map(|c| all_flat_names[c].clone())
            .collect()
    }
}

/// Expands every declared parameter into its flat scalar names.
pub fn flatten_names(params: &[ParamSpec]) -> Vec<String> {
    params.iter().flat_map(|p| p.flat_names()).collect()
}
