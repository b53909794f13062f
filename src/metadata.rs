//! Run level artifacts recorded by the sampling engine.

use crate::fit::FitResult;
use crate::table::Table;
use indexmap::IndexMap;
use ndarray::{Array2, ArrayD};

/// Initial value of one parameter in one chain.
#[derive(Debug, Clone, PartialEq)]
pub enum InitValue {
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl From<f64> for InitValue {
    fn from(value: f64) -> Self {
        InitValue::Scalar(value)
    }
}

impl From<ArrayD<f64>> for InitValue {
    fn from(value: ArrayD<f64>) -> Self {
        InitValue::Array(value)
    }
}

/// Initial values of one chain, keyed by parameter name in declaration order.
pub type InitValues = IndexMap<String, InitValue>;

/// Wall clock time one chain spent in each phase, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElapsedTime {
    pub warmup: f64,
    pub sampling: f64,
}

impl ElapsedTime {
    pub fn new(warmup: f64, sampling: f64) -> Self {
        Self { warmup, sampling }
    }

    pub fn total(&self) -> f64 {
        self.warmup + self.sampling
    }
}

/// Everything about a run that is not a draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RunMetadata {
    pub(crate) model_name: String,
    pub(crate) model_source: String,
    pub(crate) seed: u64,
    pub(crate) inits: Vec<InitValues>,
    pub(crate) elapsed: Vec<ElapsedTime>,
}

impl FitResult {
    pub fn model_name(&self) -> &str {
        &self.metadata.model_name
    }

    /// Model definition text, verbatim.
    pub fn model_source(&self) -> &str {
        &self.metadata.model_source
    }

    /// Initial values, one mapping per chain.
    pub fn init_values(&self) -> &[InitValues] {
        &self.metadata.inits
    }

    /// Seed the engine ran with.
    pub fn seed(&self) -> u64 {
        self.metadata.seed
    }

    /// Elapsed time per chain: rows `chain:1`, `chain:2`, ...; columns
    /// `warmup` and `sample`, in seconds.
    pub fn elapsed_time(&self) -> Table {
        let rows: Vec<String> = (1..=self.metadata.elapsed.len())
            .map(|c| format!("chain:{}", c))
            .collect();
        let mut values = Array2::zeros((rows.len(), 2));
        for (i, t) in self.metadata.elapsed.iter().enumerate() {
            values[[i, 0]] = t.warmup;
            values[[i, 1]] = t.sampling;
        }
        Table {
            row_names: rows,
            col_names: vec!["warmup".to_string(), "sample".to_string()],
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FitResultBuilder;
    use crate::names::ParamSpec;
    use ndarray::{array, IxDyn};

    fn fit() -> FitResult {
        let mut init = InitValues::new();
        init.insert("mu".to_string(), InitValue::from(0.5));
        init.insert(
            "theta".to_string(),
            InitValue::from(ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, -1.0]).unwrap()),
        );
        FitResultBuilder::new(vec![ParamSpec::scalar("mu"), ParamSpec::array("theta", &[2])])
            .model_name("demo")
            .model_source("parameters { real mu; vector[2] theta; }")
            .seed(4711)
            .chain(array![[0.0, 1.0, 2.0], [0.5, 1.5, 2.5]])
            .chain(array![[1.0, 2.0, 3.0], [1.5, 2.5, 3.5]])
            .init_values(vec![init.clone(), init])
            .elapsed_time(vec![ElapsedTime::new(0.25, 0.5), ElapsedTime::new(0.125, 0.75)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_metadata_is_verbatim() {
        let fit = fit();
        assert_eq!(fit.model_name(), "demo");
        assert_eq!(fit.model_source(), "parameters { real mu; vector[2] theta; }");
        assert_eq!(fit.seed(), 4711);
        assert_eq!(fit.init_values().len(), 2);
        assert_eq!(fit.init_values()[0]["mu"], InitValue::Scalar(0.5));
        let keys: Vec<&String> = fit.init_values()[1].keys().collect();
        assert_eq!(keys, vec!["mu", "theta"]);
    }

    #[test]
    fn test_elapsed_time_table() {
        let table = fit().elapsed_time();
        assert_eq!(table.row_names(), &["chain:1".to_string(), "chain:2".to_string()]);
        assert_eq!(table.col_names(), &["warmup".to_string(), "sample".to_string()]);
        assert_eq!(table.get("chain:2", "sample"), Some(0.75));
        assert_eq!(table.get("chain:1", "warmup"), Some(0.25));
        assert_eq!(ElapsedTime::new(0.25, 0.5).total(), 0.75);
    }
}
