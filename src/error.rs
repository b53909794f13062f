use thiserror::Error;

/// Errors returned by fit construction and the accessors on a fit.
#[derive(Debug, Error)]
pub enum FitError {
    /// A name filter referenced a parameter that is not part of the fit.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    /// Quantile probabilities were empty, non-finite or outside `[0, 1]`.
    #[error("invalid quantile probabilities: {}", describe_probability(.value))]
    InvalidProbability { value: Option<f64> },
    /// Chains disagree in iteration count or column set.
    #[error("chain {chain} has {found} {what}, expected {expected}")]
    InconsistentChainShape {
        chain: usize,
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Builder input that cannot describe a fit.
    #[error("invalid fit layout: {0}")]
    InvalidLayout(String),
    /// A sampler diagnostic that a check relies on was not recorded.
    #[error("sampler parameter `{0}` was not recorded")]
    MissingSamplerColumn(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A CSV file that does not follow the Stan output layout.
    #[error("malformed Stan CSV {path}: {reason}")]
    StanCsv { path: String, reason: String },
}

fn describe_probability(value: &Option<f64>) -> String {
    match value {
        None => "at least one probability is required".to_string(),
        Some(p) => format!("{} is outside [0, 1]", p),
    }
}
