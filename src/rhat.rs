use crate::utils::{mean, sample_variance, shortest_chain, split_chains};
use crate::{Chains, Draws};
use anyhow::{anyhow, Error, Result};

/// Computes the potential scale reduction (Rhat) for one parameter
/// from the between-chain and within-chain variances as
/// `sqrt((W + B / n) / W)`, which is exactly 1 when all chain means agree
/// and grows with the between-chain variance.  Chains are trimmed from the
/// back to match the length of the shortest chain.
///
/// Fails when fewer than two chains are given or when the within-chain
/// variance is zero (every chain is constant).
///
/// See more details in Stan reference manual section
/// ["Potential Scale Reduction"](https://mc-stan.org/docs/2_24/reference-manual/notation-for-samples-chains-and-draws.html#potential-scale-reduction).
pub fn potential_scale_reduction_factor(chains: &[Draws]) -> Result<f64, Error> {
    if chains.len() < 2 {
        return Err(anyhow!(
            "Rhat needs at least two chains, got {}",
            chains.len()
        ));
    }
    let n = shortest_chain(chains)?;
    let mut chain_mean: Draws = Vec::with_capacity(chains.len());
    let mut chain_var: Draws = Vec::with_capacity(chains.len());
    for chain in chains {
        let chain = &chain[..n];
        chain_mean.push(mean(chain)?);
        chain_var.push(sample_variance(chain)?);
    }

    let n = n as f64;
    let var_between = n * sample_variance(&chain_mean)?;
    let var_within = mean(&chain_var)?;
    if var_within <= 0.0 {
        return Err(anyhow!("Rhat is undefined with zero within-chain variance"));
    }

    Ok(((var_within + var_between / n) / var_within).sqrt())
}

/// Computes the split potential scale reduction (Rhat) for one parameter.
/// Every chain is split into two halves before comparing them, so a single
/// chain is enough.  When the number of draws N is odd, the (N+1)/2th
/// draw is ignored.
///
/// Based on the reference implementation in Stan v2.24.0,
/// `compute_split_potential_scale_reduction`.
pub fn split_potential_scale_reduction_factor(chains: &[Draws]) -> Result<f64, Error> {
    let split: Chains = split_chains(chains)?;
    potential_scale_reduction_factor(&split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rhat_matches_hand_computation() {
        // Means 2.5 and 6.5, variances 5/3 each:
        // B = 4 * var([2.5, 6.5]) = 32, W = 5/3, Rhat = sqrt((W + 32 / 4) / W)
        let chains = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]];
        let w: f64 = 5.0 / 3.0;
        let expected = ((w + 8.0) / w).sqrt();
        let actual = potential_scale_reduction_factor(&chains).unwrap();
        assert_abs_diff_eq!(actual, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rhat_identical_chains() {
        let chain: Draws = (0..1000).map(|i| ((i * 37) % 101) as f64).collect();
        let chains = vec![chain.clone(), chain];
        let actual = potential_scale_reduction_factor(&chains).unwrap();
        assert_abs_diff_eq!(actual, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_split_rhat_detects_drift() {
        // The second half of each chain sits far from the first half.
        let chain: Draws = (0..200)
            .map(|i| if i < 100 { (i % 7) as f64 } else { 50.0 + (i % 7) as f64 })
            .collect();
        let chains = vec![chain.clone(), chain];
        let rhat = split_potential_scale_reduction_factor(&chains).unwrap();
        assert!(rhat > 1.5, "rhat = {}", rhat);
    }

    #[test]
    fn test_rhat_never_below_one() {
        let chains = vec![
            vec![0.3, 1.2, 0.8, 2.0, 1.1],
            vec![0.9, 1.0, 1.4, 0.7, 1.3],
            vec![1.5, 0.2, 0.6, 1.0, 0.9],
        ];
        assert!(potential_scale_reduction_factor(&chains).unwrap() >= 1.0);
    }

    #[test]
    fn test_split_rhat_single_chain() {
        let chain: Draws = (0..40).map(|i| ((i * 13) % 17) as f64).collect();
        assert!(split_potential_scale_reduction_factor(&[chain]).is_ok());
    }

    #[test]
    fn test_rhat_errors() {
        assert!(potential_scale_reduction_factor(&[vec![1.0, 2.0]]).is_err());
        let constant = vec![vec![1.0; 10], vec![1.0; 10]];
        assert!(potential_scale_reduction_factor(&constant).is_err());
        let empty: Chains = vec![];
        assert!(split_potential_scale_reduction_factor(&empty).is_err());
    }
}
