use crate::utils::{check_variable, flatten, mean, sample_variance, shortest_chain, split_chains};
use crate::{Chains, Draws};
use anyhow::{anyhow, Error, Result};
use arima::acf;

/// Computes the effective sample size (ESS) for one parameter across all
/// chains.  The value returned is the minimum of ESS and
/// `num_total_draws * log10(num_total_draws)`.
///
/// Chains are trimmed from the back to match the length of the shortest
/// chain.  The effective sample size can not be estimated with fewer than
/// four draws per chain, from non-finite draws, or from constant draws.
///
/// See more details in Stan reference manual section
/// ["Effective Sample Size"](http://mc-stan.org/users/documentation)
///
/// Based on the reference implementation in Stan v2.24.0,
/// `compute_effective_sample_size`.
///
/// # Arguments
/// * `chains` - Chains of draws for the same parameter
pub fn compute_effective_sample_size(chains: &[Draws]) -> Result<f64, Error> {
    let num_chains = chains.len();
    let num_draws = shortest_chain(chains)?;

    if num_draws < 4 {
        return Err(anyhow!("Must have at least 4 samples to compute ESS"));
    }
    let trimmed: Chains = chains.iter().map(|c| c[..num_draws].to_vec()).collect();
    check_variable(&trimmed)?;

    let n = num_draws as f64;
    let mut chain_acov: Chains = Vec::with_capacity(num_chains);
    let mut chain_mean: Draws = Vec::with_capacity(num_chains);
    let mut chain_var: Draws = Vec::with_capacity(num_chains);
    for chain in &trimmed {
        let acov = acf::acf(chain.as_slice(), None, true)
            .map_err(|_| anyhow!("Autocovariance failed for a chain of {} draws", num_draws))?;
        chain_mean.push(mean(chain)?);
        chain_var.push(acov[0] * n / (n - 1.0));
        chain_acov.push(acov);
    }

    let mean_var = mean(&chain_var)?;
    let mut var_plus = mean_var * (n - 1.0) / n;
    if num_chains > 1 {
        var_plus += sample_variance(&chain_mean)?;
    }

    // Average autocorrelation across chains at a given lag.
    let rho_at = |lag: usize| -> Result<f64, Error> {
        let acov_s: Draws = chain_acov.iter().map(|acov| acov[lag]).collect();
        Ok(1.0 - (mean_var - mean(&acov_s)?) / var_plus)
    };

    let mut rho_hat_s: Draws = vec![0.0; num_draws];
    let mut rho_hat_even = 1.0;
    rho_hat_s[0] = rho_hat_even;
    let mut rho_hat_odd = rho_at(1)?;
    rho_hat_s[1] = rho_hat_odd;

    // Convert raw autocovariance estimators into Geyer's initial
    // positive sequence. Loop only until num_draws - 4 to
    // leave the last pair of autocorrelations as a bias term that
    // reduces variance in the case of antithetical chains.
    let mut s = 1;
    while s < (num_draws - 4) && (rho_hat_even + rho_hat_odd) > 0.0 {
        rho_hat_even = rho_at(s + 1)?;
        rho_hat_odd = rho_at(s + 2)?;
        if (rho_hat_even + rho_hat_odd) >= 0.0 {
            rho_hat_s[s + 1] = rho_hat_even;
            rho_hat_s[s + 2] = rho_hat_odd;
        }
        s += 2;
    }

    let max_s = s;
    // used by the improved estimate below
    if rho_hat_even > 0.0 {
        rho_hat_s[max_s + 1] = rho_hat_even;
    }

    // Convert Geyer's initial positive sequence into an initial
    // monotone sequence
    let mut s = 1;
    while max_s >= 3 && s <= (max_s - 3) {
        if (rho_hat_s[s + 1] + rho_hat_s[s + 2]) > (rho_hat_s[s - 1] + rho_hat_s[s]) {
            rho_hat_s[s + 1] = (rho_hat_s[s - 1] + rho_hat_s[s]) / 2.0;
            rho_hat_s[s + 2] = rho_hat_s[s + 1];
        }
        s += 2;
    }

    let num_total_draws = num_chains as f64 * n;
    // Geyer's truncated estimator for the asymptotic variance.
    // The trailing term reduces variance in the antithetic case.
    let tau_hat: f64 =
        -1.0 + 2.0 * rho_hat_s.iter().take(max_s).sum::<f64>() + rho_hat_s[max_s + 1];
    let ess = num_total_draws / tau_hat;
    let cap = num_total_draws * num_total_draws.log10();
    Ok(ess.min(cap))
}

/// Computes the split effective sample size (ESS) for one parameter.
/// Each chain is split in half before estimating, which makes the
/// estimate sensitive to drift within a chain.  When the number of
/// draws N is odd, the (N+1)/2th draw is ignored.
///
/// Based on the reference implementation in Stan v2.24.0,
/// `compute_split_effective_sample_size`.
pub fn compute_split_effective_sample_size(chains: &[Draws]) -> Result<f64, Error> {
    let split = split_chains(chains)?;
    compute_effective_sample_size(&split)
}

/// Computes the Monte Carlo Standard Error (MCSE) of the posterior mean,
/// the standard deviation of the pooled draws over the square root of the
/// split effective sample size.
///
/// See the Stan reference manual section
/// ["Estimation of MCMC Standard Error"](https://mc-stan.org/docs/2_24/reference-manual/effective-sample-size-section.html#estimation-of-mcmc-standard-error)
pub fn compute_estimated_mcse(chains: &[Draws]) -> Result<f64, Error> {
    let ess = compute_split_effective_sample_size(chains)?;
    let var = sample_variance(&flatten(chains))?;
    Ok((var / ess).sqrt())
}
