use crate::{Chains, Draws};
use anyhow::{anyhow, Error, Result};

/// Compute the arithmetic mean of an array.
pub fn mean(arr: &[f64]) -> Result<f64, Error> {
    if arr.is_empty() {
        return Err(anyhow!("Can't take mean of empty array"));
    }
    let sum = arr.iter().sum::<f64>();
    let count = arr.len() as f64;
    Ok(sum / count)
}

/// Compute the sample variance of an array using Bessel's correction.
pub fn sample_variance(arr: &[f64]) -> Result<f64, Error> {
    if arr.len() < 2 {
        return Err(anyhow!("Need at least two values for a sample variance"));
    }
    let xbar = mean(arr)?;
    Ok(arr.iter().map(|x| (x - xbar).powi(2)).sum::<f64>() / (arr.len() as f64 - 1.0))
}

/// Splits each chain into two chains of equal length.  When the
/// number of total draws N is odd, the (N+1)/2th draw is ignored.
///
/// See more details in Stan reference manual section
/// ["Effective Sample Size"](http://mc-stan.org/users/documentation).
///
/// Chains are first trimmed from the back to the length of the shortest one.
pub fn split_chains(chains: &[Draws]) -> Result<Chains, Error> {
    let num_draws = shortest_chain(chains)?;
    if num_draws < 1 {
        return Err(anyhow!("No samples to split"));
    }
    let half = num_draws / 2;
    let offset = num_draws % 2;
    let mut split_draws = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        split_draws.push(chain[..half].to_vec());
        split_draws.push(chain[(half + offset)..num_draws].to_vec());
    }
    Ok(split_draws)
}

/// Length of the shortest chain, failing when there are no chains at all.
pub fn shortest_chain(chains: &[Draws]) -> Result<usize, Error> {
    chains
        .iter()
        .map(|c| c.len())
        .min()
        .ok_or_else(|| anyhow!("Can't work with an empty array of chains"))
}

/// Concatenate chains in chain order.
pub fn flatten(chains: &[Draws]) -> Draws {
    chains.iter().flat_map(|c| c.iter().copied()).collect()
}

/// Returns a sorted copy of `arr`.
pub fn sorted(arr: &[f64]) -> Draws {
    let mut out = arr.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Quantile of already sorted values by linear interpolation between
/// order statistics (Hyndman & Fan type 7, the R default).
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Checks that every value is finite and that at least two values differ.
pub(crate) fn check_variable(chains: &[Draws]) -> Result<(), Error> {
    let mut first: Option<f64> = None;
    let mut all_same = true;
    for &x in chains.iter().flatten() {
        if !x.is_finite() {
            return Err(anyhow!("All values must be finite (found {})", x));
        }
        match first {
            None => first = Some(x),
            Some(f) => all_same &= (x - f).abs() < 1e-10,
        }
    }
    match first {
        None => Err(anyhow!("No draws")),
        Some(value) if all_same => Err(anyhow!("Draws are all constant (value={})", value)),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        // Reference values computed with numpy.
        let arr = vec![
            2.13829088,
            -1.06214379,
            -0.79265699,
            -0.21300888,
            -1.07155142,
            -0.50425317,
            0.95708854,
            -1.23854172,
            1.37124938,
            1.17658286,
        ];
        let empty: Draws = vec![];
        assert_abs_diff_eq!(
            sample_variance(&arr).unwrap(),
            1.492596054209826,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(mean(&arr).unwrap(), 0.07610557018217139, epsilon = 1e-6);

        assert!(sample_variance(&empty).is_err());
        assert!(sample_variance(&[1.0]).is_err());
        assert!(mean(&empty).is_err());
    }

    #[test]
    fn test_split_empty_chains() {
        let chains = vec![vec![1.0], vec![], vec![]];
        assert!(split_chains(&chains).is_err());
        let none: Chains = vec![];
        assert!(split_chains(&none).is_err());
    }

    #[test]
    fn test_split_even_chains() {
        let chains = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]];
        let split = split_chains(&chains).unwrap();
        assert_eq!(
            split,
            vec![
                vec![1.0, 2.0],
                vec![3.0, 4.0],
                vec![5.0, 6.0],
                vec![7.0, 8.0]
            ]
        );
    }

    #[test]
    fn test_split_odd_chains_drops_middle_draw() {
        let chains = vec![
            vec![1.0, 2.0, 3.0, 4.0, 4.5],
            vec![5.0, 6.0, 7.0, 8.0, 8.5],
        ];
        let split = split_chains(&chains).unwrap();
        assert_eq!(split[0], vec![1.0, 2.0]);
        assert_eq!(split[1], vec![4.0, 4.5]);
        assert_eq!(split[2], vec![5.0, 6.0]);
        assert_eq!(split[3], vec![8.0, 8.5]);
    }

    #[test]
    fn test_split_trims_to_shortest() {
        let chains = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0, 10.0]];
        let split = split_chains(&chains).unwrap();
        assert_eq!(split[1], vec![3.0, 4.0]);
        assert_eq!(split[3], vec![9.0, 10.0]);
    }

    #[test]
    fn test_quantile_interpolates() {
        let xs = sorted(&[4.0, 1.0, 3.0, 2.0, 5.0]);
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_abs_diff_eq!(quantile_sorted(&xs, 0.0), 1.0);
        assert_abs_diff_eq!(quantile_sorted(&xs, 1.0), 5.0);
        assert_abs_diff_eq!(quantile_sorted(&xs, 0.5), 3.0);
        assert_abs_diff_eq!(quantile_sorted(&xs, 0.1), 1.4, epsilon = 1e-12);
        assert_abs_diff_eq!(quantile_sorted(&xs, 0.875), 4.5, epsilon = 1e-12);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_check_variable() {
        assert!(check_variable(&[vec![1.0, 1.0, 1.0]]).is_err());
        assert!(check_variable(&[vec![1.0, f64::NAN, 2.0]]).is_err());
        assert!(check_variable(&[vec![1.0], vec![2.0]]).is_ok());
    }
}
