//! Nominal target selection
//!
//! The selected slot only steers the ball (via aim strength); physics decides
//! where it actually lands.

use rand::Rng;

/// Inverse-CDF sample: first index whose cumulative probability reaches the draw.
///
/// Returns 0 when the vector carries no mass.
pub fn select_by_probability<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> usize {
    let sum: f64 = probabilities.iter().sum();
    if !(sum > 0.0) {
        return 0;
    }

    let draw: f64 = rng.random();
    let mut acc = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        acc += p / sum;
        if draw <= acc {
            return i;
        }
    }
    probabilities.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_degenerate_returns_zero() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(select_by_probability(&[], &mut rng), 0);
        assert_eq!(select_by_probability(&[0.0, 0.0], &mut rng), 0);
    }

    #[test]
    fn test_single_mass_always_selected() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(select_by_probability(&[0.0, 0.0, 5.0, 0.0], &mut rng), 2);
        }
    }

    #[test]
    fn test_unnormalized_weights_sample_proportionally() {
        let mut rng = Pcg32::seed_from_u64(42);
        let weights = [1.0, 3.0];
        let draws = 20_000;
        let ones = (0..draws)
            .filter(|_| select_by_probability(&weights, &mut rng) == 1)
            .count();
        let frac = ones as f64 / draws as f64;
        assert!((frac - 0.75).abs() < 0.02, "frac {frac}");
    }
}
