use rand::{distributions::Distribution, Rng};

/// Draw an outcome index from a discrete probability distribution
///
/// Uses inverse-CDF ("roulette wheel") sampling: a single uniform value `u` in `[0, 1)` is drawn and the
/// first index whose cumulative weight strictly exceeds `u` is returned. If rounding leaves the cumulative
/// sum at or below `u`, the last index is returned.
///
/// The weights are expected to be non-negative and to sum to 1. This is not checked.
///
/// **Panics** if `weights` is empty
pub fn sample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    assert!(!weights.is_empty(), "Cannot sample from an empty distribution.");
    let u = rng.gen::<f64>();
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > u {
            return i;
        }
    }

    weights.len() - 1
}

/// A borrowed discrete distribution over the indices `0..weights.len()`
///
/// Thin [`Distribution`] wrapper around [`sample`], so the distribution can be used anywhere `rand` expects one.
#[derive(Debug, Clone, Copy)]
pub struct Discrete<'a> {
    weights: &'a [f64],
}

impl<'a> Discrete<'a> {
    /// **Panics** if `weights` is empty
    pub fn new(weights: &'a [f64]) -> Self {
        assert!(!weights.is_empty(), "Cannot sample from an empty distribution.");
        Self { weights }
    }

    pub fn weights(&self) -> &'a [f64] {
        self.weights
    }
}

impl Distribution<usize> for Discrete<'_> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        sample(self.weights, rng)
    }
}
