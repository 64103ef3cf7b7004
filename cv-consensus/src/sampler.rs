use crate::new_rng;
use rand::{rngs::SmallRng, seq::index};

/// Chooses which data make up each minimal sample.
pub trait Sampler {
    /// Prepares to draw samples from `num_data` data. Called at the start of every estimation,
    /// so all state from the previous estimation must be discarded here.
    fn initialize(&mut self, num_data: usize);

    /// Fills `sample` with distinct indices below `num_data`.
    ///
    /// Returns `false` once the sampler has nothing left to offer.
    fn sample(&mut self, sample: &mut [usize]) -> bool;
}

/// Draws minimal samples uniformly at random without replacement.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    seed: Option<u64>,
    rng: SmallRng,
    num_data: usize,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            rng: new_rng(seed),
            num_data: 0,
        }
    }
}

impl Sampler for RandomSampler {
    fn initialize(&mut self, num_data: usize) {
        self.rng = new_rng(self.seed);
        self.num_data = num_data;
    }

    fn sample(&mut self, sample: &mut [usize]) -> bool {
        if sample.len() > self.num_data {
            return false;
        }
        let drawn = index::sample(&mut self.rng, self.num_data, sample.len());
        for (slot, ix) in sample.iter_mut().zip(drawn.iter()) {
            *slot = ix;
        }
        true
    }
}

/// Visits every combination of indices once, in lexicographic order.
///
/// There are `n choose k` of them, so this is only practical for small inputs.
#[derive(Debug, Clone, Default)]
pub struct ExhaustiveSampler {
    current: Vec<usize>,
    num_data: usize,
}

impl ExhaustiveSampler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sampler for ExhaustiveSampler {
    fn initialize(&mut self, num_data: usize) {
        self.current.clear();
        self.num_data = num_data;
    }

    fn sample(&mut self, sample: &mut [usize]) -> bool {
        let k = sample.len();
        if k > self.num_data {
            return false;
        }
        if self.current.len() != k {
            self.current.clear();
            self.current.extend(0..k);
        } else {
            // Find the rightmost index that can still move right.
            let n = self.num_data;
            let pivot = match (0..k).rev().find(|&i| self.current[i] < n - k + i) {
                Some(pivot) => pivot,
                None => return false,
            };
            self.current[pivot] += 1;
            for i in pivot + 1..k {
                self.current[i] = self.current[i - 1] + 1;
            }
        }
        sample.copy_from_slice(&self.current);
        true
    }
}
