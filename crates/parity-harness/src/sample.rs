//! Random sampling of catalogs

use crate::error::{HarnessError, HarnessResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Picks a uniformly random subset of a catalog
#[derive(Debug, Clone)]
pub struct Sampler {
    rate: f64,
    seed: Option<u64>,
}

impl Sampler {
    /// Create a sampler for a rate in (0, 1]
    pub fn new(rate: f64) -> HarnessResult<Self> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(HarnessError::InvalidSampleRate { rate });
        }
        Ok(Self { rate, seed: None })
    }

    /// Make every draw reproducible
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Number of identifiers drawn from a catalog of `len` distinct entries
    ///
    /// `ceil(len * rate)`. A product within a few ULPs of an integer (e.g.
    /// `10 * 0.3`) counts as that integer; any larger excess rounds up.
    pub fn sample_size(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let exact = len as f64 * self.rate;
        let rounded = exact.round();
        let size = if (exact - rounded).abs() <= exact.abs() * 4.0 * f64::EPSILON {
            rounded
        } else {
            exact.ceil()
        };
        (size as usize).clamp(1, len)
    }

    /// Draw a subset without replacement
    ///
    /// Duplicate identifiers are dropped (first occurrence kept) before
    /// sizing, so the result never repeats an identifier.
    pub fn sample(&self, catalog: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = catalog.iter().filter(|id| seen.insert(*id)).collect();
        let amount = self.sample_size(distinct.len());

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        distinct
            .choose_multiple(&mut rng, amount)
            .map(|id| (*id).clone())
            .collect()
    }
}
