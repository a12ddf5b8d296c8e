//! Random source for genome operations.
//!
//! Every mutation, structural edit and crossover draws from an explicit
//! [`GenomeRng`], so a fixed seed reproduces an evolutionary run exactly.

use std::collections::HashSet;

use rand::prelude::*;

use crate::schema::{Gene, MutationConfig, WeightAllele};

const IDENT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const GENE_IDENT_LEN: usize = 6;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
    /// Identifiers handed out so far; never reissued.
    issued: HashSet<String>,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            issued: HashSet::new(),
        }
    }

    /// Fresh gene identity, e.g. `QXLPYG`.
    pub fn gene_ident(&mut self) -> String {
        loop {
            let ident: String = (0..GENE_IDENT_LEN)
                .map(|_| IDENT_ALPHABET[self.rng.gen_range(0..IDENT_ALPHABET.len())] as char)
                .collect();
            if self.issued.insert(ident.clone()) {
                return ident;
            }
        }
    }

    /// Fresh genome identity, e.g. `T125-659-499`.
    pub fn genome_ident(&mut self) -> String {
        loop {
            let ident = format!(
                "T{:03}-{:03}-{:03}",
                self.rng.gen_range(0..1000),
                self.rng.gen_range(0..1000),
                self.rng.gen_range(0..1000)
            );
            if self.issued.insert(ident.clone()) {
                return ident;
            }
        }
    }

    /// Uniform draw in [0, 1).
    pub fn uniform(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Uniform integer in `low..=high`.
    pub fn between(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..=high)
    }

    /// Zero-mean Gaussian noise with the given standard deviation.
    pub fn gaussian(&mut self, sigma: f32) -> f32 {
        let noise: f32 = self.rng.sample(rand_distr::StandardNormal);
        noise * sigma
    }

    /// Uniformly chosen element.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// A new weight gene with a fresh identity and a small random weight.
    pub fn fresh_weight(
        &mut self,
        config: &MutationConfig,
        from: (&str, usize),
        to: (&str, usize),
    ) -> WeightAllele {
        let gene = Gene::new(self.gene_ident())
            .with_dominance(config.new_gene_dominance)
            .with_mutation_rate(config.new_gene_mutation_rate);
        let weight = self.gaussian(config.initial_weight_sigma);
        WeightAllele::new(gene, weight, from, to)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
