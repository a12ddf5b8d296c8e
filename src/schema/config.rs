//! Configuration types for mutation and structural-edit parameters.

use serde::{Deserialize, Serialize};

use super::{MAX_DOMINANCE, MIN_DOMINANCE};

/// Settings threaded into every mutation and structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Standard deviation of the zero-mean weight perturbation.
    #[serde(default = "default_weight_sigma")]
    pub weight_sigma: f32,
    /// Standard deviation of the mutation-rate perturbation.
    #[serde(default = "default_rate_sigma")]
    pub rate_sigma: f32,
    /// Standard deviation of the initial weight of newly created weight genes.
    #[serde(default = "default_initial_weight_sigma")]
    pub initial_weight_sigma: f32,
    /// Largest node-count change for duplicable layers. Other layers move by one.
    #[serde(default = "default_max_node_delta")]
    pub max_node_delta: usize,
    /// Dominance given to newly created weight genes.
    #[serde(default = "default_new_gene_dominance")]
    pub new_gene_dominance: u8,
    /// Mutation rate given to newly created weight genes.
    #[serde(default = "default_new_gene_mutation_rate")]
    pub new_gene_mutation_rate: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weight_sigma: default_weight_sigma(),
            rate_sigma: default_rate_sigma(),
            initial_weight_sigma: default_initial_weight_sigma(),
            max_node_delta: default_max_node_delta(),
            new_gene_dominance: default_new_gene_dominance(),
            new_gene_mutation_rate: default_new_gene_mutation_rate(),
        }
    }
}

fn default_weight_sigma() -> f32 {
    0.1
}
fn default_rate_sigma() -> f32 {
    0.001
}
fn default_initial_weight_sigma() -> f32 {
    0.1
}
fn default_max_node_delta() -> usize {
    4
}
fn default_new_gene_dominance() -> u8 {
    3
}
fn default_new_gene_mutation_rate() -> f32 {
    0.01
}

impl MutationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check_sigma = |value: f32, name: &'static str| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidSigma { name, value })
            }
        };
        check_sigma(self.weight_sigma, "weight_sigma")?;
        check_sigma(self.rate_sigma, "rate_sigma")?;
        check_sigma(self.initial_weight_sigma, "initial_weight_sigma")?;

        if self.max_node_delta == 0 {
            return Err(ConfigError::InvalidNodeDelta);
        }
        if !(MIN_DOMINANCE..=MAX_DOMINANCE).contains(&self.new_gene_dominance) {
            return Err(ConfigError::InvalidDominance(self.new_gene_dominance));
        }
        if !(0.0..=1.0).contains(&self.new_gene_mutation_rate) {
            return Err(ConfigError::InvalidMutationRate(
                self.new_gene_mutation_rate,
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidSigma { name: &'static str, value: f32 },
    #[error("Maximum node delta must be at least 1")]
    InvalidNodeDelta,
    #[error("Dominance {0} is outside 1..=5")]
    InvalidDominance(u8),
    #[error("Mutation rate {0} is outside 0.0..=1.0")]
    InvalidMutationRate(f32),
}
