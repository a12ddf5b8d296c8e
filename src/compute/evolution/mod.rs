//! Genetic operators on diploid genomes.
//!
//! # Overview
//!
//! - **Random source** (`genome`): [`GenomeRng`] owns the seeded generator and
//!   hands out fresh gene and genome identities
//! - **Mutation** (`mutation`): per-allele rolls and the genome-wide pass
//! - **Structural edits** (`structure`): node-count changes, duplication and
//!   input addition, each keeping weight blocks complete
//! - **Meiosis** (`crossover`): crossover, gamete formation, recombination
//!
//! # Example
//!
//! ```rust,no_run
//! use diploid_net::compute::evolution::GenomeRng;
//! use diploid_net::schema::{Gene, Genome, LayerAllele, LayerKind, MutationConfig};
//!
//! let layers = vec![
//!     LayerAllele::new(Gene::new("IN"), LayerKind::Input, Some(2), Vec::<String>::new()),
//!     LayerAllele::new(
//!         Gene::new("OUT").with_mutation_rate(0.1),
//!         LayerKind::FullyConnected,
//!         Some(1),
//!         ["IN"],
//!     ),
//! ];
//! let parent = Genome::from_haploid("T000-000-000", layers, Vec::new());
//!
//! let mut rng = GenomeRng::new(42);
//! let config = MutationConfig::default();
//! let mut child = rng.recombine(&parent, &parent);
//! let events = rng.mutate(&mut child, &config).unwrap();
//! for event in &events {
//!     println!("{} {}: {}", event.strand, event.ident, event.mutation);
//! }
//! ```

mod crossover;
mod genome;
mod mutation;
mod structure;

pub use crossover::Gamete;
pub use genome::GenomeRng;
pub use mutation::{Mutation, MutationEvent};
pub use structure::{add_input, change_node_count, choose_new_input, dup_weights, duplicate_layer};
