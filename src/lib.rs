//! Diploid neural-network genomes.
//!
//! This crate encodes a neural network's topology and weights as a diploid
//! genome: two homologous layer chromosomes and two homologous weight
//! chromosomes. Dominance decides which allele is expressed, and the genetic
//! operators (mutation, structural edits, crossover, recombination) keep the
//! weight chromosomes consistent with the layers they connect.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Allele, genome and configuration types
//! - `compute`: Expression, alignment, topology and the genetic operators
//!
//! # Example
//!
//! ```rust,no_run
//! use diploid_net::{
//!     schema::{Gene, Genome, LayerAllele, LayerKind, WeightAllele},
//!     compute::evolution::GenomeRng,
//! };
//!
//! let layers = vec![
//!     LayerAllele::new(Gene::new("IN"), LayerKind::Input, Some(2), Vec::<String>::new()),
//!     LayerAllele::new(Gene::new("OUT"), LayerKind::FullyConnected, Some(1), ["IN"]),
//! ];
//! let weights = vec![
//!     WeightAllele::new(Gene::new("w0"), 0.5, ("IN", 0), ("OUT", 0)),
//!     WeightAllele::new(Gene::new("w1"), -0.5, ("IN", 1), ("OUT", 0)),
//! ];
//! let genome = Genome::from_haploid("T000-000-000", layers, weights);
//!
//! // Express the phenotype the network backend builds from
//! let phenotype = genome.express().unwrap();
//! println!("{} layers, {} weights", phenotype.layers.len(), phenotype.weights.len());
//!
//! // Breed a child
//! let mut rng = GenomeRng::new(7);
//! let child = rng.recombine(&genome, &genome);
//! println!("Child {}", child.ident);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::GenomeError;
pub use compute::evolution::GenomeRng;
pub use schema::{Allele, Genome, LayerAllele, MutationConfig, WeightAllele};
