//! Schema module - Allele, genome and mutation-setting types.

mod allele;
mod config;
mod genome;

pub use allele::*;
pub use config::*;
pub use genome::*;
