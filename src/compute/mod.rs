//! Compute module - Expression, alignment and genetic operators.

mod align;
mod expression;
mod topology;

pub mod evolution;

pub use align::*;
pub use expression::*;
pub use topology::*;

/// Errors raised by genome operations.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    #[error("Layer {layer} is not present on the chromosome")]
    UnknownLayer { layer: String },

    #[error("Weight gene {gene} references layer {layer}, which the genome does not carry")]
    DanglingWeight { gene: String, layer: String },

    #[error("Cannot resolve a {expected} allele against a {found} allele")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Layer {layer} has no node count of its own")]
    NotResizable { layer: String },

    #[error("Layer {layer} cannot have {nodes} nodes")]
    InvalidNodeCount { layer: String, nodes: i64 },

    #[error("Layer {layer} of kind {kind} cannot be duplicated")]
    NotDuplicable {
        layer: String,
        kind: crate::schema::LayerKind,
    },

    #[error("Merge chain through {layer} loops back on itself")]
    CyclicMerge { layer: String },
}
