//! Allele types: the genetic parameters every gene carries, plus the
//! connection-weight and layer payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest dominance an allele can have.
pub const MIN_DOMINANCE: u8 = 1;
/// Highest dominance an allele can have.
pub const MAX_DOMINANCE: u8 = 5;

/// Identity given to null placeholders.
pub const PLACEHOLDER_IDENT: &str = "null";

/// Genetic parameters shared by every allele.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Identity token, stable across copies of the same gene.
    pub ident: String,
    /// Dominance (1-5). The higher value wins at expression.
    pub dominance: u8,
    /// Whether the allele takes part in mutation at all.
    pub mutable: bool,
    /// Whether a layer allele may duplicate or gain inputs.
    #[serde(default)]
    pub duplicable: bool,
    /// Probability of mutating per pass (0.0-1.0).
    pub mutation_rate: f32,
}

impl Gene {
    /// An immutable gene with middling dominance.
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            dominance: 3,
            mutable: false,
            duplicable: false,
            mutation_rate: 0.0,
        }
    }

    /// Set the dominance, unchecked against the 1..=5 bounds.
    pub fn with_dominance(mut self, dominance: u8) -> Self {
        self.dominance = dominance;
        self
    }

    /// Make the gene mutable at the given rate.
    pub fn with_mutation_rate(mut self, rate: f32) -> Self {
        self.mutable = true;
        self.mutation_rate = rate;
        self
    }

    /// Allow layer alleles carrying this gene to duplicate and gain inputs.
    pub fn with_duplicable(mut self, duplicable: bool) -> Self {
        self.duplicable = duplicable;
        self
    }
}

/// A single connection weight between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAllele {
    pub gene: Gene,
    /// Connection value.
    pub weight: f32,
    /// Node index within the source layer.
    pub in_node: usize,
    /// Node index within the destination layer.
    pub out_node: usize,
    /// Identity of the source layer.
    pub in_layer: String,
    /// Identity of the destination layer.
    pub out_layer: String,
}

impl WeightAllele {
    pub fn new(
        gene: Gene,
        weight: f32,
        (in_layer, in_node): (&str, usize),
        (out_layer, out_node): (&str, usize),
    ) -> Self {
        Self {
            gene,
            weight,
            in_node,
            out_node,
            in_layer: in_layer.to_string(),
            out_layer: out_layer.to_string(),
        }
    }

    /// The connection tuple this allele describes.
    pub fn connection(&self) -> (&str, usize, &str, usize) {
        (&self.in_layer, self.in_node, &self.out_layer, self.out_node)
    }

    /// Two weight alleles describe the same connection when their layer and
    /// node indices match; identity is irrelevant.
    pub fn same_connection(&self, other: &WeightAllele) -> bool {
        self.connection() == other.connection()
    }

    /// Whether this allele belongs to the `source -> target` block.
    pub fn joins(&self, source: &str, target: &str) -> bool {
        self.in_layer == source && self.out_layer == target
    }
}

/// Kind of a network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Data source; no inputs.
    Input,
    /// Fully connected (inner product) layer.
    FullyConnected,
    /// Merge layer; width is the sum of its inputs.
    Concat,
    /// Recurrent short-term memory layer.
    Memory,
    /// Loss layer; consumes without weights.
    Loss,
    /// Alignment filler.
    Null,
}

impl LayerKind {
    /// Layers that own incoming weight genes.
    pub fn is_weighted(self) -> bool {
        matches!(self, LayerKind::FullyConnected | LayerKind::Memory)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerKind::Input => "input",
            LayerKind::FullyConnected => "fully_connected",
            LayerKind::Concat => "concat",
            LayerKind::Memory => "memory",
            LayerKind::Loss => "loss",
            LayerKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// A network layer: its size, kind and upstream layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerAllele {
    pub gene: Gene,
    /// Upstream layer identities, in order.
    pub inputs: Vec<String>,
    /// Node count; `None` for merge layers and placeholders.
    pub nodes: Option<usize>,
    pub kind: LayerKind,
}

impl LayerAllele {
    pub fn new<I, S>(gene: Gene, kind: LayerKind, nodes: Option<usize>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gene,
            inputs: inputs.into_iter().map(Into::into).collect(),
            nodes,
            kind,
        }
    }

    /// Null filler used to keep paired chromosomes index-aligned.
    pub fn placeholder() -> Self {
        Self {
            gene: Gene::new(PLACEHOLDER_IDENT),
            inputs: Vec::new(),
            nodes: None,
            kind: LayerKind::Null,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == LayerKind::Null
    }

    pub fn ident(&self) -> &str {
        &self.gene.ident
    }

    /// Whether `ident` is listed among this layer's inputs.
    pub fn takes_input(&self, ident: &str) -> bool {
        self.inputs.iter().any(|i| i == ident)
    }
}

/// Closed union over the two allele kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Allele {
    Weight(WeightAllele),
    Layer(LayerAllele),
}

impl Allele {
    pub fn gene(&self) -> &Gene {
        match self {
            Allele::Weight(w) => &w.gene,
            Allele::Layer(l) => &l.gene,
        }
    }

    pub fn gene_mut(&mut self) -> &mut Gene {
        match self {
            Allele::Weight(w) => &mut w.gene,
            Allele::Layer(l) => &mut l.gene,
        }
    }

    /// Short name of the allele kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Allele::Weight(_) => "weight",
            Allele::Layer(_) => "layer",
        }
    }
}

impl From<WeightAllele> for Allele {
    fn from(w: WeightAllele) -> Self {
        Allele::Weight(w)
    }
}

impl From<LayerAllele> for Allele {
    fn from(l: LayerAllele) -> Self {
        Allele::Layer(l)
    }
}
