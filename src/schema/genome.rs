//! The diploid genome: two layer chromosomes and two weight chromosomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{LayerAllele, WeightAllele};

/// One of the four chromosomes of a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    LayerA,
    LayerB,
    WeightA,
    WeightB,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strand::LayerA => "layer A",
            Strand::LayerB => "layer B",
            Strand::WeightA => "weight A",
            Strand::WeightB => "weight B",
        };
        f.write_str(name)
    }
}

/// Which homologous side of a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

/// Network topology and weights encoded as two homologous chromosome pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Genome identity token.
    pub ident: String,
    pub layer_a: Vec<LayerAllele>,
    pub layer_b: Vec<LayerAllele>,
    pub weight_a: Vec<WeightAllele>,
    pub weight_b: Vec<WeightAllele>,
}

impl Genome {
    pub fn new(
        ident: impl Into<String>,
        layer_a: Vec<LayerAllele>,
        layer_b: Vec<LayerAllele>,
        weight_a: Vec<WeightAllele>,
        weight_b: Vec<WeightAllele>,
    ) -> Self {
        Self {
            ident: ident.into(),
            layer_a,
            layer_b,
            weight_a,
            weight_b,
        }
    }

    /// Seed a genome whose homologous chromosomes start out identical.
    pub fn from_haploid(
        ident: impl Into<String>,
        layers: Vec<LayerAllele>,
        weights: Vec<WeightAllele>,
    ) -> Self {
        Self::new(ident, layers.clone(), layers, weights.clone(), weights)
    }

    /// Layer and weight chromosome of one side.
    pub fn side(&self, side: Side) -> (&[LayerAllele], &[WeightAllele]) {
        match side {
            Side::A => (&self.layer_a, &self.weight_a),
            Side::B => (&self.layer_b, &self.weight_b),
        }
    }

    /// Mutable layer and weight chromosome of one side.
    pub fn side_mut(&mut self, side: Side) -> (&mut Vec<LayerAllele>, &mut Vec<WeightAllele>) {
        match side {
            Side::A => (&mut self.layer_a, &mut self.weight_a),
            Side::B => (&mut self.layer_b, &mut self.weight_b),
        }
    }

    /// Whether the genome carries a layer with this identity on either
    /// layer chromosome.
    pub fn carries_layer(&self, ident: &str) -> bool {
        self.layer_a
            .iter()
            .chain(self.layer_b.iter())
            .any(|l| !l.is_placeholder() && l.ident() == ident)
    }

    /// Same genes in the same order on all four chromosomes. The genome
    /// identity is not compared.
    pub fn same_genes(&self, other: &Genome) -> bool {
        self.layer_a == other.layer_a
            && self.layer_b == other.layer_b
            && self.weight_a == other.weight_a
            && self.weight_b == other.weight_b
    }

    /// Total number of alleles over all four chromosomes.
    pub fn allele_count(&self) -> usize {
        self.layer_a.len() + self.layer_b.len() + self.weight_a.len() + self.weight_b.len()
    }
}
