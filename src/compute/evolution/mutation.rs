//! Per-allele mutation and the genome-wide mutation pass.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::GenomeRng;
use super::structure::{add_input, change_node_count, duplicate_layer};
use crate::compute::GenomeError;
use crate::schema::{
    Allele, Gene, Genome, LayerAllele, LayerKind, MAX_DOMINANCE, MIN_DOMINANCE, MutationConfig,
    Side, Strand, WeightAllele,
};

/// One mutation applied to an allele.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Dominance moved by one step.
    Dominance(i8),
    /// Weight perturbed by the given amount.
    Weight(f32),
    /// Node count changed.
    Nodes(i64),
    /// Mutation rate changed by the effective (post-clamp) amount.
    Rate(f32),
    /// Layer duplicated.
    Duplicate,
    /// Layer gained an input.
    AddInput,
}

impl Mutation {
    /// Mutations that reshape the network rather than a single value.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Mutation::Nodes(_) | Mutation::Duplicate | Mutation::AddInput
        )
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Dominance(delta) => write!(f, "Dominance,{delta:+}"),
            Mutation::Weight(delta) => write!(f, "Weight,{delta:+}"),
            Mutation::Nodes(delta) => write!(f, "Nodes,{delta:+}"),
            Mutation::Rate(delta) => write!(f, "Rate,{delta:+}"),
            Mutation::Duplicate => f.write_str("Duplicate,"),
            Mutation::AddInput => f.write_str("Add input,"),
        }
    }
}

/// A mutation together with the allele it hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub strand: Strand,
    /// Identity of the mutated allele.
    pub ident: String,
    pub mutation: Mutation,
}

#[derive(Clone, Copy)]
enum Target {
    Dominance,
    Value,
    Rate,
    Duplicate,
    AddInput,
}

/// Whether a gene mutates on this pass. Immutable genes never draw.
fn gate(gene: &Gene, rng: &mut GenomeRng) -> bool {
    gene.mutable && rng.uniform() < gene.mutation_rate
}

fn dominance_step(dominance: u8, rng: &mut GenomeRng) -> i8 {
    if dominance <= MIN_DOMINANCE {
        1
    } else if dominance >= MAX_DOMINANCE {
        -1
    } else if rng.coin() {
        1
    } else {
        -1
    }
}

fn rate_step(rate: f32, config: &MutationConfig, rng: &mut GenomeRng) -> f32 {
    let shifted = (rate + rng.gaussian(config.rate_sigma)).clamp(0.0, 1.0);
    shifted - rate
}

impl Gene {
    fn shift_dominance(&mut self, delta: i8) {
        let shifted = i16::from(self.dominance) + i16::from(delta);
        self.dominance = shifted.clamp(i16::from(MIN_DOMINANCE), i16::from(MAX_DOMINANCE)) as u8;
    }

    fn shift_rate(&mut self, delta: f32) {
        self.mutation_rate = (self.mutation_rate + delta).clamp(0.0, 1.0);
    }
}

impl WeightAllele {
    /// Decide what, if anything, mutates in this allele. Leaves it untouched.
    pub fn roll_mutation(&self, rng: &mut GenomeRng, config: &MutationConfig) -> Option<Mutation> {
        if !gate(&self.gene, rng) {
            return None;
        }
        let target = *rng.pick(&[Target::Dominance, Target::Value, Target::Rate])?;
        Some(match target {
            Target::Dominance => Mutation::Dominance(dominance_step(self.gene.dominance, rng)),
            Target::Rate => Mutation::Rate(rate_step(self.gene.mutation_rate, config, rng)),
            _ => Mutation::Weight(rng.gaussian(config.weight_sigma)),
        })
    }

    pub fn apply_mutation(&mut self, mutation: &Mutation) {
        match *mutation {
            Mutation::Dominance(delta) => self.gene.shift_dominance(delta),
            Mutation::Weight(delta) => self.weight += delta,
            Mutation::Rate(delta) => self.gene.shift_rate(delta),
            _ => {}
        }
    }

    /// Roll and apply in one step.
    pub fn mutate(&mut self, rng: &mut GenomeRng, config: &MutationConfig) -> Option<Mutation> {
        let mutation = self.roll_mutation(rng, config)?;
        self.apply_mutation(&mutation);
        Some(mutation)
    }
}

impl LayerAllele {
    fn can_duplicate(&self) -> bool {
        !matches!(self.kind, LayerKind::Concat | LayerKind::Loss | LayerKind::Null)
    }

    fn can_gain_input(&self) -> bool {
        self.kind.is_weighted() || self.kind == LayerKind::Concat
    }

    /// Decide what, if anything, mutates in this layer. Leaves it untouched.
    ///
    /// Node counts only move on weighted layers; duplication and input
    /// addition require the gene to be duplicable.
    pub fn roll_mutation(&self, rng: &mut GenomeRng, config: &MutationConfig) -> Option<Mutation> {
        if self.is_placeholder() || !gate(&self.gene, rng) {
            return None;
        }

        let mut targets = vec![Target::Dominance, Target::Rate];
        if self.kind.is_weighted() && self.nodes.is_some() {
            targets.push(Target::Value);
        }
        if self.gene.duplicable {
            if self.can_duplicate() {
                targets.push(Target::Duplicate);
            }
            if self.can_gain_input() {
                targets.push(Target::AddInput);
            }
        }

        let target = *rng.pick(&targets)?;
        Some(match target {
            Target::Dominance => Mutation::Dominance(dominance_step(self.gene.dominance, rng)),
            Target::Rate => Mutation::Rate(rate_step(self.gene.mutation_rate, config, rng)),
            Target::Value => Mutation::Nodes(self.node_step(rng, config)),
            Target::Duplicate => Mutation::Duplicate,
            Target::AddInput => Mutation::AddInput,
        })
    }

    fn node_step(&self, rng: &mut GenomeRng, config: &MutationConfig) -> i64 {
        let nodes = self.nodes.unwrap_or(1);
        let magnitude = if self.gene.duplicable {
            rng.between(1, config.max_node_delta.max(1))
        } else {
            1
        };
        // Never shrink to zero nodes.
        if nodes > magnitude && rng.coin() {
            -(magnitude as i64)
        } else {
            magnitude as i64
        }
    }

    /// Apply the scalar part of a mutation. Node changes only touch this
    /// allele; genome passes route them through [`change_node_count`].
    pub(crate) fn apply_mutation(&mut self, mutation: &Mutation) {
        match *mutation {
            Mutation::Dominance(delta) => self.gene.shift_dominance(delta),
            Mutation::Rate(delta) => self.gene.shift_rate(delta),
            Mutation::Nodes(delta) => {
                if let Some(nodes) = self.nodes {
                    self.nodes = Some((nodes as i64 + delta).max(1) as usize);
                }
            }
            _ => {}
        }
    }

    /// Roll and apply in one step, on this allele alone.
    ///
    /// A node change resizes the layer without touching any weight gene. To
    /// keep a genome consistent, mutate it with [`GenomeRng::mutate`].
    pub fn mutate(&mut self, rng: &mut GenomeRng, config: &MutationConfig) -> Option<Mutation> {
        let mutation = self.roll_mutation(rng, config)?;
        self.apply_mutation(&mutation);
        Some(mutation)
    }
}

impl Allele {
    pub fn mutate(&mut self, rng: &mut GenomeRng, config: &MutationConfig) -> Option<Mutation> {
        match self {
            Allele::Weight(w) => w.mutate(rng, config),
            Allele::Layer(l) => l.mutate(rng, config),
        }
    }
}

impl GenomeRng {
    /// Run one mutation pass over every allele of the genome.
    ///
    /// Every decision is drawn against the unmutated genome first. Scalar
    /// changes are then applied in place, and structural edits run per side
    /// against the allele they were rolled for. On error the genome is left
    /// untouched.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        config: &MutationConfig,
    ) -> Result<Vec<MutationEvent>, GenomeError> {
        let mut plan: Vec<(Strand, usize, Mutation)> = Vec::new();
        for (i, layer) in genome.layer_a.iter().enumerate() {
            if let Some(m) = layer.roll_mutation(self, config) {
                plan.push((Strand::LayerA, i, m));
            }
        }
        for (i, layer) in genome.layer_b.iter().enumerate() {
            if let Some(m) = layer.roll_mutation(self, config) {
                plan.push((Strand::LayerB, i, m));
            }
        }
        for (i, weight) in genome.weight_a.iter().enumerate() {
            if let Some(m) = weight.roll_mutation(self, config) {
                plan.push((Strand::WeightA, i, m));
            }
        }
        for (i, weight) in genome.weight_b.iter().enumerate() {
            if let Some(m) = weight.roll_mutation(self, config) {
                plan.push((Strand::WeightB, i, m));
            }
        }

        let mut next = genome.clone();
        let mut events = Vec::with_capacity(plan.len());
        let mut structural = Vec::new();
        for (strand, index, mutation) in plan {
            let ident = match strand {
                Strand::LayerA => genome.layer_a[index].ident(),
                Strand::LayerB => genome.layer_b[index].ident(),
                Strand::WeightA => genome.weight_a[index].gene.ident.as_str(),
                Strand::WeightB => genome.weight_b[index].gene.ident.as_str(),
            }
            .to_string();

            if mutation.is_structural() {
                structural.push((strand, ident, mutation));
                continue;
            }
            match strand {
                Strand::LayerA => next.layer_a[index].apply_mutation(&mutation),
                Strand::LayerB => next.layer_b[index].apply_mutation(&mutation),
                Strand::WeightA => next.weight_a[index].apply_mutation(&mutation),
                Strand::WeightB => next.weight_b[index].apply_mutation(&mutation),
            }
            events.push(MutationEvent {
                strand,
                ident,
                mutation,
            });
        }

        for (strand, ident, mutation) in structural {
            let side = if strand == Strand::LayerA { Side::A } else { Side::B };
            let (layers, weights) = next.side_mut(side);
            match mutation {
                Mutation::Nodes(delta) => {
                    change_node_count(&ident, delta, layers, weights, self, config)?;
                }
                Mutation::Duplicate => {
                    let copy = duplicate_layer(&ident, layers, weights, self, config)?;
                    debug!("Duplicated {ident} as {copy} on {strand}");
                }
                Mutation::AddInput => match add_input(&ident, layers, weights, self, config)? {
                    Some(source) => debug!("{ident} on {strand} now reads {source}"),
                    None => {
                        debug!("No new input available for {ident} on {strand}");
                        continue;
                    }
                },
                _ => {}
            }
            events.push(MutationEvent {
                strand,
                ident,
                mutation,
            });
        }

        debug!("Genome {}: {} mutation(s)", genome.ident, events.len());
        *genome = next;
        Ok(events)
    }
}
