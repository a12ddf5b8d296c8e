//! Meiosis: crossover within a genome, gamete formation and recombination
//! of two parents.

use std::collections::HashSet;

use log::debug;

use super::GenomeRng;
use crate::compute::{equalize, shared_prefix};
use crate::schema::{Genome, LayerAllele, WeightAllele};

/// One haploid half of a genome, handed to a child.
#[derive(Debug, Clone, PartialEq)]
pub struct Gamete {
    pub layers: Vec<LayerAllele>,
    pub weights: Vec<WeightAllele>,
}

fn joined(prefix: &[LayerAllele], suffix: &[LayerAllele]) -> Vec<LayerAllele> {
    prefix
        .iter()
        .chain(suffix)
        .filter(|l| !l.is_placeholder())
        .cloned()
        .collect()
}

impl GenomeRng {
    /// Cross the two homologous sides of a genome over.
    ///
    /// The layer breakpoint is a random position inside the region where
    /// both layer chromosomes still agree. The weight breakpoint is drawn
    /// from the agreeing weight prefix, restricted to genes whose layers both
    /// lie before the layer breakpoint. Everything after the breakpoints is
    /// swapped between the sides. With no shared region the sides swap
    /// entirely.
    pub fn crossover(&mut self, genome: &Genome) -> Genome {
        let (mut layers_a, mut layers_b) = (genome.layer_a.clone(), genome.layer_b.clone());
        equalize(&mut layers_a, &mut layers_b);

        let layer_pairs = shared_prefix(&layers_a, &layers_b);
        let layer_cut = self.pick(&layer_pairs).copied();
        let (la, lb) = layer_cut.map_or((0, 0), |(i, j)| (i + 1, j + 1));

        let before_cut: HashSet<&str> = layers_a[..la]
            .iter()
            .filter(|l| !l.is_placeholder())
            .map(|l| l.ident())
            .collect();
        let weight_pairs: Vec<(usize, usize)> = shared_prefix(&genome.weight_a, &genome.weight_b)
            .into_iter()
            .take_while(|&(i, _)| {
                let w = &genome.weight_a[i];
                before_cut.contains(w.in_layer.as_str())
                    && before_cut.contains(w.out_layer.as_str())
            })
            .collect();
        let weight_cut = self.pick(&weight_pairs).copied();
        let (wa, wb) = weight_cut.map_or((0, 0), |(i, j)| (i + 1, j + 1));

        debug!(
            "Crossover of {} at layer {:?}, weight {:?}",
            genome.ident, layer_cut, weight_cut
        );

        Genome {
            ident: self.genome_ident(),
            layer_a: joined(&layers_a[..la], &layers_b[lb..]),
            layer_b: joined(&layers_b[..lb], &layers_a[la..]),
            weight_a: [&genome.weight_a[..wa], &genome.weight_b[wb..]].concat(),
            weight_b: [&genome.weight_b[..wb], &genome.weight_a[wa..]].concat(),
        }
    }

    /// Cross the genome over and keep one random side.
    pub fn gamete(&mut self, genome: &Genome) -> Gamete {
        let crossed = self.crossover(genome);
        if self.coin() {
            Gamete {
                layers: crossed.layer_a,
                weights: crossed.weight_a,
            }
        } else {
            Gamete {
                layers: crossed.layer_b,
                weights: crossed.weight_b,
            }
        }
    }

    /// Produce a child with one gamete from each parent: side A from
    /// `genome`, side B from `other`.
    ///
    /// Recombining a genome with a gene-for-gene copy of itself yields that
    /// same genome under a new identity.
    pub fn recombine(&mut self, genome: &Genome, other: &Genome) -> Genome {
        if genome.same_genes(other) {
            return Genome {
                ident: self.genome_ident(),
                ..genome.clone()
            };
        }

        let from_genome = self.gamete(genome);
        let from_other = self.gamete(other);
        let child = Genome {
            ident: self.genome_ident(),
            layer_a: from_genome.layers,
            layer_b: from_other.layers,
            weight_a: from_genome.weights,
            weight_b: from_other.weights,
        };
        debug!("{} x {} -> {}", genome.ident, other.ident, child.ident);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Gene, LayerKind};

    fn layer(ident: &str, kind: LayerKind, nodes: Option<usize>, inputs: &[&str]) -> LayerAllele {
        LayerAllele::new(Gene::new(ident), kind, nodes, inputs.iter().copied())
    }

    fn weights_for(prefix: &str, source: &str, target: &str, count: usize) -> Vec<WeightAllele> {
        (0..count)
            .map(|o| {
                WeightAllele::new(
                    Gene::new(format!("{prefix}{o}")),
                    1.0,
                    (source, 0),
                    (target, o),
                )
            })
            .collect()
    }

    fn chain(prefix: &str, depth: usize) -> (Vec<LayerAllele>, Vec<WeightAllele>) {
        let mut layers = vec![layer("IN", LayerKind::Input, Some(1), &[])];
        let mut weights = Vec::new();
        let mut previous = "IN".to_string();
        for d in 0..depth {
            let name = format!("{prefix}{d}");
            layers.push(layer(&name, LayerKind::FullyConnected, Some(2), &[previous.as_str()]));
            weights.extend(weights_for(&format!("{name}_w"), &previous, &name, 2));
            previous = name;
        }
        (layers, weights)
    }

    fn idents(layers: &[LayerAllele]) -> Vec<&str> {
        layers.iter().map(|l| l.ident()).collect()
    }

    #[test]
    fn test_crossover_identical_sides() {
        let mut rng = GenomeRng::new(1);
        let (layers, weights) = chain("h", 3);
        let genome = Genome::from_haploid("T000-000-001", layers, weights);
        for _ in 0..20 {
            let crossed = rng.crossover(&genome);
            assert!(crossed.same_genes(&genome));
            assert_ne!(crossed.ident, genome.ident);
        }
    }

    #[test]
    fn test_crossover_preserves_genes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = GenomeRng::new(2);
        let (layers_a, weights_a) = chain("a", 3);
        let (layers_b, weights_b) = chain("b", 2);
        let genome = Genome::new("T000-000-002", layers_a, layers_b, weights_a, weights_b);
        for _ in 0..20 {
            let crossed = rng.crossover(&genome);
            assert_eq!(
                crossed.layer_a.len() + crossed.layer_b.len(),
                genome.layer_a.len() + genome.layer_b.len()
            );
            assert_eq!(
                crossed.weight_a.len() + crossed.weight_b.len(),
                genome.weight_a.len() + genome.weight_b.len()
            );
            assert!(crossed.layer_a.iter().all(|l| !l.is_placeholder()));
        }
    }

    #[test]
    fn test_crossover_swaps_after_shared_region() {
        let mut rng = GenomeRng::new(3);
        let (layers_a, weights_a) = chain("a", 2);
        let (layers_b, weights_b) = chain("b", 2);
        let genome = Genome::new("T000-000-003", layers_a, layers_b, weights_a, weights_b);
        // only IN is shared, so every crossover cuts right after it
        let crossed = rng.crossover(&genome);
        assert_eq!(idents(&crossed.layer_a), vec!["IN", "b0", "b1"]);
        assert_eq!(idents(&crossed.layer_b), vec!["IN", "a0", "a1"]);
        // no weight gene lies wholly before the cut, so weights swap entirely
        assert_eq!(crossed.weight_a, genome.weight_b);
        assert_eq!(crossed.weight_b, genome.weight_a);
    }

    #[test]
    fn test_recombine_self_is_identity() {
        let mut rng = GenomeRng::new(4);
        let (layers, weights) = chain("h", 2);
        let genome = Genome::from_haploid("T000-000-004", layers, weights);
        let twin = genome.clone();
        let child = rng.recombine(&genome, &twin);
        assert!(child.same_genes(&genome));
    }

    #[test]
    fn test_recombine_unrelated_parents() {
        let mut rng = GenomeRng::new(5);
        let (la, wa) = chain("a", 3);
        let (lb, wb) = chain("b", 1);
        let mother = Genome::from_haploid("T000-000-005", la, wa);
        let (xa, xb) = (
            vec![layer("X", LayerKind::Input, Some(2), &[])],
            weights_for("xw", "X", "Y", 2),
        );
        let mut father = Genome::from_haploid("T000-000-006", lb, wb);
        father.layer_b = xa;
        father.weight_b = xb;

        for _ in 0..20 {
            let child = rng.recombine(&mother, &father);
            // a haploid parent always hands over one of its own chromosomes
            assert_eq!(child.layer_a, mother.layer_a);
            assert_eq!(child.weight_a, mother.weight_a);
            let lengths = (child.layer_b.len(), child.weight_b.len());
            assert!(lengths == (2, 2) || lengths == (1, 2));
        }
    }

    #[test]
    fn test_recombine_shared_weights_consistent() {
        let mut rng = GenomeRng::new(6);
        let (layers, weights) = chain("h", 2);
        let mother = Genome::from_haploid("T000-000-007", layers.clone(), weights.clone());
        let mut father = Genome::from_haploid("T000-000-008", layers, weights);
        father.weight_b[0].weight = -1.0;

        let child = rng.recombine(&mother, &father);
        let a: Vec<&str> = child.weight_a.iter().map(|w| w.gene.ident.as_str()).collect();
        let b: Vec<&str> = child.weight_b.iter().map(|w| w.gene.ident.as_str()).collect();
        assert_eq!(a, b);
        assert_eq!(child.layer_a, child.layer_b);
    }
}
