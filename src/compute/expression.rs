//! Expression: resolving alleles into the phenotype a network backend builds.
//!
//! Layers are expressed first, in chromosome order, into an [`ActiveRegistry`]
//! of resolved widths. Weights are expressed afterwards against that registry.

use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::schema::{Allele, Genome, LayerAllele, LayerKind, WeightAllele};

use super::GenomeError;
use super::align::{align_weights, equalize};

/// Resolved widths of the layers expressed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveRegistry {
    widths: HashMap<String, usize>,
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ident: impl Into<String>, width: usize) {
        self.widths.insert(ident.into(), width);
    }

    /// Register an expressed layer.
    pub fn record(&mut self, layer: &ExpressedLayer) {
        self.insert(layer.ident.clone(), layer.nodes);
    }

    pub fn width(&self, ident: &str) -> Option<usize> {
        self.widths.get(ident).copied()
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.widths.contains_key(ident)
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ActiveRegistry {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        Self {
            widths: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A layer as the network backend receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressedLayer {
    pub ident: String,
    pub nodes: usize,
    pub kind: LayerKind,
    pub inputs: Vec<String>,
}

/// A connection value as the network backend receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressedWeight {
    pub in_layer: String,
    pub in_node: usize,
    pub out_layer: String,
    pub out_node: usize,
    pub weight: f32,
}

impl ExpressedWeight {
    fn from_allele(allele: &WeightAllele, weight: f32) -> Self {
        Self {
            in_layer: allele.in_layer.clone(),
            in_node: allele.in_node,
            out_layer: allele.out_layer.clone(),
            out_node: allele.out_node,
            weight,
        }
    }
}

/// Outcome of resolving one locus.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// One connection, or several independent ones.
    Weights(Vec<ExpressedWeight>),
    Layer(ExpressedLayer),
}

/// The full expressed network description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub layers: Vec<ExpressedLayer>,
    pub weights: Vec<ExpressedWeight>,
}

impl WeightAllele {
    /// Both endpoint layers are active and both node indices in range.
    pub fn can_read(&self, registry: &ActiveRegistry) -> bool {
        let fits = |layer: &str, node: usize| registry.width(layer).is_some_and(|w| node < w);
        fits(&self.in_layer, self.in_node) && fits(&self.out_layer, self.out_node)
    }
}

impl LayerAllele {
    /// Every input is already active. Placeholders are never readable.
    pub fn can_read(&self, registry: &ActiveRegistry) -> bool {
        !self.is_placeholder() && self.inputs.iter().all(|i| registry.contains(i))
    }

    /// Width this allele expresses with; merge layers sum their active inputs.
    fn resolved_width(&self, registry: &ActiveRegistry) -> usize {
        match (self.kind, self.nodes) {
            (LayerKind::Concat, _) | (_, None) => self
                .inputs
                .iter()
                .filter_map(|i| registry.width(i))
                .sum(),
            (_, Some(nodes)) => nodes,
        }
    }
}

impl Allele {
    pub fn can_read(&self, registry: &ActiveRegistry) -> bool {
        match self {
            Allele::Weight(w) => w.can_read(registry),
            Allele::Layer(l) => l.can_read(registry),
        }
    }
}

/// Resolve one locus, dispatching on the allele kind.
///
/// Returns `Ok(None)` when neither allele is readable.
pub fn express(
    allele: &Allele,
    registry: &ActiveRegistry,
    other: Option<&Allele>,
) -> Result<Option<Expression>, GenomeError> {
    match (allele, other) {
        (Allele::Weight(w), None) => Ok(express_weight(w, registry, None).map(Expression::Weights)),
        (Allele::Weight(w), Some(Allele::Weight(o))) => {
            Ok(express_weight(w, registry, Some(o)).map(Expression::Weights))
        }
        (Allele::Layer(l), None) => Ok(express_layer(l, registry, None).map(Expression::Layer)),
        (Allele::Layer(l), Some(Allele::Layer(o))) => {
            Ok(express_layer(l, registry, Some(o)).map(Expression::Layer))
        }
        (a, Some(o)) => Err(GenomeError::KindMismatch {
            expected: a.kind_name(),
            found: o.kind_name(),
        }),
    }
}

/// Resolve a weight locus.
///
/// Matching connections resolve by dominance; equal dominance is
/// co-dominant and yields the mean weight. Readable alleles describing
/// different connections are both emitted, `allele` first.
pub fn express_weight(
    allele: &WeightAllele,
    registry: &ActiveRegistry,
    other: Option<&WeightAllele>,
) -> Option<Vec<ExpressedWeight>> {
    let this = allele.can_read(registry).then_some(allele);
    let that = other.filter(|o| o.can_read(registry));

    match (this, that) {
        (None, None) => None,
        (Some(w), None) | (None, Some(w)) => Some(vec![ExpressedWeight::from_allele(w, w.weight)]),
        (Some(a), Some(b)) if a.same_connection(b) => {
            let weight = match a.gene.dominance.cmp(&b.gene.dominance) {
                std::cmp::Ordering::Greater => a.weight,
                std::cmp::Ordering::Less => b.weight,
                std::cmp::Ordering::Equal => (a.weight + b.weight) / 2.0,
            };
            Some(vec![ExpressedWeight::from_allele(a, weight)])
        }
        (Some(a), Some(b)) => Some(vec![
            ExpressedWeight::from_allele(a, a.weight),
            ExpressedWeight::from_allele(b, b.weight),
        ]),
    }
}

/// Resolve a layer locus.
///
/// The two alleles are compared positionally: the strictly more dominant
/// one wins, and a tie goes to `other`. Sizes and kinds are not averaged.
pub fn express_layer(
    allele: &LayerAllele,
    registry: &ActiveRegistry,
    other: Option<&LayerAllele>,
) -> Option<ExpressedLayer> {
    let this = allele.can_read(registry).then_some(allele);
    let that = other.filter(|o| o.can_read(registry));

    let winner = match (this, that) {
        (None, None) => return None,
        (Some(l), None) | (None, Some(l)) => l,
        (Some(a), Some(b)) => {
            if a.gene.dominance > b.gene.dominance {
                a
            } else {
                b
            }
        }
    };

    Some(ExpressedLayer {
        ident: winner.ident().to_string(),
        nodes: winner.resolved_width(registry),
        kind: winner.kind,
        inputs: winner.inputs.clone(),
    })
}

/// Express a pair of layer chromosomes.
///
/// The chromosomes are equalized (on copies) and the aligned pairs walked in
/// order. Walks repeat while they make progress, so a layer whose input sits
/// later in the chromosome still expresses once that input is active.
pub fn express_layers(a: &[LayerAllele], b: &[LayerAllele]) -> Vec<ExpressedLayer> {
    let (mut a, mut b) = (a.to_vec(), b.to_vec());
    equalize(&mut a, &mut b);

    let mut registry = ActiveRegistry::new();
    let mut expressed = Vec::new();
    let mut done = vec![false; a.len()];
    loop {
        let mut progressed = false;
        for (slot, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            if done[slot] {
                continue;
            }
            if let Some(layer) = express_layer(x, &registry, Some(y)) {
                trace!("Expressed layer {} ({} nodes)", layer.ident, layer.nodes);
                registry.record(&layer);
                expressed.push(layer);
                done[slot] = true;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let skipped = done.iter().filter(|d| !**d).count();
    if skipped > 0 {
        debug!("{skipped} layer slot(s) left unexpressed");
    }
    expressed
}

/// Express a pair of weight chromosomes against the active layers.
pub fn express_weights(
    a: &[WeightAllele],
    b: &[WeightAllele],
    registry: &ActiveRegistry,
) -> Vec<ExpressedWeight> {
    align_weights(a, b)
        .into_iter()
        .filter_map(|pair| match pair {
            (Some(x), y) => express_weight(x, registry, y),
            (None, Some(y)) => express_weight(y, registry, None),
            (None, None) => None,
        })
        .flatten()
        .collect()
}

impl Genome {
    /// Express both layer chromosomes.
    pub fn express_layers(&self) -> Vec<ExpressedLayer> {
        express_layers(&self.layer_a, &self.layer_b)
    }

    /// Express both weight chromosomes.
    ///
    /// A weight gene naming a layer the genome does not carry at all means an
    /// earlier structural edit left the chromosomes inconsistent, and is an
    /// error. Genes whose layers exist but were not expressed are skipped.
    pub fn express_weights(
        &self,
        registry: &ActiveRegistry,
    ) -> Result<Vec<ExpressedWeight>, GenomeError> {
        for gene in self.weight_a.iter().chain(self.weight_b.iter()) {
            for layer in [&gene.in_layer, &gene.out_layer] {
                if !self.carries_layer(layer) {
                    return Err(GenomeError::DanglingWeight {
                        gene: gene.gene.ident.clone(),
                        layer: layer.clone(),
                    });
                }
            }
        }
        Ok(express_weights(&self.weight_a, &self.weight_b, registry))
    }

    /// Express the whole genome: layers first, then weights.
    pub fn express(&self) -> Result<Phenotype, GenomeError> {
        let layers = self.express_layers();
        let registry: ActiveRegistry = layers.iter().map(|l| (l.ident.clone(), l.nodes)).collect();
        let weights = self.express_weights(&registry)?;
        debug!(
            "Genome {} expressed {} layers, {} weights",
            self.ident,
            layers.len(),
            weights.len()
        );
        Ok(Phenotype { layers, weights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Gene;
    use proptest::prelude::*;

    fn weight(dominance: u8, value: f32, in_node: usize, layers: (&str, &str)) -> WeightAllele {
        WeightAllele::new(
            Gene::new("asld").with_dominance(dominance),
            value,
            (layers.0, in_node),
            (layers.1, 0),
        )
    }

    fn layer(ident: &str, dominance: u8, inputs: &[&str], nodes: usize) -> LayerAllele {
        LayerAllele::new(
            Gene::new(ident).with_dominance(dominance),
            LayerKind::FullyConnected,
            Some(nodes),
            inputs.iter().copied(),
        )
    }

    fn values(out: Option<Vec<ExpressedWeight>>) -> Vec<(usize, f32)> {
        out.unwrap_or_default()
            .into_iter()
            .map(|w| (w.in_node, w.weight))
            .collect()
    }

    fn weight_registry() -> ActiveRegistry {
        [("testa", 6), ("testb", 3)].into_iter().collect()
    }

    #[test]
    fn test_weight_can_read() {
        let registry = weight_registry();
        assert!(!weight(1, 0.0, 0, ("nonexistant", "none")).can_read(&registry));
        assert!(!weight(1, 0.0, 6, ("testa", "testb")).can_read(&registry));
        assert!(weight(1, 0.0, 5, ("testa", "testb")).can_read(&registry));
    }

    #[test]
    fn test_weight_express() {
        let registry = weight_registry();
        let unread_a = weight(1, 0.0, 0, ("nonexistant", "none"));
        let unread_b = weight(1, 0.0, 6, ("testa", "testb"));
        let low_dom_a = weight(1, 0.0, 3, ("testa", "testb"));
        let low_dom_b = weight(1, 5.0, 3, ("testa", "testb"));
        let high_dom = weight(5, 3.0, 3, ("testa", "testb"));
        let other_weight = weight(5, 3.0, 5, ("testa", "testb"));

        assert_eq!(express_weight(&unread_a, &registry, Some(&unread_b)), None);
        assert_eq!(values(express_weight(&low_dom_a, &registry, Some(&unread_a))), vec![(3, 0.0)]);
        assert_eq!(values(express_weight(&unread_a, &registry, Some(&low_dom_a))), vec![(3, 0.0)]);
        assert_eq!(values(express_weight(&high_dom, &registry, Some(&low_dom_a))), vec![(3, 3.0)]);
        assert_eq!(values(express_weight(&low_dom_a, &registry, Some(&high_dom))), vec![(3, 3.0)]);
        assert_eq!(values(express_weight(&low_dom_a, &registry, Some(&low_dom_b))), vec![(3, 2.5)]);
        assert_eq!(
            values(express_weight(&low_dom_a, &registry, Some(&other_weight))),
            vec![(3, 0.0), (5, 3.0)]
        );
        assert_eq!(values(express_weight(&low_dom_a, &registry, None)), vec![(3, 0.0)]);

        let out = express_weight(&low_dom_a, &registry, None).unwrap();
        assert_eq!(out[0].in_layer, "testa");
        assert_eq!(out[0].out_layer, "testb");
        assert_eq!(out[0].out_node, 0);
    }

    #[test]
    fn test_layer_can_read() {
        let registry: ActiveRegistry = [("cake", 5), ("onion", 7)].into_iter().collect();
        assert!(!layer("askl", 5, &["stairs"], 3).can_read(&registry));
        assert!(!layer("askl", 5, &["cake", "onion", "strata"], 3).can_read(&registry));
        assert!(layer("qrst", 3, &["cake", "onion"], 3).can_read(&registry));
        assert!(layer("uvwx", 3, &[], 3).can_read(&registry));
        assert!(!LayerAllele::placeholder().can_read(&registry));
    }

    #[test]
    fn test_layer_express() {
        let registry: ActiveRegistry = [("cake", 5), ("onion", 7)].into_iter().collect();
        let unread_a = layer("askl", 5, &["stairs"], 3);
        let unread_b = layer("askl", 5, &["cake", "onion", "strata"], 3);
        let low_dom_a = layer("abcd", 1, &["cake"], 4);
        let low_dom_b = layer("efgh", 1, &["cake"], 1);
        let high_dom = layer("ijkl", 5, &["cake"], 2);
        let no_inputs = layer("uvwx", 3, &[], 3);

        let resolve = |a: &LayerAllele, b: Option<&LayerAllele>| {
            express_layer(a, &registry, b).map(|l| (l.ident, l.nodes))
        };
        assert_eq!(resolve(&unread_a, Some(&unread_b)), None);
        assert_eq!(resolve(&low_dom_a, Some(&unread_a)), Some(("abcd".into(), 4)));
        assert_eq!(resolve(&unread_a, Some(&low_dom_a)), Some(("abcd".into(), 4)));
        // equal dominance: the second allele wins
        assert_eq!(resolve(&low_dom_a, Some(&low_dom_b)), Some(("efgh".into(), 1)));
        assert_eq!(resolve(&high_dom, Some(&low_dom_a)), Some(("ijkl".into(), 2)));
        assert_eq!(resolve(&low_dom_b, Some(&high_dom)), Some(("ijkl".into(), 2)));
        assert_eq!(resolve(&no_inputs, None), Some(("uvwx".into(), 3)));
        assert_eq!(resolve(&low_dom_a, Some(&no_inputs)), Some(("uvwx".into(), 3)));
    }

    #[test]
    fn test_generic_express_dispatch() {
        let registry = weight_registry();
        let w = Allele::from(weight(1, 1.0, 0, ("testa", "testb")));
        let l = Allele::from(layer("solo", 3, &[], 2));

        match express(&w, &registry, None).unwrap() {
            Some(Expression::Weights(out)) => assert_eq!(out.len(), 1),
            other => panic!("unexpected expression: {other:?}"),
        }
        match express(&l, &registry, None).unwrap() {
            Some(Expression::Layer(out)) => assert_eq!(out.nodes, 2),
            other => panic!("unexpected expression: {other:?}"),
        }
        assert!(matches!(
            express(&w, &registry, Some(&l)),
            Err(GenomeError::KindMismatch { expected: "weight", found: "layer" })
        ));
    }

    #[test]
    fn test_express_layers_with_concat() {
        let input = |ident: &str, nodes| {
            LayerAllele::new(Gene::new(ident), LayerKind::Input, Some(nodes), Vec::<String>::new())
        };
        let concat = LayerAllele::new(Gene::new("concat_0"), LayerKind::Concat, None, ["data", "reward"]);
        let chromosome = vec![
            input("data", 9),
            input("reward", 6),
            concat,
            layer("action", 5, &["concat_0"], 6),
        ];
        let layers = express_layers(&chromosome, &chromosome);
        let widths: Vec<(&str, usize)> = layers.iter().map(|l| (l.ident.as_str(), l.nodes)).collect();
        assert_eq!(
            widths,
            vec![("data", 9), ("reward", 6), ("concat_0", 15), ("action", 6)]
        );
    }

    #[test]
    fn test_express_layers_out_of_order_input() {
        // "late" is listed after the layer consuming it
        let chromosome = vec![
            layer("early", 3, &["late"], 2),
            LayerAllele::new(Gene::new("late"), LayerKind::Input, Some(4), Vec::<String>::new()),
        ];
        let layers = express_layers(&chromosome, &chromosome);
        let order: Vec<&str> = layers.iter().map(|l| l.ident.as_str()).collect();
        assert_eq!(order, vec!["late", "early"]);
    }

    #[test]
    fn test_express_weights_alignment() {
        let registry: ActiveRegistry = [("data", 8), ("action", 5)].into_iter().collect();
        let w = |ident: &str, value: f32, in_node, out_node| {
            WeightAllele::new(Gene::new(ident).with_dominance(1), value, ("data", in_node), ("action", out_node))
        };
        // a pulls ahead with (1,0) which b only carries later
        let a = vec![w("zzga", 1.0, 0, 0), w("ozga", 1.0, 1, 0), w("zoga", 1.0, 0, 1)];
        let b = vec![w("zzgb", 5.0, 0, 0), w("zogb", 5.0, 0, 1), w("ozgb", 5.0, 1, 0)];
        let out = express_weights(&a, &b, &registry);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].weight, 3.0);
        // every connection value that was expressed came from one of the parents
        for expressed in &out {
            assert!([1.0, 3.0, 5.0].contains(&expressed.weight));
        }
    }

    #[test]
    fn test_genome_express_dangling_weight() {
        let layers = vec![
            LayerAllele::new(Gene::new("IN"), LayerKind::Input, Some(2), Vec::<String>::new()),
            layer("OUT", 3, &["IN"], 1),
        ];
        let good = WeightAllele::new(Gene::new("good"), 0.5, ("IN", 1), ("OUT", 0));
        let genome = Genome::from_haploid("T000-000-000", layers.clone(), vec![good.clone()]);
        let phenotype = genome.express().unwrap();
        assert_eq!(phenotype.layers.len(), 2);
        assert_eq!(phenotype.weights.len(), 1);
        assert_eq!(phenotype.weights[0].weight, 0.5);

        let bad = WeightAllele::new(Gene::new("bad"), 0.5, ("IN", 0), ("GONE", 0));
        let genome = Genome::new("T000-000-001", layers.clone(), layers, vec![good], vec![bad]);
        assert!(matches!(
            genome.express(),
            Err(GenomeError::DanglingWeight { gene, layer }) if gene == "bad" && layer == "GONE"
        ));
    }

    proptest! {
        #[test]
        fn prop_can_read_bounds(in_node in 0usize..12, out_node in 0usize..12, in_w in 0usize..8, out_w in 0usize..8) {
            let registry: ActiveRegistry = [("src", in_w), ("dst", out_w)].into_iter().collect();
            let gene = WeightAllele::new(Gene::new("p"), 0.0, ("src", in_node), ("dst", out_node));
            prop_assert_eq!(gene.can_read(&registry), in_node < in_w && out_node < out_w);

            let missing = WeightAllele::new(Gene::new("p"), 0.0, ("src", in_node), ("elsewhere", out_node));
            prop_assert!(!missing.can_read(&registry));
        }

        #[test]
        fn prop_codominance_is_mean(x in -10.0f32..10.0, y in -10.0f32..10.0, dom in 1u8..=5) {
            let registry: ActiveRegistry = [("testa", 6), ("testb", 3)].into_iter().collect();
            let a = weight(dom, x, 2, ("testa", "testb"));
            let b = weight(dom, y, 2, ("testa", "testb"));
            let out = express_weight(&a, &registry, Some(&b)).unwrap();
            prop_assert_eq!(out.len(), 1);
            prop_assert!((out[0].weight - (x + y) / 2.0).abs() < 1e-5);
        }
    }
}
