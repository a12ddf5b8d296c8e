//! Topology helpers: input widths and output consumers, resolved through
//! chains of merge layers.
//!
//! Layers only reference their upstream layers by identity. Consumers are
//! always derived by a forward scan over the chromosome, so no back-pointers
//! have to be kept consistent across structural edits.

use std::collections::HashSet;

use crate::schema::{LayerAllele, LayerKind};

use super::GenomeError;

/// Widths of the concrete layers feeding a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputWidths {
    /// Sum of all source widths.
    pub total: usize,
    /// Concrete (non-merge) sources in input order, with their widths.
    pub sources: Vec<(String, usize)>,
}

impl InputWidths {
    /// Width of one source, if it feeds the layer.
    pub fn width_of(&self, ident: &str) -> Option<usize> {
        self.sources
            .iter()
            .find(|(source, _)| source == ident)
            .map(|(_, width)| *width)
    }
}

/// First non-placeholder layer with this identity.
pub fn find_layer<'a>(chromosome: &'a [LayerAllele], ident: &str) -> Option<&'a LayerAllele> {
    chromosome
        .iter()
        .find(|l| !l.is_placeholder() && l.ident() == ident)
}

/// Index of the first non-placeholder layer with this identity.
pub fn layer_position(chromosome: &[LayerAllele], ident: &str) -> Option<usize> {
    chromosome
        .iter()
        .position(|l| !l.is_placeholder() && l.ident() == ident)
}

/// Sum the widths of every input of `layer`, expanding merge layers into
/// their own inputs.
pub fn find_inputs_width(
    layer: &LayerAllele,
    chromosome: &[LayerAllele],
) -> Result<InputWidths, GenomeError> {
    let mut widths = InputWidths::default();
    let mut chain = Vec::new();
    for input in &layer.inputs {
        expand_into(input, chromosome, &mut chain, &mut widths)?;
    }
    Ok(widths)
}

/// Concrete sources behind a single identity: the layer itself, or the
/// layers a merge chain ultimately draws from.
pub fn source_widths(ident: &str, chromosome: &[LayerAllele]) -> Result<InputWidths, GenomeError> {
    let mut widths = InputWidths::default();
    expand_into(ident, chromosome, &mut Vec::new(), &mut widths)?;
    Ok(widths)
}

fn expand_into(
    ident: &str,
    chromosome: &[LayerAllele],
    chain: &mut Vec<String>,
    widths: &mut InputWidths,
) -> Result<(), GenomeError> {
    let layer = find_layer(chromosome, ident).ok_or_else(|| GenomeError::UnknownLayer {
        layer: ident.to_string(),
    })?;

    if layer.kind == LayerKind::Concat {
        if chain.iter().any(|c| c == ident) {
            return Err(GenomeError::CyclicMerge {
                layer: ident.to_string(),
            });
        }
        chain.push(ident.to_string());
        for input in &layer.inputs {
            expand_into(input, chromosome, chain, widths)?;
        }
        chain.pop();
        return Ok(());
    }

    let width = layer.nodes.ok_or_else(|| GenomeError::NotResizable {
        layer: ident.to_string(),
    })?;
    widths.total += width;
    widths.sources.push((ident.to_string(), width));
    Ok(())
}

/// Resolved width of a layer: its node count, or for a merge layer the
/// total width of what it merges.
pub fn layer_width(layer: &LayerAllele, chromosome: &[LayerAllele]) -> Result<usize, GenomeError> {
    match (layer.kind, layer.nodes) {
        (LayerKind::Concat, _) => Ok(find_inputs_width(layer, chromosome)?.total),
        (_, Some(nodes)) => Ok(nodes),
        (_, None) => Err(GenomeError::NotResizable {
            layer: layer.ident().to_string(),
        }),
    }
}

/// Layers consuming `ident`, directly or through merge layers, in
/// chromosome order. Merge layers themselves are skipped.
pub fn find_outputs<'a>(ident: &str, chromosome: &'a [LayerAllele]) -> Vec<&'a LayerAllele> {
    let mut targets: HashSet<&str> = HashSet::from([ident]);
    loop {
        let mut grew = false;
        for layer in chromosome {
            if layer.kind == LayerKind::Concat
                && !targets.contains(layer.ident())
                && layer.inputs.iter().any(|i| targets.contains(i.as_str()))
            {
                targets.insert(layer.ident());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    chromosome
        .iter()
        .filter(|l| !l.is_placeholder() && l.kind != LayerKind::Concat && l.ident() != ident)
        .filter(|l| l.inputs.iter().any(|i| targets.contains(i.as_str())))
        .collect()
}

/// Every layer downstream of `ident` (merge layers included).
pub fn descendants(ident: &str, chromosome: &[LayerAllele]) -> HashSet<String> {
    let mut found: HashSet<String> = HashSet::new();
    let mut frontier = vec![ident.to_string()];
    while let Some(current) = frontier.pop() {
        for layer in chromosome {
            if layer.is_placeholder() || found.contains(layer.ident()) || layer.ident() == ident {
                continue;
            }
            if layer.takes_input(&current) {
                found.insert(layer.ident().to_string());
                frontier.push(layer.ident().to_string());
            }
        }
    }
    found
}

/// First merge layer listing `ident` as an input.
pub fn merge_consuming<'a>(ident: &str, chromosome: &'a [LayerAllele]) -> Option<&'a LayerAllele> {
    chromosome
        .iter()
        .find(|l| l.kind == LayerKind::Concat && l.takes_input(ident))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Gene;

    fn layer(ident: &str, kind: LayerKind, nodes: Option<usize>, inputs: &[&str]) -> LayerAllele {
        LayerAllele::new(Gene::new(ident), kind, nodes, inputs.iter().copied())
    }

    #[test]
    fn test_find_inputs_width_single() {
        let chromosome = vec![
            layer("IN", LayerKind::Input, Some(5), &[]),
            layer("OUT", LayerKind::FullyConnected, Some(5), &["IN"]),
        ];
        let widths = find_inputs_width(&chromosome[1], &chromosome).unwrap();
        assert_eq!(widths.total, 5);
        assert_eq!(widths.sources, vec![("IN".to_string(), 5)]);
    }

    #[test]
    fn test_find_inputs_width_through_concat() {
        let chromosome = vec![
            layer("IN", LayerKind::Input, Some(5), &[]),
            layer("IN2", LayerKind::Input, Some(5), &[]),
            layer("CONC", LayerKind::Concat, None, &["IN", "IN2"]),
            layer("OUT", LayerKind::FullyConnected, Some(5), &["CONC"]),
        ];
        let widths = find_inputs_width(&chromosome[3], &chromosome).unwrap();
        assert_eq!(widths.total, 10);
        assert_eq!(widths.width_of("IN"), Some(5));
        assert_eq!(widths.width_of("IN2"), Some(5));
        assert_eq!(widths.width_of("CONC"), None);
    }

    #[test]
    fn test_stacked_concats() {
        let chromosome = vec![
            layer("a", LayerKind::Input, Some(2), &[]),
            layer("b", LayerKind::Input, Some(2), &[]),
            layer("c", LayerKind::Input, Some(2), &[]),
            layer("d", LayerKind::Input, Some(3), &[]),
            layer("e", LayerKind::Concat, None, &["a", "b"]),
            layer("f", LayerKind::Concat, None, &["c", "d"]),
            layer("g", LayerKind::Concat, None, &["e", "f"]),
            layer("h", LayerKind::FullyConnected, Some(2), &["g"]),
        ];
        let widths = find_inputs_width(&chromosome[7], &chromosome).unwrap();
        assert_eq!(widths.total, 9);
        let order: Vec<&str> = widths.sources.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert_eq!(layer_width(&chromosome[6], &chromosome).unwrap(), 9);
    }

    #[test]
    fn test_unknown_and_cyclic_inputs() {
        let chromosome = vec![
            layer("x", LayerKind::Concat, None, &["y"]),
            layer("y", LayerKind::Concat, None, &["x"]),
            layer("out", LayerKind::FullyConnected, Some(1), &["x"]),
            layer("lost", LayerKind::FullyConnected, Some(1), &["nowhere"]),
        ];
        assert!(matches!(
            find_inputs_width(&chromosome[2], &chromosome),
            Err(GenomeError::CyclicMerge { .. })
        ));
        assert!(matches!(
            find_inputs_width(&chromosome[3], &chromosome),
            Err(GenomeError::UnknownLayer { layer }) if layer == "nowhere"
        ));
    }

    #[test]
    fn test_find_outputs() {
        let chromosome = vec![
            layer("d", LayerKind::Input, Some(1), &[]),
            layer("tester", LayerKind::FullyConnected, Some(5), &["d"]),
        ];
        let out = find_outputs("d", &chromosome);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ident(), "tester");

        let chromosome = vec![
            layer("d", LayerKind::Input, Some(1), &[]),
            layer("tester", LayerKind::FullyConnected, Some(5), &["d"]),
            layer("con1", LayerKind::Concat, None, &["tester"]),
            layer("con2", LayerKind::Concat, None, &["tester", "d"]),
            layer("out1", LayerKind::FullyConnected, Some(5), &["con1"]),
            layer("out2", LayerKind::FullyConnected, Some(3), &["con2"]),
            layer("out3", LayerKind::FullyConnected, Some(6), &["con2"]),
        ];
        let out: Vec<&str> = find_outputs("tester", &chromosome)
            .iter()
            .map(|l| l.ident())
            .collect();
        assert_eq!(out, vec!["out1", "out2", "out3"]);
        assert!(find_outputs("out3", &chromosome).is_empty());
    }

    #[test]
    fn test_descendants_and_merges() {
        let chromosome = vec![
            layer("in", LayerKind::Input, Some(2), &[]),
            layer("hidden", LayerKind::FullyConnected, Some(3), &["in"]),
            layer("merge", LayerKind::Concat, None, &["hidden", "in"]),
            layer("out", LayerKind::FullyConnected, Some(1), &["merge"]),
            layer("side", LayerKind::Input, Some(1), &[]),
        ];
        let below = descendants("hidden", &chromosome);
        assert!(below.contains("merge"));
        assert!(below.contains("out"));
        assert!(!below.contains("side"));
        assert!(!below.contains("hidden"));
        assert_eq!(merge_consuming("in", &chromosome).map(|l| l.ident()), Some("merge"));
        assert!(merge_consuming("side", &chromosome).is_none());
    }
}
