//! Structural edits: node-count changes, layer duplication and input
//! addition.
//!
//! Every edit keeps the weight chromosome consistent with the layer
//! chromosome it edits: each weighted layer owns exactly one weight gene per
//! (source node, own node) pair of every concrete layer feeding it. Edits
//! work on copies and only commit once every step has succeeded.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::GenomeRng;
use crate::compute::{
    GenomeError, descendants, find_inputs_width, find_layer, find_outputs, layer_position,
    merge_consuming, source_widths,
};
use crate::schema::{LayerAllele, LayerKind, MutationConfig, WeightAllele};

fn unknown(ident: &str) -> GenomeError {
    GenomeError::UnknownLayer {
        layer: ident.to_string(),
    }
}

fn own_width(layer: &LayerAllele) -> Result<usize, GenomeError> {
    layer.nodes.ok_or_else(|| GenomeError::NotResizable {
        layer: layer.ident().to_string(),
    })
}

/// Fresh weight genes for a full `source -> target` block, row-major by
/// source node.
fn fresh_block(
    (source, in_width): (&str, usize),
    (target, out_width): (&str, usize),
    rng: &mut GenomeRng,
    config: &MutationConfig,
) -> Vec<WeightAllele> {
    let mut genes = Vec::with_capacity(in_width * out_width);
    for in_node in 0..in_width {
        for out_node in 0..out_width {
            genes.push(rng.fresh_weight(config, (source, in_node), (target, out_node)));
        }
    }
    genes
}

/// Replace the `source -> target` block with one of the given shape.
///
/// Genes whose node indices still fit are kept (first copy wins), new pairs
/// get fresh genes, and out-of-range genes are dropped. The block is written
/// in row-major order where it started, or at the end if it was empty.
fn rebuild_block(
    weights: &mut Vec<WeightAllele>,
    (source, in_width): (&str, usize),
    (target, out_width): (&str, usize),
    rng: &mut GenomeRng,
    config: &MutationConfig,
) {
    let at = weights
        .iter()
        .position(|w| w.joins(source, target))
        .unwrap_or(weights.len());

    let mut kept: HashMap<(usize, usize), WeightAllele> = HashMap::new();
    let mut rest = Vec::with_capacity(weights.len());
    for w in weights.drain(..) {
        if w.joins(source, target) {
            kept.entry((w.in_node, w.out_node)).or_insert(w);
        } else {
            rest.push(w);
        }
    }

    let mut block = Vec::with_capacity(in_width * out_width);
    for in_node in 0..in_width {
        for out_node in 0..out_width {
            match kept.remove(&(in_node, out_node)) {
                Some(w) => block.push(w),
                None => block.push(rng.fresh_weight(
                    config,
                    (source, in_node),
                    (target, out_node),
                )),
            }
        }
    }
    rest.splice(at..at, block);
    *weights = rest;
}

/// Change the node count of a layer by `delta`, rebuilding every weight
/// block that touches it.
///
/// Blocks feeding the layer (merge inputs expanded) and blocks from the
/// layer into each weighted consumer (directly or through merges) are
/// resized; surviving genes keep their identity and value.
pub fn change_node_count(
    ident: &str,
    delta: i64,
    layers: &mut Vec<LayerAllele>,
    weights: &mut Vec<WeightAllele>,
    rng: &mut GenomeRng,
    config: &MutationConfig,
) -> Result<(), GenomeError> {
    let pos = layer_position(layers, ident).ok_or_else(|| unknown(ident))?;
    let layer = &layers[pos];
    if layer.kind == LayerKind::Concat {
        return Err(GenomeError::NotResizable {
            layer: ident.to_string(),
        });
    }
    let resized = own_width(layer)? as i64 + delta;
    if resized < 1 {
        return Err(GenomeError::InvalidNodeCount {
            layer: ident.to_string(),
            nodes: resized,
        });
    }
    let resized = resized as usize;

    let mut new_layers = layers.clone();
    new_layers[pos].nodes = Some(resized);

    let mut blocks: Vec<(String, usize, String, usize)> = Vec::new();
    if new_layers[pos].kind.is_weighted() {
        for (source, width) in find_inputs_width(&new_layers[pos], &new_layers)?.sources {
            blocks.push((source, width, ident.to_string(), resized));
        }
    }
    for consumer in find_outputs(ident, &new_layers) {
        if consumer.kind.is_weighted() {
            blocks.push((
                ident.to_string(),
                resized,
                consumer.ident().to_string(),
                own_width(consumer)?,
            ));
        }
    }

    let mut new_weights = weights.clone();
    for (source, in_width, target, out_width) in &blocks {
        rebuild_block(
            &mut new_weights,
            (source.as_str(), *in_width),
            (target.as_str(), *out_width),
            rng,
            config,
        );
    }

    debug!(
        "Resized {ident} by {delta:+} to {resized} nodes ({} block(s))",
        blocks.len()
    );
    *layers = new_layers;
    *weights = new_weights;
    Ok(())
}

/// Fresh weight genes connecting `source` to `target`, one per node pair.
///
/// A merge source is expanded into its concrete layers, in input order.
pub fn dup_weights(
    source: &LayerAllele,
    target: &LayerAllele,
    layers: &[LayerAllele],
    rng: &mut GenomeRng,
    config: &MutationConfig,
) -> Result<Vec<WeightAllele>, GenomeError> {
    let target_width = own_width(target)?;
    let sources = if source.kind == LayerKind::Concat {
        find_inputs_width(source, layers)?.sources
    } else {
        vec![(source.ident().to_string(), own_width(source)?)]
    };

    let mut genes = Vec::new();
    for (ident, width) in &sources {
        genes.extend(fresh_block(
            (ident.as_str(), *width),
            (target.ident(), target_width),
            rng,
            config,
        ));
    }
    Ok(genes)
}

/// Duplicate a layer, returning the identity of the copy.
///
/// The copy sits right after the original, reads the same inputs with its
/// own fresh fan-in weights, and is wired into one randomly chosen consumer
/// of the original. Other consumers keep reading the original only.
pub fn duplicate_layer(
    ident: &str,
    layers: &mut Vec<LayerAllele>,
    weights: &mut Vec<WeightAllele>,
    rng: &mut GenomeRng,
    config: &MutationConfig,
) -> Result<String, GenomeError> {
    let pos = layer_position(layers, ident).ok_or_else(|| unknown(ident))?;
    let original = &layers[pos];
    if matches!(
        original.kind,
        LayerKind::Concat | LayerKind::Loss | LayerKind::Null
    ) {
        return Err(GenomeError::NotDuplicable {
            layer: ident.to_string(),
            kind: original.kind,
        });
    }

    let mut copy = original.clone();
    copy.gene.ident = rng.gene_ident();
    let copy_ident = copy.gene.ident.clone();

    let mut new_layers = layers.clone();
    new_layers.insert(pos + 1, copy.clone());

    let mut fresh = Vec::new();
    if copy.kind.is_weighted() {
        for (source, width) in find_inputs_width(&copy, &new_layers)?.sources {
            fresh.extend(fresh_block(
                (source.as_str(), width),
                (copy_ident.as_str(), own_width(&copy)?),
                rng,
                config,
            ));
        }
    }

    let consumers: Vec<String> = find_outputs(ident, &new_layers)
        .iter()
        .map(|l| l.ident().to_string())
        .collect();
    if let Some(chosen) = rng.pick(&consumers) {
        let cpos = layer_position(&new_layers, chosen).ok_or_else(|| unknown(chosen))?;
        new_layers[cpos].inputs.push(copy_ident.clone());
        let consumer = &new_layers[cpos];
        if consumer.kind.is_weighted() {
            fresh.extend(dup_weights(&copy, consumer, &new_layers, rng, config)?);
        }
        debug!("Duplicate {copy_ident} of {ident} feeds {chosen}");
    }

    let mut new_weights = weights.clone();
    new_weights.extend(fresh);
    *layers = new_layers;
    *weights = new_weights;
    Ok(copy_ident)
}

/// Concrete sources already read by `layer`. For a merge layer this also
/// covers everything its consumers read, since a new merge input reaches
/// them too.
fn read_sources(layer: &LayerAllele, layers: &[LayerAllele]) -> Result<HashSet<String>, GenomeError> {
    let mut sources: HashSet<String> = find_inputs_width(layer, layers)?
        .sources
        .into_iter()
        .map(|(source, _)| source)
        .collect();
    if layer.kind == LayerKind::Concat {
        for consumer in find_outputs(layer.ident(), layers) {
            sources.extend(
                find_inputs_width(consumer, layers)?
                    .sources
                    .into_iter()
                    .map(|(source, _)| source),
            );
        }
    }
    Ok(sources)
}

/// Pick a new input for a layer.
///
/// Candidates exclude placeholders, merge and loss layers, the layer itself,
/// anything already feeding it (or, for a merge, feeding its consumers), and
/// anything downstream of it. Layers that nothing reads yet are preferred.
/// Returns `None` when no candidate exists.
pub fn choose_new_input(
    ident: &str,
    layers: &[LayerAllele],
    rng: &mut GenomeRng,
) -> Result<Option<String>, GenomeError> {
    let layer = find_layer(layers, ident).ok_or_else(|| unknown(ident))?;
    let below = descendants(ident, layers);
    let feeding = read_sources(layer, layers)?;

    let mut eligible: Vec<&str> = Vec::new();
    for candidate in layers {
        let name = candidate.ident();
        if candidate.is_placeholder()
            || matches!(candidate.kind, LayerKind::Loss | LayerKind::Concat)
            || name == ident
            || layer.takes_input(name)
            || feeding.contains(name)
            || below.contains(name)
            || eligible.contains(&name)
        {
            continue;
        }
        eligible.push(name);
    }

    let idle: Vec<&str> = eligible
        .iter()
        .copied()
        .filter(|name| find_outputs(name, layers).is_empty())
        .collect();
    let pool = if idle.is_empty() { &eligible } else { &idle };
    Ok(rng.pick(pool).map(|name| name.to_string()))
}

/// Where a new input should attach: through the merge already carrying it
/// when that merge can be added as a whole, otherwise the candidate itself.
fn attachment_point(
    ident: &str,
    candidate: &str,
    layers: &[LayerAllele],
) -> Result<String, GenomeError> {
    let Some(merge) = merge_consuming(candidate, layers) else {
        return Ok(candidate.to_string());
    };
    let layer = find_layer(layers, ident).ok_or_else(|| unknown(ident))?;
    if merge.ident() == ident
        || layer.takes_input(merge.ident())
        || descendants(ident, layers).contains(merge.ident())
    {
        return Ok(candidate.to_string());
    }

    let feeding = read_sources(layer, layers)?;
    let merged = source_widths(merge.ident(), layers)?;
    if merged
        .sources
        .iter()
        .any(|(source, _)| feeding.contains(source))
    {
        return Ok(candidate.to_string());
    }
    Ok(merge.ident().to_string())
}

/// Give a layer one more input, with fresh weights for every weighted layer
/// that now reads it. Returns the identity attached, or `None` when no
/// candidate exists.
///
/// For a merge layer, the new weights belong to the merge's weighted
/// consumers.
pub fn add_input(
    ident: &str,
    layers: &mut Vec<LayerAllele>,
    weights: &mut Vec<WeightAllele>,
    rng: &mut GenomeRng,
    config: &MutationConfig,
) -> Result<Option<String>, GenomeError> {
    let Some(candidate) = choose_new_input(ident, layers, rng)? else {
        return Ok(None);
    };
    let attach = attachment_point(ident, &candidate, layers)?;

    let mut new_layers = layers.clone();
    let pos = layer_position(&new_layers, ident).ok_or_else(|| unknown(ident))?;
    new_layers[pos].inputs.push(attach.clone());

    let layer = &new_layers[pos];
    let targets: Vec<&LayerAllele> = match layer.kind {
        LayerKind::Concat => find_outputs(ident, &new_layers)
            .into_iter()
            .filter(|l| l.kind.is_weighted())
            .collect(),
        kind if kind.is_weighted() => vec![layer],
        _ => Vec::new(),
    };

    let sources = source_widths(&attach, &new_layers)?;
    let mut fresh = Vec::new();
    for target in &targets {
        let width = own_width(target)?;
        for (source, in_width) in &sources.sources {
            fresh.extend(fresh_block(
                (source.as_str(), *in_width),
                (target.ident(), width),
                rng,
                config,
            ));
        }
    }

    debug!(
        "{ident} gains input {attach} with {} new weight gene(s)",
        fresh.len()
    );
    let mut new_weights = weights.clone();
    new_weights.extend(fresh);
    *layers = new_layers;
    *weights = new_weights;
    Ok(Some(attach))
}
