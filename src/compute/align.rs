//! Chromosome alignment.
//!
//! Homologous chromosomes drift apart in length as duplication and
//! input-addition mutations hit one side but not the other. The aligner
//! finds where two chromosomes still agree, and pads them so paired
//! iteration stays valid.

use log::trace;

use crate::schema::{LayerAllele, WeightAllele};

/// A gene that can be compared across homologous chromosomes.
pub trait Locus {
    /// Whether both genes occupy the same locus.
    fn same_locus(&self, other: &Self) -> bool;

    /// Fillers are skipped when walking a chromosome.
    fn is_filler(&self) -> bool {
        false
    }
}

impl Locus for LayerAllele {
    fn same_locus(&self, other: &Self) -> bool {
        self.ident() == other.ident()
    }

    fn is_filler(&self) -> bool {
        self.is_placeholder()
    }
}

impl Locus for WeightAllele {
    fn same_locus(&self, other: &Self) -> bool {
        self.same_connection(other)
    }
}

/// Every pair of positions at which the two chromosomes agree, walking both
/// from the start (fillers skipped) and stopping at the first divergence.
pub fn shared_prefix<G: Locus>(a: &[G], b: &[G]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut ia = a.iter().enumerate().filter(|(_, g)| !g.is_filler());
    let mut ib = b.iter().enumerate().filter(|(_, g)| !g.is_filler());
    while let (Some((i, x)), Some((j, y))) = (ia.next(), ib.next()) {
        if !x.same_locus(y) {
            break;
        }
        pairs.push((i, j));
    }
    pairs
}

/// The last pair of positions at which the chromosomes still agree before
/// diverging, or `None` when they disagree from the first gene.
pub fn last_shared<G: Locus>(a: &[G], b: &[G]) -> Option<(usize, usize)> {
    shared_prefix(a, b).last().copied()
}

/// Pad both layer chromosomes with null placeholders so every identity they
/// share sits at the same index in both.
///
/// Identities present on one side only stay where they are, facing either a
/// placeholder or, when both sides carry an unshared gene at the same index,
/// each other (the two are then allelic at that slot). Idempotent.
pub fn equalize(a: &mut Vec<LayerAllele>, b: &mut Vec<LayerAllele>) {
    let mut i = 0;
    while i < a.len() && i < b.len() {
        let (x, y) = (&a[i], &b[i]);
        if x.is_placeholder() || y.is_placeholder() || x.same_locus(y) {
            i += 1;
            continue;
        }

        let y_in_a = later_position(a, i, y.ident());
        let x_in_b = later_position(b, i, x.ident());
        match (y_in_a, x_in_b) {
            (None, None) => {}
            (Some(ja), None) => pad(b, i, ja - i),
            (None, Some(jb)) => pad(a, i, jb - i),
            (Some(ja), Some(jb)) => {
                if ja <= jb {
                    pad(b, i, ja - i);
                } else {
                    pad(a, i, jb - i);
                }
            }
        }
        i += 1;
    }

    let len = a.len().max(b.len());
    a.resize_with(len, LayerAllele::placeholder);
    b.resize_with(len, LayerAllele::placeholder);
}

fn later_position(chromosome: &[LayerAllele], after: usize, ident: &str) -> Option<usize> {
    chromosome
        .iter()
        .enumerate()
        .skip(after + 1)
        .find(|(_, l)| !l.is_placeholder() && l.ident() == ident)
        .map(|(j, _)| j)
}

fn pad(chromosome: &mut Vec<LayerAllele>, at: usize, count: usize) {
    trace!("Padding {count} placeholder(s) at {at}");
    chromosome.splice(at..at, std::iter::repeat_with(LayerAllele::placeholder).take(count));
}

/// Pair up two weight chromosomes by connection.
///
/// Genes describing the same connection are paired. A gene whose connection
/// turns up later on the other chromosome waits for it, so the gene facing it
/// is emitted alone; genes carried by one side only are emitted alone.
pub fn align_weights<'a>(
    a: &'a [WeightAllele],
    b: &'a [WeightAllele],
) -> Vec<(Option<&'a WeightAllele>, Option<&'a WeightAllele>)> {
    let mut pairs = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (x, y) = (&a[i], &b[j]);
        if x.same_connection(y) {
            pairs.push((Some(x), Some(y)));
            i += 1;
            j += 1;
            continue;
        }

        let x_later = b[j + 1..].iter().position(|w| w.same_connection(x));
        let y_later = a[i + 1..].iter().position(|w| w.same_connection(y));
        match (x_later, y_later) {
            (None, None) => {
                pairs.push((Some(x), None));
                pairs.push((None, Some(y)));
                i += 1;
                j += 1;
            }
            (Some(_), None) => {
                pairs.push((None, Some(y)));
                j += 1;
            }
            (None, Some(_)) => {
                pairs.push((Some(x), None));
                i += 1;
            }
            (Some(skip_b), Some(skip_a)) => {
                if skip_a <= skip_b {
                    pairs.push((Some(x), None));
                    i += 1;
                } else {
                    pairs.push((None, Some(y)));
                    j += 1;
                }
            }
        }
    }
    pairs.extend(a[i..].iter().map(|x| (Some(x), None)));
    pairs.extend(b[j..].iter().map(|y| (None, Some(y))));
    pairs
}
