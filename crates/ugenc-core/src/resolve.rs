//! Rate resolution.
//!
//! Given the variants of a unit, [`resolve`] builds the decision tree that
//! the generated unit runs whenever an input is replaced. Parameters are
//! examined left to right:
//!
//! - If variants exist for both rates at a position, the tree branches on
//!   the input's actual rate.
//! - If only one rate is available, the input is converted: an audio input
//!   to a block-only position is downsampled, and a block input to an
//!   audio-only position is upsampled.
//! - Positions that are const in every remaining variant are skipped.
//!
//! Matching is eager: an earlier position is never revisited to avoid a
//! conversion at a later one.

use crate::error::UgenError;
use crate::signature::Rate;
use crate::variant::Variant;

/// A rate adapter inserted in front of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Hold block values across the samples of a block.
    Upsample,
    /// Low-pass filter and decimate to one value per block.
    Downsample,
}

impl Conversion {
    /// True if the adapter is needed for an input arriving at `rate`.
    pub fn applies_to(self, rate: Rate) -> bool {
        match self {
            Conversion::Upsample => rate != Rate::Audio,
            Conversion::Downsample => rate == Rate::Audio,
        }
    }

    /// Rate of the input after conversion.
    pub fn target(self) -> Rate {
        match self {
            Conversion::Upsample => Rate::Audio,
            Conversion::Downsample => Rate::Block,
        }
    }
}

/// A node of the dispatch decision tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchNode {
    /// Branch on whether parameter `param` is audio rate.
    Branch {
        /// Parameter position.
        param: usize,
        /// Taken for audio-rate inputs.
        audio: Box<DispatchNode>,
        /// Taken for block- and const-rate inputs.
        block: Box<DispatchNode>,
    },
    /// Convert parameter `param` if needed, then continue.
    Convert {
        /// Parameter position.
        param: usize,
        /// Adapter to insert.
        conversion: Conversion,
        /// Rest of the decision.
        next: Box<DispatchNode>,
    },
    /// Dispatch to a channel routine.
    Routine {
        /// Index into the resolved variant slice.
        variant: usize,
        /// Routine name, e.g. `chan_ab_a`.
        name: String,
    },
}

/// Outcome of running the decision tree for concrete input rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Adapters applied, in order, as `(param, conversion)`.
    pub conversions: Vec<(usize, Conversion)>,
    /// Index of the chosen variant.
    pub variant: usize,
    /// Name of the chosen routine.
    pub routine: String,
}

impl DispatchNode {
    /// Simulate dispatch for `rates`, one per parameter position.
    ///
    /// Missing positions are treated as const and never converted.
    pub fn select(&self, rates: &[Rate]) -> Selection {
        let rate_at = |param: usize| rates.get(param).copied().unwrap_or(Rate::Const);
        let mut conversions = Vec::new();
        let mut node = self;
        loop {
            match node {
                DispatchNode::Branch { param, audio, block } => {
                    node = if rate_at(*param) == Rate::Audio { audio } else { block };
                }
                DispatchNode::Convert {
                    param,
                    conversion,
                    next,
                } => {
                    if conversion.applies_to(rate_at(*param)) {
                        conversions.push((*param, *conversion));
                    }
                    node = next;
                }
                DispatchNode::Routine { variant, name } => {
                    return Selection {
                        conversions,
                        variant: *variant,
                        routine: name.clone(),
                    };
                }
            }
        }
    }

    /// Variant indices reachable from this node, in tree order.
    pub fn routines(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_routines(&mut out);
        out
    }

    fn collect_routines(&self, out: &mut Vec<usize>) {
        match self {
            DispatchNode::Branch { audio, block, .. } => {
                audio.collect_routines(out);
                block.collect_routines(out);
            }
            DispatchNode::Convert { next, .. } => next.collect_routines(out),
            DispatchNode::Routine { variant, .. } => {
                if !out.contains(variant) {
                    out.push(*variant);
                }
            }
        }
    }
}

/// Build the decision tree over `variants`, which must all have `arity`
/// rate positions.
pub fn resolve(variants: &[Variant], arity: usize) -> Result<DispatchNode, UgenError> {
    if let Some(bad) = variants.iter().find(|v| v.rates.len() != arity) {
        return Err(UgenError::AmbiguousVariantSet {
            reason: format!("variant '{bad}' has {} rate positions, expected {arity}", bad.rates.len()),
        });
    }
    let candidates: Vec<usize> = (0..variants.len()).collect();
    let tree = resolve_from(variants, arity, 0, &candidates)?;
    tracing::debug!(routines = tree.routines().len(), "built dispatch tree");
    Ok(tree)
}

fn resolve_from(
    variants: &[Variant],
    arity: usize,
    pos: usize,
    candidates: &[usize],
) -> Result<DispatchNode, UgenError> {
    match candidates {
        [] => {
            return Err(UgenError::AmbiguousVariantSet {
                reason: format!("no variant left at parameter {pos}"),
            });
        }
        [only] => return Ok(finish(&variants[*only], pos, *only)),
        _ => {}
    }

    if pos == arity {
        let names: Vec<String> = candidates.iter().map(|&i| variants[i].suffix()).collect();
        return Err(UgenError::AmbiguousVariantSet {
            reason: format!(
                "{} variants remain after all parameters: {}",
                names.len(),
                names.join(", ")
            ),
        });
    }

    let rate = |i: usize| variants[i].rates[pos];
    if candidates.iter().all(|&i| rate(i) == Rate::Const) {
        return resolve_from(variants, arity, pos + 1, candidates);
    }

    let (audio, block): (Vec<usize>, Vec<usize>) =
        candidates.iter().partition(|&&i| rate(i) == Rate::Audio);

    if audio.is_empty() {
        Ok(DispatchNode::Convert {
            param: pos,
            conversion: Conversion::Downsample,
            next: Box::new(resolve_from(variants, arity, pos + 1, &block)?),
        })
    } else if block.is_empty() {
        Ok(DispatchNode::Convert {
            param: pos,
            conversion: Conversion::Upsample,
            next: Box::new(resolve_from(variants, arity, pos + 1, &audio)?),
        })
    } else {
        Ok(DispatchNode::Branch {
            param: pos,
            audio: Box::new(resolve_from(variants, arity, pos + 1, &audio)?),
            block: Box::new(resolve_from(variants, arity, pos + 1, &block)?),
        })
    }
}

/// Convert every remaining non-const position to the rate `variant` was
/// compiled for, then dispatch to it.
fn finish(variant: &Variant, pos: usize, index: usize) -> DispatchNode {
    let mut node = DispatchNode::Routine {
        variant: index,
        name: variant.routine_name(),
    };
    for param in (pos..variant.rates.len()).rev() {
        let conversion = match variant.rates[param] {
            Rate::Audio => Conversion::Upsample,
            Rate::Block => Conversion::Downsample,
            Rate::Const => continue,
        };
        node = DispatchNode::Convert {
            param,
            conversion,
            next: Box::new(node),
        };
    }
    node
}
