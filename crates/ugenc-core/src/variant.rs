//! Rate-specialized implementation variants of a unit.
//!
//! Each variant is a DSL source named `<unit>_<rates>_<out>.<ext>` with one
//! rate letter per parameter position, e.g. `sine_ab_a.dsp`. Its compiled
//! companion (`sine_ab_a.fh`) holds the class the Method Extractor reads.

use std::fmt;
use std::path::{Path, PathBuf};

use ugenc_config::FileSettings;

use crate::error::UgenError;
use crate::signature::{Rate, Signature};

/// One concrete implementation of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Unit name.
    pub unit: String,
    /// Rate bound at each parameter position.
    pub rates: Vec<Rate>,
    /// Output rate.
    pub output: Rate,
    /// DSL source file.
    pub dsl_path: PathBuf,
    /// Compiled implementation text.
    pub impl_path: PathBuf,
}

impl Variant {
    /// Build a variant from its rate letters, with paths in `dir`.
    pub fn new(unit: &str, rates: Vec<Rate>, output: Rate, dir: &Path, files: &FileSettings) -> Self {
        let stem = format!("{unit}{}", suffix(&rates, output));
        Self {
            unit: unit.to_string(),
            rates,
            output,
            dsl_path: dir.join(format!("{stem}.{}", files.dsl_extension)),
            impl_path: dir.join(format!("{stem}.{}", files.impl_extension)),
        }
    }

    /// Parse `<unit>_<rates>_<out>.<ext>`, returning the rates and output.
    pub fn parse_file_name(unit: &str, file_name: &str, ext: &str) -> Option<(Vec<Rate>, Rate)> {
        let stem = file_name
            .strip_prefix(unit)?
            .strip_prefix('_')?
            .strip_suffix(ext)?
            .strip_suffix('.')?;
        let (rates, output) = stem.rsplit_once('_')?;
        let rates = rates.chars().map(Rate::from_letter).collect::<Option<Vec<_>>>()?;
        let output = match output {
            "a" => Rate::Audio,
            "b" => Rate::Block,
            _ => return None,
        };
        Some((rates, output))
    }

    /// Rate suffix such as `_ab_a`.
    pub fn suffix(&self) -> String {
        suffix(&self.rates, self.output)
    }

    /// Name of the generated channel routine, e.g. `chan_ab_a`.
    pub fn routine_name(&self) -> String {
        format!("chan{}", self.suffix())
    }

    /// True if some non-const input rate differs from the output rate.
    pub fn is_mixed(&self) -> bool {
        self.rates
            .iter()
            .any(|&r| r != Rate::Const && r != self.output)
    }

    /// Number of audio-rate inputs.
    pub fn audio_count(&self) -> usize {
        self.rates.iter().filter(|&&r| r == Rate::Audio).count()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.unit, self.suffix())
    }
}

fn suffix(rates: &[Rate], output: Rate) -> String {
    let letters: String = rates.iter().map(|r| r.letter()).collect();
    format!("_{letters}_{}", output.letter())
}

/// All variants of one unit, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct VariantSet {
    variants: Vec<Variant>,
}

impl VariantSet {
    /// Collect variants, sorting them by file name.
    pub fn new(mut variants: Vec<Variant>) -> Self {
        variants.sort_by(|a, b| a.dsl_path.cmp(&b.dsl_path));
        Self { variants }
    }

    /// Find every `<unit>_*_*.<dsl_extension>` file in `dir`.
    pub fn discover(dir: &Path, unit: &str, files: &FileSettings) -> Result<Self, UgenError> {
        let entries = std::fs::read_dir(dir).map_err(|e| UgenError::read_file(dir, e))?;
        let mut variants = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| UgenError::read_file(dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.starts_with(&format!("{unit}_")) {
                continue;
            }
            match Variant::parse_file_name(unit, file_name, &files.dsl_extension) {
                Some((rates, output)) => {
                    variants.push(Variant::new(unit, rates, output, dir, files));
                }
                None if file_name.ends_with(&format!(".{}", files.dsl_extension)) => {
                    tracing::warn!(file = file_name, "ignoring file with malformed variant name");
                }
                None => {}
            }
        }

        if variants.is_empty() {
            return Err(UgenError::AmbiguousVariantSet {
                reason: format!(
                    "no '{unit}_<rates>_<out>.{}' files in {}",
                    files.dsl_extension,
                    dir.display()
                ),
            });
        }
        let set = Self::new(variants);
        tracing::debug!(
            unit,
            variants = ?set.variants.iter().map(Variant::suffix).collect::<Vec<_>>(),
            "discovered variants"
        );
        Ok(set)
    }

    /// Variants in sorted order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// True if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Check every variant against `signature`.
    pub fn validate(&self, signature: &Signature) -> Result<(), UgenError> {
        let output = signature.output_rate();
        let arity = signature.params.len();

        for (i, param) in signature.params.iter().enumerate() {
            let consts = self
                .variants
                .iter()
                .filter(|v| v.rates.get(i) == Some(&Rate::Const))
                .count();
            if consts != 0 && consts != self.variants.len() {
                return Err(UgenError::InvalidConstSpec {
                    param: param.name.clone(),
                    reason: "const in some variants but not all".to_string(),
                });
            }
        }

        for variant in &self.variants {
            let name = variant.suffix();
            if variant.output != output {
                return Err(UgenError::RateMismatch {
                    variant: name,
                    reason: format!(
                        "output rate '{}' but '{}' is declared '{}'",
                        variant.output, signature.name, output
                    ),
                });
            }
            if variant.rates.len() != arity {
                return Err(UgenError::ArityMismatch {
                    unit: signature.name.clone(),
                    declared: arity,
                    found: variant.rates.len(),
                    what: format!("variant '{variant}'"),
                });
            }
            // Audio and block positions are interchangeable through adapters;
            // only const must agree with the declaration.
            for (param, &rate) in signature.params.iter().zip(&variant.rates) {
                if param.is_const() != (rate == Rate::Const) {
                    return Err(UgenError::RateMismatch {
                        variant: name,
                        reason: format!(
                            "parameter '{}' bound at '{rate}' but declared '{}'",
                            param.name, param.rates
                        ),
                    });
                }
            }
            if output == Rate::Block && variant.rates.contains(&Rate::Audio) {
                return Err(UgenError::RateMismatch {
                    variant: name,
                    reason: "block-rate output with an audio-rate input".to_string(),
                });
            }
        }

        if output == Rate::Block && self.variants.len() != 1 {
            return Err(UgenError::AmbiguousVariantSet {
                reason: format!(
                    "block-rate unit '{}' needs exactly one variant, found {}",
                    signature.name,
                    self.variants.len()
                ),
            });
        }
        Ok(())
    }

    /// The variant supplying parameter names and private declarations.
    ///
    /// The first unmixed variant in sorted order; otherwise the first with
    /// the most audio-rate inputs.
    pub fn main_variant(&self) -> Option<&Variant> {
        if let Some(unmixed) = self.variants.iter().find(|v| !v.is_mixed()) {
            return Some(unmixed);
        }
        let mut best: Option<&Variant> = None;
        for variant in &self.variants {
            if best.is_none_or(|b| variant.audio_count() > b.audio_count()) {
                best = Some(variant);
            }
        }
        best
    }
}
