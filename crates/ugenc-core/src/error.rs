//! Error types for translation.
//!
//! Components return [`UgenError`], which knows what went wrong and, where
//! the component can tell, the line. The pipeline wraps it in
//! [`TranslateError`] to add the unit and file being translated.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structural failures raised by the translator components.
#[derive(Debug, Error)]
pub enum UgenError {
    /// A signature line does not follow `name(p: [n]rate, ...): [n]rate`.
    #[error("malformed signature at line {line}: {reason}")]
    MalformedSignature {
        /// 1-based line number in the specification file.
        line: usize,
        /// What was expected.
        reason: String,
    },

    /// Declared parameter channels disagree with an implementation.
    #[error("'{unit}' declares {declared} parameter channel(s) but {found} were found in {what}")]
    ArityMismatch {
        /// Unit name.
        unit: String,
        /// Count implied by the signature.
        declared: usize,
        /// Count found in the implementation or variant.
        found: usize,
        /// Where the count was found.
        what: String,
    },

    /// A const-rate parameter is combined with other rates or multichannel.
    #[error("invalid const spec for parameter '{param}': {reason}")]
    InvalidConstSpec {
        /// Parameter name.
        param: String,
        /// Description of the violation.
        reason: String,
    },

    /// The compiler output has no declaration of the expected class.
    #[error("class '{class}' not found in compiler output")]
    ClassNotFound {
        /// Class that was searched for.
        class: String,
    },

    /// A method required for generation is absent.
    #[error("method '{method}' not found in class '{class}'")]
    MethodNotFound {
        /// Class that was searched.
        class: String,
        /// Primary method name.
        method: String,
    },

    /// A method was found but its braces never balance.
    #[error("unbalanced braces in '{class}::{method}' starting at line {line}")]
    UnbalancedBody {
        /// Class that was searched.
        class: String,
        /// Method name as matched (primary or alias).
        method: String,
        /// 1-based line of the method declaration.
        line: usize,
    },

    /// The implementation body has no usable `process(...)` line.
    #[error("missing process declaration: {reason}")]
    MissingProcessDeclaration {
        /// 1-based line, when a partial declaration was found.
        line: Option<usize>,
        /// What was expected.
        reason: String,
    },

    /// A `declare` line in the implementation body has no quoted list.
    #[error("malformed declaration at line {line}: {reason}")]
    MalformedDeclaration {
        /// 1-based line number in the specification file.
        line: usize,
        /// What was expected.
        reason: String,
    },

    /// The variant set does not resolve to exactly one routine.
    #[error("ambiguous variant set: {reason}")]
    AmbiguousVariantSet {
        /// Description of the inconsistency.
        reason: String,
    },

    /// A variant's rates disagree with the declared signature.
    #[error("rate mismatch in variant '{variant}': {reason}")]
    RateMismatch {
        /// Variant rate suffix, e.g. `_ab_a`.
        variant: String,
        /// Description of the disagreement.
        reason: String,
    },

    /// The external DSL compiler could not be run or returned non-zero.
    #[error("external compiler failed on '{path}': {reason}")]
    ExternalCompilerFailure {
        /// DSL source that was being compiled.
        path: PathBuf,
        /// Exit status or spawn error.
        reason: String,
    },

    /// Failed to read an input file.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl UgenError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UgenError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UgenError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Line number carried by the error, if the raising component knew it.
    pub fn line(&self) -> Option<usize> {
        match self {
            UgenError::MalformedSignature { line, .. }
            | UgenError::MalformedDeclaration { line, .. }
            | UgenError::UnbalancedBody { line, .. } => Some(*line),
            UgenError::MissingProcessDeclaration { line, .. } => *line,
            _ => None,
        }
    }

    /// True for the one kind callers may tolerate as "optional feature absent".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UgenError::MethodNotFound { .. })
    }

    /// Attach unit and file context.
    pub fn in_unit(self, unit: impl Into<String>, file: impl Into<PathBuf>) -> TranslateError {
        TranslateError {
            unit: unit.into(),
            file: file.into(),
            line: self.line(),
            source: self,
        }
    }
}

/// A [`UgenError`] located in a unit and file.
#[derive(Debug, Error)]
#[error("{unit}: {}: {source}", location(.file, .line))]
pub struct TranslateError {
    /// Unit being translated.
    pub unit: String,
    /// File the failure concerns.
    pub file: PathBuf,
    /// 1-based line within `file`, when known.
    pub line: Option<usize>,
    /// Underlying failure.
    #[source]
    pub source: UgenError,
}

#[allow(clippy::ref_option)]
fn location(file: &Path, line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("{}:{line}", file.display()),
        None => file.display().to_string(),
    }
}

/// Attach unit and file context to a component result.
pub(crate) trait ResultExt<T> {
    fn in_unit(self, unit: &str, file: &Path) -> Result<T, TranslateError>;
}

impl<T> ResultExt<T> for Result<T, UgenError> {
    fn in_unit(self, unit: &str, file: &Path) -> Result<T, TranslateError> {
        self.map_err(|e| e.in_unit(unit, file))
    }
}
