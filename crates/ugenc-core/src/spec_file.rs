//! Reader for unit specification files.
//!
//! ```text
//! # sine oscillators
//! sine(freq: ab, amp: ab): a
//! sineb(freq: b, amp: b): b
//!
//! FAUST
//! import("stdfaust.lib");
//! process(freq, amp) = os.osc(freq) * amp;
//! ```
//!
//! Every line before `FAUST` is blank, a `#` comment, or a signature. A
//! signature whose `)` is not on its first line continues on the following
//! lines.

use std::path::Path;

use crate::error::UgenError;
use crate::implementation::Implementation;
use crate::signature::Signature;

/// Marker line that starts the implementation body.
pub const BODY_MARKER: &str = "FAUST";

/// A parsed specification file.
#[derive(Debug, Clone)]
pub struct SpecFile {
    /// Signatures in file order, each with the line it starts on.
    pub signatures: Vec<(usize, Signature)>,
    /// Header of the implementation body.
    pub implementation: Implementation,
    /// 1-based line number of the first body line.
    pub body_line: usize,
}

impl SpecFile {
    /// Parse specification text.
    pub fn parse(text: &str) -> Result<Self, UgenError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut signatures = Vec::new();
        let mut i = 0;

        let body_start = loop {
            let Some(line) = lines.get(i) else {
                return Err(UgenError::MissingProcessDeclaration {
                    line: None,
                    reason: format!("no '{BODY_MARKER}' line starts the implementation"),
                });
            };
            let trimmed = line.trim();
            let line_no = i + 1;
            i += 1;

            if trimmed == BODY_MARKER {
                break i;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut joined = trimmed.to_string();
            while !joined.contains(')') {
                match lines.get(i).map(|l| l.trim()) {
                    Some(next) if next != BODY_MARKER => {
                        joined.push_str(next);
                        i += 1;
                    }
                    _ => {
                        return Err(UgenError::MalformedSignature {
                            line: line_no,
                            reason: "expected ')' after parameters".to_string(),
                        });
                    }
                }
            }
            signatures.push((line_no, Signature::parse(&joined, line_no)?));
        };

        if signatures.is_empty() {
            return Err(UgenError::MalformedSignature {
                line: body_start,
                reason: format!("no signature before '{BODY_MARKER}'"),
            });
        }

        let implementation = Implementation::parse(&lines[body_start..], body_start + 1)?;
        tracing::debug!(
            signatures = signatures.len(),
            params = implementation.param_names.len(),
            "parsed specification"
        );
        Ok(Self {
            signatures,
            implementation,
            body_line: body_start + 1,
        })
    }

    /// Read and parse the specification file at `path`.
    pub fn read(path: &Path) -> Result<Self, UgenError> {
        let text = std::fs::read_to_string(path).map_err(|e| UgenError::read_file(path, e))?;
        Self::parse(&text)
    }
}
