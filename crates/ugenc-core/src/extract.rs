//! Method extraction from DSL compiler output.
//!
//! The compiler emits one C++ class per variant. Generation needs the text of
//! individual methods (`compute`, `instanceClear`, ...), which are located by
//! name after the class declaration and delimited by brace matching.
//!
//! Brace matching counts every `{` and `}` byte, including ones inside string
//! or character literals. Compiler output never places braces in literals, and
//! generated units depend on this exact matching.

use crate::error::UgenError;
use crate::scanner::{Cursor, find_ident, is_ident_char};

/// A method located inside a class, as whole source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMethod {
    /// Name that matched: the primary name or one of its aliases.
    pub name: String,
    /// 1-based line of the declaration within the scanned text.
    pub line: usize,
    text: String,
    header_lines: usize,
}

impl ExtractedMethod {
    /// The whole span, from the start of the declaration line through the
    /// end of the closing line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lines up to and including the one holding the opening brace.
    pub fn declaration(&self) -> Vec<&str> {
        self.text.lines().take(self.header_lines).collect()
    }

    /// Lines between the opening-brace line and the closing line.
    pub fn body_lines(&self) -> Vec<&str> {
        let lines: Vec<&str> = self.text.lines().collect();
        if lines.len() <= self.header_lines {
            return Vec::new();
        }
        lines[self.header_lines..lines.len() - 1].to_vec()
    }

    /// Body lines, each terminated by a newline.
    pub fn body(&self) -> String {
        self.body_lines()
            .iter()
            .map(|line| format!("{line}\n"))
            .collect()
    }

    /// The line holding the closing brace.
    pub fn closing(&self) -> &str {
        self.text.lines().last().unwrap_or("")
    }
}

/// Offset of the `class <name>` declaration, matching whole identifiers.
pub fn find_class_declaration(class_name: &str, text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = find_ident(text, from, "class") {
        let mut cur = Cursor::at(text, pos + "class".len());
        cur.skip_ws();
        let rest = cur.rest();
        let ident_len = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        if &rest[..ident_len] == class_name {
            return Some(pos);
        }
        from = pos + "class".len();
    }
    None
}

/// Offset of the `}` closing the `{` at `open`.
///
/// Scans forward from just after `open`, counting nested pairs.
pub fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in text.bytes().enumerate().skip(open + 1) {
        match byte {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Locate `method` (or the first alias that is present) in `class_name`.
///
/// Returns `Ok(None)` when neither the class nor any of the names is present,
/// and [`UgenError::UnbalancedBody`] when a definition is found whose braces
/// never balance. Occurrences followed by `;` before any `{` are calls or
/// prototypes and are skipped.
pub fn extract(
    class_name: &str,
    method: &str,
    text: &str,
    aliases: &[String],
) -> Result<Option<ExtractedMethod>, UgenError> {
    let Some(class_pos) = find_class_declaration(class_name, text) else {
        return Ok(None);
    };

    let names = std::iter::once(method).chain(aliases.iter().map(String::as_str));
    for name in names {
        if let Some(found) = extract_named(class_name, name, text, class_pos)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Like [`extract`], but an absent method is [`UgenError::MethodNotFound`].
pub fn require_method(
    class_name: &str,
    method: &str,
    text: &str,
    aliases: &[String],
) -> Result<ExtractedMethod, UgenError> {
    extract(class_name, method, text, aliases)?.ok_or_else(|| UgenError::MethodNotFound {
        class: class_name.to_string(),
        method: method.to_string(),
    })
}

fn extract_named(
    class_name: &str,
    name: &str,
    text: &str,
    class_pos: usize,
) -> Result<Option<ExtractedMethod>, UgenError> {
    let pattern = format!(" {name}(");
    let mut cur = Cursor::at(text, class_pos);

    while let Some(found) = cur.find(&pattern) {
        let after = Cursor::at(text, found + pattern.len());
        let open = after.find("{");
        let semi = after.find(";");

        let open = match (open, semi) {
            (Some(open), Some(semi)) if semi < open => {
                cur.seek(found + pattern.len());
                continue;
            }
            (None, Some(_)) => {
                cur.seek(found + pattern.len());
                continue;
            }
            (Some(open), _) => open,
            (None, None) => {
                return Err(UgenError::UnbalancedBody {
                    class: class_name.to_string(),
                    method: name.to_string(),
                    line: cur.line_number(found),
                });
            }
        };

        let Some(close) = find_matching_brace(text, open) else {
            return Err(UgenError::UnbalancedBody {
                class: class_name.to_string(),
                method: name.to_string(),
                line: cur.line_number(found),
            });
        };

        let start = cur.line_start(found + 1);
        let end = cur.line_end(close);
        let header_lines = text[start..open].bytes().filter(|&b| b == b'\n').count() + 1;
        return Ok(Some(ExtractedMethod {
            name: name.to_string(),
            line: cur.line_number(found + 1),
            text: text[start..end].to_string(),
            header_lines,
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "\
#define FAUSTCLASS Mult

class Mult : public dsp {
 private:
    float fRec0[2];
 public:
    static void classInit(int sample_rate) {
    }
    virtual void instanceClear() {
        for (int l0 = 0; (l0 < 2); l0 = (l0 + 1)) {
            fRec0[l0] = 0.0f;
        }
    }
    virtual void init(int sample_rate) {
        classInit(sample_rate);
    }
    virtual void frame(FAUSTFLOAT* inputs, FAUSTFLOAT* outputs) {
        outputs[0] = inputs[0];
    }
};
";

    #[test]
    fn extracts_whole_lines() {
        let m = extract("Mult", "instanceClear", SRC, &[]).unwrap().unwrap();
        assert_eq!(m.name, "instanceClear");
        assert_eq!(m.line, 9);
        assert!(m.text().starts_with("    virtual void instanceClear() {\n"));
        assert!(m.text().ends_with("        }\n    }\n"));
        assert_eq!(m.body_lines().len(), 3);
        assert_eq!(m.closing(), "    }");
    }

    #[test]
    fn empty_body() {
        let m = extract("Mult", "classInit", SRC, &[]).unwrap().unwrap();
        assert!(m.body_lines().is_empty());
        assert_eq!(m.declaration(), vec!["    static void classInit(int sample_rate) {"]);
    }

    #[test]
    fn absent_method_is_none() {
        assert!(extract("Mult", "control", SRC, &[]).unwrap().is_none());
    }

    #[test]
    fn absent_class_is_none() {
        assert!(extract("Sine", "instanceClear", SRC, &[]).unwrap().is_none());
    }

    #[test]
    fn class_name_must_match_whole_identifier() {
        assert!(find_class_declaration("Mul", SRC).is_none());
        assert!(find_class_declaration("Mult", SRC).is_some());
    }

    #[test]
    fn alias_is_tried_after_primary() {
        let aliases = vec!["frame".to_string()];
        let m = extract("Mult", "compute", SRC, &aliases).unwrap().unwrap();
        assert_eq!(m.name, "frame");
        assert_eq!(m.body_lines(), vec!["        outputs[0] = inputs[0];"]);
    }

    #[test]
    fn calls_are_not_definitions() {
        let src = "class A {\n    void run() {\n        step();\n    }\n    void step() {\n        x = 1;\n    }\n};\n";
        let m = extract("A", "step", src, &[]).unwrap().unwrap();
        assert_eq!(m.line, 5);
    }

    #[test]
    fn trailing_call_without_definition_is_absent() {
        let src = "class A {\n    void run() {\n        step();\n    }\n};\n";
        assert!(extract("A", "step", src, &[]).unwrap().is_none());
        assert!(matches!(
            require_method("A", "step", src, &[]),
            Err(UgenError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn unbalanced_body_is_an_error() {
        let src = "class A {\n    void run() {\n        if (x) {\n";
        let err = extract("A", "run", src, &[]).unwrap_err();
        assert!(matches!(err, UgenError::UnbalancedBody { line: 2, .. }));
    }

    #[test]
    fn braces_in_literals_are_counted() {
        let src = "class A {\n    void run() {\n        puts(\"}\");\n    }\n};\n";
        let m = extract("A", "run", src, &[]).unwrap().unwrap();
        // the quoted brace closes the method
        assert!(m.text().ends_with("puts(\"}\");\n"));
    }

    #[test]
    fn require_method_reports_missing() {
        let err = require_method("Mult", "compute", SRC, &[]).unwrap_err();
        assert!(matches!(err, UgenError::MethodNotFound { ref method, .. } if method == "compute"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn matching_brace() {
        assert_eq!(find_matching_brace("{a{b}c}", 0), Some(6));
        assert_eq!(find_matching_brace("{a{b}c", 0), None);
    }
}
