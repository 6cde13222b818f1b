//! The declarative header of an implementation body.
//!
//! The body that follows the `FAUST` marker is DSL source. Two of its lines
//! matter to the translator: the `process(...)` definition, whose parameter
//! list fixes the order of implementation parameters, and the optional
//! declarations
//!
//! ```text
//! declare interpolated "amp, freq";
//! declare terminate "input";
//! ```
//!
//! naming parameters that ramp across a block and parameters whose
//! termination ends the unit.

use crate::error::UgenError;
use crate::scanner::{Cursor, find_ident};

const INTERPOLATED: &str = "declare interpolated";
const TERMINATE: &str = "declare terminate";

/// A parsed implementation body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implementation {
    /// Lines before the `process` line.
    pub before: Vec<String>,
    /// Parameter names in `process(...)` order.
    pub param_names: Vec<String>,
    /// Parallel to `param_names`: true if declared interpolated.
    pub param_interp: Vec<bool>,
    /// Remainder of the `process` line, starting at `=`.
    pub beyond_process: String,
    /// Lines after the `process` line.
    pub after: Vec<String>,
    /// Parameters named by `declare terminate`.
    pub terminate: Vec<String>,
    /// 1-based line of the `process` definition.
    pub process_line: usize,
}

impl Implementation {
    /// Parse body lines; `first_line` is the 1-based line number of
    /// `lines[0]` in the enclosing file.
    pub fn parse(lines: &[&str], first_line: usize) -> Result<Self, UgenError> {
        let mut interpolated = Vec::new();
        let mut process = None;

        for (i, line) in lines.iter().enumerate() {
            if is_comment(line) {
                continue;
            }
            if line.contains(INTERPOLATED) {
                interpolated = quoted_list(line, INTERPOLATED, first_line + i)?;
            } else if find_ident(line, 0, "process").is_some() {
                process = Some(i);
                break;
            }
        }

        let Some(index) = process else {
            return Err(UgenError::MissingProcessDeclaration {
                line: None,
                reason: "no 'process' definition in the implementation".to_string(),
            });
        };
        let line_no = first_line + index;
        let (param_names, beyond_process) = parse_process_line(lines[index], line_no)?;

        let mut terminate = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if !is_comment(line) && line.contains(TERMINATE) {
                terminate = quoted_list(line, TERMINATE, first_line + i)?;
            }
        }

        for name in &interpolated {
            if !param_names.contains(name) {
                tracing::warn!(name = %name, "interpolated name is not a process parameter");
            }
        }
        let param_interp = param_names.iter().map(|p| interpolated.contains(p)).collect();

        Ok(Self {
            before: lines[..index].iter().map(|s| (*s).to_string()).collect(),
            param_names,
            param_interp,
            beyond_process,
            after: lines[index + 1..].iter().map(|s| (*s).to_string()).collect(),
            terminate,
            process_line: line_no,
        })
    }

    /// True if `name` is declared interpolated.
    pub fn is_interpolated(&self, name: &str) -> bool {
        self.param_names
            .iter()
            .zip(&self.param_interp)
            .any(|(p, &interp)| interp && p == name)
    }

    /// Clear every interpolation flag.
    ///
    /// Block-rate units have no per-sample loop to ramp within.
    pub fn disable_interpolation(&mut self) {
        self.param_interp.iter_mut().for_each(|flag| *flag = false);
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

fn parse_process_line(line: &str, line_no: usize) -> Result<(Vec<String>, String), UgenError> {
    let missing = |reason: &str| UgenError::MissingProcessDeclaration {
        line: Some(line_no),
        reason: reason.to_string(),
    };

    let pos = find_ident(line, 0, "process").ok_or_else(|| missing("expected 'process'"))?;
    let mut cur = Cursor::at(line, pos + "process".len());
    cur.skip_ws();

    let names = match cur.peek() {
        Some('(') => {
            let close = cur
                .find(")")
                .ok_or_else(|| missing("expected ')' after 'process('"))?;
            let list = &line[cur.pos() + 1..close];
            cur.seek(close + 1);
            split_names(list)
        }
        Some('=') => Vec::new(),
        _ => return Err(missing("expected '(' or '=' after 'process'")),
    };

    let eq = cur
        .find("=")
        .ok_or_else(|| missing("expected '=' after 'process(...)'"))?;
    Ok((names, line[eq..].to_string()))
}

fn quoted_list(line: &str, keyword: &str, line_no: usize) -> Result<Vec<String>, UgenError> {
    let malformed = || UgenError::MalformedDeclaration {
        line: line_no,
        reason: format!("expected a quoted list after '{keyword}'"),
    };
    let start = line.find(keyword).map_or(0, |k| k + keyword.len());
    let cur = Cursor::at(line, start);
    let open = cur.find("\"").ok_or_else(malformed)?;
    let close = Cursor::at(line, open + 1).find("\"").ok_or_else(malformed)?;
    Ok(split_names(&line[open + 1..close]))
}

fn split_names(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[&str] = &[
        "import(\"stdfaust.lib\");",
        "declare interpolated \"amp\";",
        "process(freq, amp) = os.osc(freq) * amp;",
        "declare terminate \"amp\";",
    ];

    #[test]
    fn parses_names_and_flags() {
        let imp = Implementation::parse(BODY, 10).unwrap();
        assert_eq!(imp.param_names, ["freq", "amp"]);
        assert_eq!(imp.param_interp, [false, true]);
        assert!(imp.is_interpolated("amp"));
        assert!(!imp.is_interpolated("freq"));
        assert_eq!(imp.beyond_process, "= os.osc(freq) * amp;");
        assert_eq!(imp.before.len(), 2);
        assert_eq!(imp.after.len(), 1);
        assert_eq!(imp.terminate, ["amp"]);
        assert_eq!(imp.process_line, 12);
    }

    #[test]
    fn names_may_be_space_separated() {
        let imp = Implementation::parse(
            &["declare interpolated \"a b,c\";", "process(a, b, c) = _;"],
            1,
        )
        .unwrap();
        assert_eq!(imp.param_interp, [true, true, true]);
    }

    #[test]
    fn process_without_parameters() {
        let imp = Implementation::parse(&["process = no.noise;"], 1).unwrap();
        assert!(imp.param_names.is_empty());
        assert_eq!(imp.beyond_process, "= no.noise;");
    }

    #[test]
    fn identifier_containing_process_is_ignored() {
        let imp =
            Implementation::parse(&["preprocess = _;", "process(x) = preprocess(x);"], 1).unwrap();
        assert_eq!(imp.param_names, ["x"]);
        assert_eq!(imp.process_line, 2);
    }

    #[test]
    fn missing_process_is_an_error() {
        let err = Implementation::parse(&["import(\"stdfaust.lib\");"], 1).unwrap_err();
        assert!(matches!(err, UgenError::MissingProcessDeclaration { line: None, .. }));
    }

    #[test]
    fn unterminated_parameter_list_is_an_error() {
        let err = Implementation::parse(&["", "process(freq, amp = _;"], 5).unwrap_err();
        assert!(matches!(err, UgenError::MissingProcessDeclaration { line: Some(6), .. }));
    }

    #[test]
    fn unquoted_declaration_is_an_error() {
        let err = Implementation::parse(&["declare interpolated amp;", "process(amp) = _;"], 3)
            .unwrap_err();
        assert!(matches!(err, UgenError::MalformedDeclaration { line: 3, .. }));
    }

    #[test]
    fn disable_interpolation_clears_flags() {
        let mut imp = Implementation::parse(BODY, 1).unwrap();
        imp.disable_interpolation();
        assert_eq!(imp.param_interp, [false, false]);
        assert_eq!(imp.param_names.len(), imp.param_interp.len());
    }
}
