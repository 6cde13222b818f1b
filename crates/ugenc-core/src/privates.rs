//! Private member declarations of a compiled class.

use crate::error::UgenError;
use crate::extract::find_class_declaration;
use crate::scanner::Cursor;

/// One member declared in the class's `private:` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateVariable {
    /// Element type, e.g. `float` or `FAUSTFLOAT`.
    pub ty: String,
    /// Member name.
    pub name: String,
    /// Array length text, for array members.
    pub array_len: Option<String>,
    /// True for compiler-computed constants shared by all channels.
    pub is_const: bool,
}

impl PrivateVariable {
    /// Parse one declaration such as `float fRec0[2];`.
    pub fn parse(line: &str) -> Option<Self> {
        let decl = line.trim().strip_suffix(';')?.trim();
        let (ty, declarator) = decl.rsplit_once(char::is_whitespace)?;
        let ty = ty.trim();
        if ty.is_empty() {
            return None;
        }

        let (name, array_len) = match declarator.split_once('[') {
            Some((name, len)) => (name, Some(len.strip_suffix(']')?.trim().to_string())),
            None => (declarator, None),
        };
        if name.is_empty() {
            return None;
        }

        Some(Self {
            ty: ty.to_string(),
            name: name.to_string(),
            array_len,
            is_const: name.starts_with("fConst") || name.starts_with("iConst"),
        })
    }

    /// Declaration text, e.g. `float fRec0[2];`.
    pub fn declaration(&self) -> String {
        match &self.array_len {
            Some(len) => format!("{} {}[{len}];", self.ty, self.name),
            None => format!("{} {};", self.ty, self.name),
        }
    }
}

/// Private members of `class_name`, excluding the sample-rate field.
///
/// A class without a `private:` section has no private members.
pub fn find_private_variables(
    class_name: &str,
    text: &str,
) -> Result<Vec<PrivateVariable>, UgenError> {
    let class_pos =
        find_class_declaration(class_name, text).ok_or_else(|| UgenError::ClassNotFound {
            class: class_name.to_string(),
        })?;

    let cur = Cursor::at(text, class_pos);
    let Some(private) = cur.find("private:") else {
        tracing::debug!(class = class_name, "no private section");
        return Ok(Vec::new());
    };
    let start = private + "private:".len();
    let end = Cursor::at(text, start).find("public:").unwrap_or(text.len());

    let mut vars = Vec::new();
    for line in text[start..end].lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") || line.contains("fSampleRate") {
            continue;
        }
        match PrivateVariable::parse(line) {
            Some(var) => vars.push(var),
            None => tracing::warn!(class = class_name, line, "skipping unrecognized private member"),
        }
    }
    tracing::debug!(class = class_name, count = vars.len(), "private members");
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scalar_and_array() {
        let v = PrivateVariable::parse("float fRec0[2];").unwrap();
        assert_eq!(v.ty, "float");
        assert_eq!(v.name, "fRec0");
        assert_eq!(v.array_len.as_deref(), Some("2"));
        assert!(!v.is_const);
        assert_eq!(v.declaration(), "float fRec0[2];");

        let c = PrivateVariable::parse("  float fConst0;").unwrap();
        assert!(c.is_const);
        assert_eq!(c.array_len, None);
    }

    #[test]
    fn parse_rejects_non_declarations() {
        assert!(PrivateVariable::parse("fRec0;").is_none());
        assert!(PrivateVariable::parse("float fRec0").is_none());
    }

    #[test]
    fn finds_private_section() {
        let src = "\
class Sine : public dsp {

 private:

    int fSampleRate;
    float fConst0;
    FAUSTFLOAT fEntry0;
    float fRec1[2];

 public:
    void metadata(Meta* m) {
    }
};
";
        let vars = find_private_variables("Sine", src).unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["fConst0", "fEntry0", "fRec1"]);
        assert!(vars[0].is_const);
        assert_eq!(vars[1].ty, "FAUSTFLOAT");
    }

    #[test]
    fn missing_class_is_an_error() {
        let err = find_private_variables("Sine", "class Mult {\n};\n").unwrap_err();
        assert!(matches!(err, UgenError::ClassNotFound { .. }));
    }

    #[test]
    fn no_private_section() {
        let vars = find_private_variables("A", "class A {\n public:\n};\n").unwrap();
        assert!(vars.is_empty());
    }
}
