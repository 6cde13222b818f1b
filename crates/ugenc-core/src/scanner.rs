//! Bounds-checked text cursor and identifier-aware search helpers.
//!
//! All offsets are byte offsets into the scanned text. The scanned text is
//! compiler output and specification files; every delimiter searched for is
//! ASCII, so offsets produced here always fall on character boundaries.

/// A read-only position within a text.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Cursor at `pos`, clamped to the end of `text`.
    pub fn at(text: &'a str, pos: usize) -> Self {
        Self {
            text,
            pos: pos.min(text.len()),
        }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move to `pos`, clamped to the end of the text.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    /// Text from the current offset to the end.
    pub fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    /// Character at the current offset.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Step over one character.
    pub fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    /// Step over whitespace, including newlines.
    pub fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    /// Absolute offset of the next occurrence of `pat` at or after the
    /// current offset.
    pub fn find(&self, pat: &str) -> Option<usize> {
        self.rest().find(pat).map(|i| self.pos + i)
    }

    /// Offset of the first character of the line containing `pos`.
    pub fn line_start(&self, pos: usize) -> usize {
        let pos = pos.min(self.text.len());
        self.text
            .get(..pos)
            .and_then(|head| head.rfind('\n'))
            .map_or(0, |nl| nl + 1)
    }

    /// Offset just past the newline ending the line containing `pos`, or
    /// the end of the text for a final unterminated line.
    pub fn line_end(&self, pos: usize) -> usize {
        let pos = pos.min(self.text.len());
        self.text
            .get(pos..)
            .and_then(|tail| tail.find('\n'))
            .map_or(self.text.len(), |nl| pos + nl + 1)
    }

    /// 1-based line number of `pos`.
    pub fn line_number(&self, pos: usize) -> usize {
        let pos = pos.min(self.text.len());
        self.text
            .get(..pos)
            .map_or(1, |head| head.bytes().filter(|&b| b == b'\n').count() + 1)
    }
}

/// Identifier characters in the scanned C-family text.
pub fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Offset of the next occurrence of `ident` at or after `from` that is not
/// embedded in a longer identifier.
pub fn find_ident(text: &str, from: usize, ident: &str) -> Option<usize> {
    if ident.is_empty() {
        return None;
    }
    let mut search = from;
    while let Some(rel) = text.get(search..).and_then(|tail| tail.find(ident)) {
        let start = search + rel;
        let end = start + ident.len();
        let before_ok = text[..start].chars().next_back().is_none_or(|c| !is_ident_char(c));
        let after_ok = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));
        if before_ok && after_ok {
            return Some(start);
        }
        search = start + ident.len();
    }
    None
}

/// True if `ident` occurs in `text` as a whole identifier.
pub fn contains_ident(text: &str, ident: &str) -> bool {
    find_ident(text, 0, ident).is_some()
}

/// Replace every whole-identifier occurrence of `ident` with `replacement`.
pub fn replace_ident(text: &str, ident: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    while let Some(start) = find_ident(text, copied, ident) {
        out.push_str(&text[copied..start]);
        out.push_str(replacement);
        copied = start + ident.len();
    }
    out.push_str(&text[copied..]);
    out
}

/// Expand tabs to four spaces, the indentation unit of generated code.
pub fn expand_tabs(text: &str) -> String {
    text.replace('\t', "    ")
}

/// Strip up to four leading spaces (one indentation level).
pub fn dedent_once(line: &str) -> &str {
    line.strip_prefix("    ").unwrap_or(line)
}

/// Indent every non-empty line by `levels` steps of four spaces.
pub fn indent_lines(text: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
