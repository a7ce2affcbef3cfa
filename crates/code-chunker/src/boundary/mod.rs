//! Boundary detection: a lightweight structural tree for any source file.
//!
//! Two streaming scanners share one [`tree::TreeBuilder`]:
//!
//! - `braces` for languages that nest with `{ ... }`
//! - `indent` for Python and Ruby
//!
//! Neither can fail. Anything not recognized as a declaration degrades to a
//! `Block` unit or to gap bytes of the enclosing unit.

mod braces;
mod grammar;
mod indent;
mod tree;

pub(crate) use grammar::Grammar;

use crate::language::{Language, ScanFamily};
use crate::line_index::LineIndex;
use crate::types::{Span, StructuralUnit};
use serde::{Deserialize, Serialize};

/// Boundary tree of one file plus the literal spans found while scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub root: StructuralUnit,
    /// String literals at least `min_literal_bytes` long
    pub literals: Vec<Span>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanOptions {
    pub long_line_threshold: usize,
    pub min_literal_bytes: usize,
}

impl ScanOptions {
    pub(crate) fn is_long(&self, line: &[u8]) -> bool {
        crate::line_index::content_len(line) >= self.long_line_threshold
    }
}

/// Build the boundary tree of `text`
pub(crate) fn detect(
    text: &str,
    language: Language,
    lines: &LineIndex,
    grammar: &Grammar,
    options: &ScanOptions,
) -> Structure {
    let (builder, literals) = match language.family() {
        ScanFamily::Braces => braces::scan(text, language, lines, grammar, options),
        ScanFamily::Indentation => indent::scan(text, language, lines, grammar, options),
    };
    let root = builder.finish(lines);
    let literals = literals
        .into_iter()
        .map(|(start, end)| lines.span(start, end))
        .collect();
    Structure { root, literals }
}

/// Start of the comment/attribute block directly above `decl_line`.
///
/// Returns the start of `decl_line` itself when nothing precedes it.
pub(crate) fn lead_start(text: &str, language: Language, lines: &LineIndex, decl_line: usize) -> usize {
    let mut first = decl_line;
    while first > 1 {
        let range = lines.line_range(first - 1);
        let trimmed = text[range].trim();
        let is_lead = !trimmed.is_empty()
            && (language.is_comment_line(trimmed)
                || language.is_attribute_line(trimmed)
                || trimmed.ends_with("*/"));
        if !is_lead {
            break;
        }
        first -= 1;
    }
    lines.line_range(first).start
}

/// End of a closing delimiter at `pos`, extended over `[ \t;,]*` and one line break
pub(crate) fn trailing_end(bytes: &[u8], pos: usize) -> usize {
    let mut idx = pos;
    while idx < bytes.len() && matches!(bytes[idx], b' ' | b'\t' | b';' | b',') {
        idx += 1;
    }
    if bytes[idx..].starts_with(b"\r\n") {
        idx + 2
    } else if bytes.get(idx) == Some(&b'\n') {
        idx + 1
    } else {
        pos
    }
}
