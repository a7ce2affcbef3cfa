use super::grammar::Grammar;
use super::tree::TreeBuilder;
use super::{lead_start, ScanOptions};
use crate::language::Language;
use crate::line_index::{content_len, LineIndex};
use crate::types::UnitKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Str { quote: u8, triple: bool, start: usize },
}

/// String- and bracket-aware line lexer; `#` starts a comment
struct Lexer {
    language: Language,
    min_literal_bytes: usize,
    state: Lex,
    brackets: usize,
    literals: Vec<(usize, usize)>,
}

impl Lexer {
    /// Whether the next line starts a new logical line
    fn at_logical_start(&self) -> bool {
        self.state == Lex::Code && self.brackets == 0
    }

    /// Lex `bytes[start..end]`, returning where a trailing comment starts
    fn line(&mut self, bytes: &[u8], start: usize, end: usize) -> usize {
        let mut i = start;
        while i < end {
            let byte = bytes[i];
            match self.state {
                Lex::Str {
                    quote,
                    triple,
                    start: literal_start,
                } => {
                    if byte == b'\\' {
                        i += 2;
                        continue;
                    }
                    if byte == b'\n' && !triple && !self.language.quote_spans_lines(quote) {
                        self.state = Lex::Code;
                        i += 1;
                        continue;
                    }
                    if byte != quote {
                        i += 1;
                        continue;
                    }
                    let close = if triple {
                        if bytes[i..].starts_with(&[quote, quote, quote]) {
                            i + 3
                        } else {
                            i += 1;
                            continue;
                        }
                    } else {
                        i + 1
                    };
                    if close - literal_start >= self.min_literal_bytes {
                        self.literals.push((literal_start, close));
                    }
                    self.state = Lex::Code;
                    i = close;
                }
                Lex::Code => {
                    match byte {
                        b'#' => return i,
                        b'"' | b'\'' => {
                            let triple = self.language.has_triple_quotes()
                                && bytes[i..].starts_with(&[byte, byte, byte]);
                            self.state = Lex::Str {
                                quote: byte,
                                triple,
                                start: i,
                            };
                            i += if triple { 3 } else { 1 };
                            continue;
                        }
                        b'(' | b'[' | b'{' => self.brackets += 1,
                        b')' | b']' | b'}' => self.brackets = self.brackets.saturating_sub(1),
                        _ => {}
                    }
                    i += 1;
                }
            }
        }
        end
    }
}

/// Scan an indentation-structured language. Frame aux values hold the
/// indentation width of the header line.
pub(super) fn scan(
    text: &str,
    language: Language,
    lines: &LineIndex,
    grammar: &Grammar,
    options: &ScanOptions,
) -> (TreeBuilder, Vec<(usize, usize)>) {
    let bytes = text.as_bytes();
    let mut builder = TreeBuilder::new(bytes.len());
    let mut lexer = Lexer {
        language,
        min_literal_bytes: options.min_literal_bytes,
        state: Lex::Code,
        brackets: 0,
        literals: Vec::new(),
    };
    let mut last_code_end = 0usize;

    for line_no in 1..=lines.line_count() {
        let range = lines.line_range(line_no);
        let line_end = range.start + content_len(&bytes[range.clone()]);
        let long = options.is_long(&bytes[range.clone()]);
        let logical_start = lexer.at_logical_start();
        let code_end = lexer.line(bytes, range.start, range.end);

        let raw = &text[range.start..line_end];
        let code = text[range.start..code_end.min(line_end)].trim();
        let has_code = if logical_start {
            !code.is_empty()
        } else {
            !raw.trim().is_empty()
        };

        if logical_start && has_code {
            let indent = indent_width(raw);

            if language == Language::Ruby && is_ruby_end(code) {
                close_deeper(&mut builder, indent, last_code_end);
                if builder.top_aux() == Some(indent) {
                    builder.close(range.end);
                }
                last_code_end = range.end;
                continue;
            }

            close_at_or_deeper(&mut builder, indent, last_code_end);

            if !long {
                if let Some(decl) = grammar.match_line(language, raw) {
                    let lead = lead_start(text, language, lines, line_no);
                    builder.open(decl.kind, decl.name, lead, range.start, indent);
                } else if opens_block(language, code) {
                    builder.open(UnitKind::Block, None, range.start, range.start, indent);
                }
            }
        }

        if long {
            builder.leaf(UnitKind::Statement, None, range.start, range.end, true);
        }
        if has_code {
            last_code_end = range.end;
        }
    }

    while builder.top_aux().is_some() {
        builder.close(last_code_end);
    }

    (builder, lexer.literals)
}

/// Close frames whose header is indented at least as far as this line
fn close_at_or_deeper(builder: &mut TreeBuilder, indent: usize, end: usize) {
    while builder.top_aux().is_some_and(|frame_indent| frame_indent >= indent) {
        builder.close(end);
    }
}

fn close_deeper(builder: &mut TreeBuilder, indent: usize, end: usize) {
    while builder.top_aux().is_some_and(|frame_indent| frame_indent > indent) {
        builder.close(end);
    }
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

fn opens_block(language: Language, code: &str) -> bool {
    match language {
        Language::Ruby => {
            let first = code.split_whitespace().next().unwrap_or_default();
            matches!(
                first,
                "if" | "unless" | "while" | "until" | "case" | "begin" | "for"
            ) || code == "do"
                || code.ends_with(" do")
                || (code.contains(" do |") && code.ends_with('|'))
        }
        _ => code.ends_with(':'),
    }
}

fn is_ruby_end(code: &str) -> bool {
    code == "end"
        || code
            .strip_prefix("end")
            .is_some_and(|rest| rest.starts_with(|c: char| !(c.is_alphanumeric() || c == '_')))
}
