use super::grammar::Grammar;
use super::tree::TreeBuilder;
use super::{lead_start, trailing_end, ScanOptions};
use crate::language::Language;
use crate::line_index::{content_len, LineIndex};
use crate::types::UnitKind;

/// Lines a declaration may wait for its opening brace
const MAX_PENDING_LINES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    BlockComment,
    Str { quote: u8, triple: bool, start: usize },
}

/// Declaration seen at a line start, waiting for its `{` or `;`
#[derive(Debug)]
struct Pending {
    kind: UnitKind,
    name: Option<String>,
    lead: usize,
    line: usize,
    depth: usize,
}

/// Scan a brace-delimited language. Frame aux values hold the paren depth
/// outside the frame.
pub(super) fn scan(
    text: &str,
    language: Language,
    lines: &LineIndex,
    grammar: &Grammar,
    options: &ScanOptions,
) -> (TreeBuilder, Vec<(usize, usize)>) {
    let bytes = text.as_bytes();
    let mut builder = TreeBuilder::new(bytes.len());
    let mut literals = Vec::new();
    let mut state = Lex::Code;
    let mut paren = 0usize;
    let mut pending: Option<Pending> = None;

    for line_no in 1..=lines.line_count() {
        let range = lines.line_range(line_no);
        let long = options.is_long(&bytes[range.clone()]);

        if long {
            builder.leaf(UnitKind::Statement, None, range.start, range.end, true);
            pending = None;
        }
        if pending
            .as_ref()
            .is_some_and(|p| line_no - p.line > MAX_PENDING_LINES)
        {
            pending = None;
        }
        if !long && state == Lex::Code && paren == 0 {
            let end = range.start + content_len(&bytes[range.clone()]);
            if let Some(decl) = grammar.match_line(language, &text[range.start..end]) {
                pending = Some(Pending {
                    kind: decl.kind,
                    name: decl.name,
                    lead: lead_start(text, language, lines, line_no),
                    line: line_no,
                    depth: builder.depth(),
                });
            }
        }

        let mut i = range.start;
        while i < range.end {
            let byte = bytes[i];
            match state {
                Lex::BlockComment => {
                    if byte == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        state = Lex::Code;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                Lex::Str {
                    quote,
                    triple,
                    start,
                } => {
                    if byte == b'\\' && quote != b'`' {
                        i += 2;
                        continue;
                    }
                    if byte == b'\n' && !triple && !language.quote_spans_lines(quote) {
                        // Unterminated literal; resume as code on the next line.
                        state = Lex::Code;
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
                    if close - start >= options.min_literal_bytes {
                        literals.push((start, close));
                    }
                    state = Lex::Code;
                    i = close;
                }
                Lex::Code => {
                    if starts_line_comment(language, bytes, i) {
                        break;
                    }
                    if language.has_block_comments()
                        && byte == b'/'
                        && bytes.get(i + 1) == Some(&b'*')
                    {
                        state = Lex::BlockComment;
                        i += 2;
                        continue;
                    }
                    if language.quotes().contains(&byte) {
                        if byte == b'\'' && language.has_lifetimes() && !is_char_literal(bytes, i) {
                            i += 1;
                            continue;
                        }
                        let triple = language.has_triple_quotes()
                            && bytes[i..].starts_with(&[byte, byte, byte]);
                        state = Lex::Str {
                            quote: byte,
                            triple,
                            start: i,
                        };
                        i += if triple { 3 } else { 1 };
                        continue;
                    }
                    match byte {
                        b'(' | b'[' => paren += 1,
                        b')' | b']' => paren = paren.saturating_sub(1),
                        b'{' => {
                            if long {
                                builder.open_opaque(paren);
                            } else if let Some(decl) =
                                take_pending(&mut pending, builder.depth(), paren)
                            {
                                builder.open(decl.kind, decl.name, decl.lead, i + 1, paren);
                            } else {
                                builder.open(UnitKind::Block, None, range.start, i + 1, paren);
                            }
                            paren = 0;
                        }
                        b'}' => {
                            if let Some(outer_paren) = builder.top_aux() {
                                let end = if long {
                                    range.end
                                } else {
                                    trailing_end(bytes, i + 1)
                                };
                                builder.close(end);
                                paren = outer_paren;
                                let depth = builder.depth();
                                if pending.as_ref().is_some_and(|p| p.depth > depth) {
                                    pending = None;
                                }
                            }
                        }
                        b';' if !long => {
                            if let Some(decl) = take_pending(&mut pending, builder.depth(), paren) {
                                // Body-less declaration: interface or abstract method, forward declaration.
                                let (kind, name) = match decl.kind {
                                    UnitKind::Function => (UnitKind::Function, decl.name),
                                    _ => (UnitKind::Statement, None),
                                };
                                builder.leaf(kind, name, decl.lead, trailing_end(bytes, i + 1), false);
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
        }
    }

    (builder, literals)
}

fn take_pending(pending: &mut Option<Pending>, depth: usize, paren: usize) -> Option<Pending> {
    match pending.take() {
        Some(decl) if decl.depth == depth && paren == 0 => Some(decl),
        other => {
            *pending = other;
            None
        }
    }
}

fn starts_line_comment(language: Language, bytes: &[u8], at: usize) -> bool {
    language.line_comment_markers().iter().any(|marker| {
        bytes[at..].starts_with(marker.as_bytes())
            && !(*marker == "#" && bytes.get(at + 1) == Some(&b'['))
    })
}

/// `'x'` or `'\n'` rather than a lifetime or loop label
fn is_char_literal(bytes: &[u8], at: usize) -> bool {
    match bytes.get(at + 1) {
        Some(b'\\') => true,
        Some(&lead) => {
            let width = match lead {
                0x00..=0x7f => 1,
                0xc0..=0xdf => 2,
                0xe0..=0xef => 3,
                _ => 4,
            };
            bytes.get(at + 1 + width) == Some(&b'\'')
        }
        None => false,
    }
}
