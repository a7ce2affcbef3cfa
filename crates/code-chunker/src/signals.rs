use crate::boundary::Structure;
use crate::catalog::{CompiledCatalog, DelegationRole};
use crate::config::SignalConfig;
use crate::language::{Language, ScanFamily};
use crate::line_index::{content_len, LineIndex};
use crate::types::{Signal, SignalKind, Span, StructuralUnit, UnitId, UnitKind};
use std::ops::Range;

/// Scans one file's text and boundary tree for classification signals
pub(crate) struct SignalExtractor<'a> {
    catalog: &'a CompiledCatalog,
    config: &'a SignalConfig,
}

/// Per-file inputs shared by every rule
struct FileView<'t> {
    text: &'t str,
    language: Language,
    lines: &'t LineIndex,
}

impl FileView<'_> {
    /// Line `line` without its terminator, clipped to `bounds`
    fn line_text(&self, line: usize, bounds: &Range<usize>) -> &str {
        let range = self.lines.line_range(line);
        let start = range.start.max(bounds.start);
        let end = (range.start + content_len(&self.text.as_bytes()[range])).min(bounds.end);
        if start >= end {
            return "";
        }
        &self.text[start..end]
    }

    /// Doc block at the top of `unit` and the line of its declaration
    fn split_header(&self, unit: &StructuralUnit) -> (Option<Span>, usize) {
        let bounds = unit.span.range();
        let mut line = unit.span.start_line;
        while line < unit.span.end_line {
            let trimmed = self.line_text(line, &bounds).trim();
            let is_lead = !trimmed.is_empty()
                && (self.language.is_comment_line(trimmed)
                    || self.language.is_attribute_line(trimmed)
                    || trimmed.ends_with("*/"));
            if !is_lead {
                break;
            }
            line += 1;
        }
        if line == unit.span.start_line {
            return (None, line);
        }
        let end = self.lines.line_range(line).start;
        (Some(self.lines.span(unit.span.start, end)), line)
    }

    /// Statement lines of a function body
    fn body_lines(&self, unit: &StructuralUnit) -> Vec<&str> {
        let (_, header_line) = self.split_header(unit);
        let header_start = self.lines.line_range(header_line).start.max(unit.span.start);
        let body = match self.language.family() {
            ScanFamily::Braces => {
                let region = &self.text[header_start..unit.span.end];
                match (region.find('{'), region.rfind('}')) {
                    (Some(open), Some(close)) if open < close => &region[open + 1..close],
                    _ => "",
                }
            }
            ScanFamily::Indentation => {
                let after_header = self.lines.line_range(header_line).end.min(unit.span.end);
                &self.text[after_header.max(header_start)..unit.span.end]
            }
        };
        body.lines()
            .map(str::trim)
            .filter(|line| self.is_statement(line))
            .collect()
    }

    fn is_statement(&self, trimmed: &str) -> bool {
        !trimmed.is_empty()
            && !self.language.is_comment_line(trimmed)
            && !trimmed
                .chars()
                .all(|c| matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ';' | ','))
            && !(self.language == Language::Ruby && trimmed == "end")
    }
}

impl<'a> SignalExtractor<'a> {
    pub(crate) fn new(catalog: &'a CompiledCatalog, config: &'a SignalConfig) -> Self {
        Self { catalog, config }
    }

    /// All signals of one file, ordered by location then kind
    pub(crate) fn extract(
        &self,
        text: &str,
        language: Language,
        structure: &Structure,
        lines: &LineIndex,
    ) -> Vec<Signal> {
        let view = FileView {
            text,
            language,
            lines,
        };
        let units = structure.root.descendants();
        let mut signals = Vec::new();

        for unit in units.iter().filter(|u| u.kind == UnitKind::Class) {
            self.class_signals(&view, unit, &mut signals);
        }
        self.delegation_signals(&view, &units, &mut signals);
        self.size_signals(structure, &units, &mut signals);
        for unit in units.iter().filter(|u| u.atomic) {
            signals.push(Signal {
                kind: SignalKind::LongLineOutlier,
                location: unit.span,
                weight: self.catalog.weights.long_line,
                subject: unit.id,
            });
        }

        signals.sort_by(|a, b| {
            (a.location.start, a.kind.rank(), a.subject).cmp(&(
                b.location.start,
                b.kind.rank(),
                b.subject,
            ))
        });
        signals
    }

    fn class_signals(&self, view: &FileView<'_>, unit: &StructuralUnit, out: &mut Vec<Signal>) {
        let (doc, header_line) = view.split_header(unit);

        if let Some(doc) = doc {
            let doc_text = &view.text[doc.range()];
            for marker in &self.catalog.doc_markers {
                if marker.regex.is_match(doc_text) {
                    out.push(Signal {
                        kind: SignalKind::DocMarker(marker.kind),
                        location: doc,
                        weight: marker.weight,
                        subject: unit.id,
                    });
                }
            }
        }

        let Some(name) = unit.name.as_deref() else {
            return;
        };
        if let Some(rule) = self.catalog.suffix_for(name) {
            let header = view.lines.line_range(header_line);
            let location = view
                .lines
                .span(header.start.max(unit.span.start), header.end.min(unit.span.end));
            out.push(Signal {
                kind: SignalKind::NamingSuffix(rule.kind),
                location,
                weight: rule.weight,
                subject: unit.id,
            });
        }
    }

    /// Whether a body forwards to a single collaborator
    fn delegates(&self, body: &[&str]) -> bool {
        if body.is_empty() {
            return false;
        }
        let mut forwards = 0usize;
        let mut classified = 0usize;
        let mut collaborator: Option<String> = None;

        for line in body {
            for rule in &self.catalog.delegation {
                match rule.role {
                    DelegationRole::Forward => {
                        let Some(target) = rule.collaborator_of(line) else {
                            continue;
                        };
                        match &collaborator {
                            Some(existing) if *existing != target => return false,
                            Some(_) => {}
                            None => collaborator = Some(target),
                        }
                        forwards += 1;
                    }
                    DelegationRole::OverrideLookup | DelegationRole::Passthrough => {
                        if !rule.regex.is_match(line) {
                            continue;
                        }
                    }
                }
                classified += 1;
                break;
            }
        }

        forwards > 0
            && classified as f64 / body.len() as f64 >= self.config.delegation_min_line_fraction
    }

    fn delegation_signals(
        &self,
        view: &FileView<'_>,
        units: &[&StructuralUnit],
        out: &mut Vec<Signal>,
    ) {
        let functions: Vec<&StructuralUnit> = units
            .iter()
            .copied()
            .filter(|u| u.kind == UnitKind::Function)
            .collect();
        if functions.is_empty() || self.catalog.delegation.is_empty() {
            return;
        }

        let matched: Vec<&StructuralUnit> = functions
            .iter()
            .copied()
            .filter(|unit| self.delegates(&view.body_lines(unit)))
            .collect();
        if matched.is_empty() {
            return;
        }

        let fraction = matched.len() as f64 / functions.len() as f64;
        let weight = self.catalog.weights.delegation * fraction / matched.len() as f64;
        for unit in matched {
            out.push(Signal {
                kind: SignalKind::DelegationIdiom,
                location: unit.span,
                weight,
                subject: unit.id,
            });
        }
    }

    fn size_signals(&self, structure: &Structure, units: &[&StructuralUnit], out: &mut Vec<Signal>) {
        let mut sizes: Vec<usize> = units.iter().skip(1).map(|u| u.span.len()).collect();
        let Some(median) = median(&mut sizes) else {
            return;
        };
        let limit = self.config.size_outlier_multiple * median;
        let weight = self.catalog.weights.size_outlier;
        let root = &structure.root;

        for unit in units {
            if unit.span.len() as f64 > limit {
                out.push(Signal {
                    kind: SignalKind::SizeOutlier,
                    location: unit.span,
                    weight,
                    subject: unit.id,
                });
            }
        }
        for literal in &structure.literals {
            if literal.len() as f64 > limit {
                out.push(Signal {
                    kind: SignalKind::SizeOutlier,
                    location: *literal,
                    weight,
                    subject: innermost_containing(root, literal),
                });
            }
        }
    }
}

fn median(values: &mut [usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    }
}

fn innermost_containing(unit: &StructuralUnit, span: &Span) -> UnitId {
    unit.children
        .iter()
        .find(|child| child.span.contains(span))
        .map_or(unit.id, |child| innermost_containing(child, span))
}
