use crate::catalog::CompiledCatalog;
use crate::language::Language;
use crate::line_index::{content_len, LineIndex};
use crate::types::{Classification, GeneratedKind, UnitId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A line in a generated chunk that its generator would not have emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDeviation {
    pub unit: UnitId,
    pub kind: GeneratedKind,
    /// 1-based line number
    pub line: usize,
}

/// Check every line of each generated chunk against its kind's templates.
///
/// `regions` pairs a generated unit with the byte range of the chunk that
/// carries it, so absorbed header lines and trailing lines are checked too.
pub(crate) fn audit(
    text: &str,
    language: Language,
    regions: &[(UnitId, Range<usize>)],
    classifications: &[Classification],
    catalog: &CompiledCatalog,
    lines: &LineIndex,
) -> Vec<TemplateDeviation> {
    let bytes = text.as_bytes();
    let mut deviations = Vec::new();
    for (unit, range) in regions {
        let kind = classifications
            .get(unit.0)
            .map_or(GeneratedKind::None, |c| c.kind);
        if !kind.is_generated() {
            continue;
        }
        let Some(templates) = catalog.templates_for(language, kind) else {
            continue;
        };

        for start in lines.line_starts_in(range.start, range.end) {
            let line = lines.line_of(start);
            let end = lines.line_range(line).end.min(range.end);
            let Some(content) = text.get(start..start + content_len(&bytes[start..end])) else {
                continue;
            };
            let allowed = catalog
                .template_common
                .iter()
                .chain(templates)
                .any(|pattern| pattern.is_match(content));
            if !allowed {
                deviations.push(TemplateDeviation {
                    unit: *unit,
                    kind,
                    line,
                });
            }
        }
    }
    deviations.sort_by_key(|d| d.line);
    deviations
}
