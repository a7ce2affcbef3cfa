use crate::pipeline::FileOutcome;
use serde::Serialize;
use sift_code_chunker::{
    ChunkDescriptor, ChunkingStats, FileAnalysis, GeneratedKind, TemplateDeviation,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// JSON record emitted per file with `--json`
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub path: &'a str,
    pub language: &'static str,
    pub generated_kind: GeneratedKind,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deviations: Vec<TemplateDeviation>,
    pub chunks: Vec<ChunkDescriptor>,
}

impl<'a> FileReport<'a> {
    pub fn new(analysis: &'a FileAnalysis) -> Self {
        Self {
            path: &analysis.path,
            language: analysis.language.as_str(),
            generated_kind: analysis.file_classification.kind,
            confidence: analysis.file_classification.confidence,
            input_error: analysis.input_error.as_ref().map(ToString::to_string),
            deviations: analysis.deviations.clone(),
            chunks: analysis.descriptors(),
        }
    }
}

/// Human-readable listing of one file's chunks
pub fn render_file(analysis: &FileAnalysis) -> String {
    let mut text = String::new();
    let classification = &analysis.file_classification;
    text.push_str(&format!(
        "{} [{}] {} ({:.2})\n",
        analysis.path,
        analysis.language.as_str(),
        classification.kind,
        classification.confidence
    ));
    if let Some(error) = &analysis.input_error {
        text.push_str(&format!("  ! {error}\n"));
    }

    for chunk in &analysis.chunks {
        text.push_str(&format!(
            "  #{:<3} lines {:>5}-{:<5} bytes {:>7}..{:<7} {:<11} {:.2}  {:016x}",
            chunk.sequence_index,
            chunk.span.start_line,
            chunk.span.end_line,
            chunk.span.start,
            chunk.span.end,
            chunk.classification.kind.as_str(),
            chunk.classification.confidence,
            chunk.fingerprint
        ));
        if !chunk.deviations.is_empty() {
            let lines: Vec<String> = chunk.deviations.iter().map(ToString::to_string).collect();
            text.push_str(&format!("  deviations at {}", lines.join(", ")));
        }
        text.push('\n');
    }
    text
}

/// Aggregate over a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: usize,
    pub failed: usize,
    pub chunks: ChunkingStats,
    pub generated_files: BTreeMap<GeneratedKind, usize>,
    pub deviations: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[FileOutcome], elapsed: Duration) -> Self {
        let mut summary = Self {
            elapsed,
            ..Self::default()
        };
        for outcome in outcomes {
            match &outcome.result {
                Ok(analysis) => {
                    summary.files += 1;
                    summary.chunks.absorb(&analysis.stats());
                    summary.deviations += analysis.deviations.len();
                    let kind = analysis.file_classification.kind;
                    if kind.is_generated() {
                        *summary.generated_files.entry(kind).or_insert(0) += 1;
                    }
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn render(&self) -> String {
        let mut text = format!(
            "Files: {} (failed: {}) | {} | Deviations: {} | Time: {} ms\n",
            self.files,
            self.failed,
            self.chunks,
            self.deviations,
            self.elapsed.as_millis()
        );
        if !self.generated_files.is_empty() {
            let kinds: Vec<String> = self
                .generated_files
                .iter()
                .map(|(kind, count)| format!("{kind}: {count}"))
                .collect();
            text.push_str(&format!("Generated files: {}\n", kinds.join(", ")));
        }
        text
    }
}
