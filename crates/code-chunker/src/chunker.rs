use crate::audit::{audit, TemplateDeviation};
use crate::boundary::{self, Grammar, ScanOptions, Structure};
use crate::catalog::{CompiledCatalog, SignalCatalog};
use crate::classifier::Classifier;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, InputError, Result};
use crate::fingerprint::fingerprint;
use crate::language::Language;
use crate::line_index::LineIndex;
use crate::partition::{partition, Draft};
use crate::signals::SignalExtractor;
use crate::types::{
    Chunk, ChunkDescriptor, Classification, GeneratedKind, Signal, SourceFile, StructuralUnit,
    UnitId, UnitKind,
};
use std::path::Path;

/// Main chunker interface for processing files.
///
/// Holds only read-only state (configuration, compiled catalog, declaration
/// grammar), so one instance can be shared across worker threads.
pub struct Chunker {
    config: ChunkerConfig,
    catalog: CompiledCatalog,
    grammar: Grammar,
    classifier: Classifier,
}

impl Chunker {
    /// Validate the configuration and compile the catalog.
    ///
    /// This is the only place a configuration error can surface.
    pub fn new(config: ChunkerConfig, catalog: &SignalCatalog) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        let catalog = catalog.compile()?;
        let grammar = Grammar::new()?;
        let classifier = Classifier::new(&config.classifier);
        Ok(Self {
            config,
            catalog,
            grammar,
            classifier,
        })
    }

    /// Default configuration with the built-in catalog
    pub fn with_defaults() -> Result<Self> {
        Self::new(ChunkerConfig::default(), &SignalCatalog::builtin())
    }

    /// Run every stage over one file. Never fails.
    pub fn chunk(&self, file: &SourceFile) -> FileAnalysis {
        let content = file.content();
        let language = Language::from_tag(file.language_tag(), file.path());
        let lines = LineIndex::new(content);

        let text = match std::str::from_utf8(content) {
            Ok(text) => text,
            Err(err) => {
                let error = InputError {
                    path: file.path().to_string(),
                    valid_up_to: err.valid_up_to(),
                };
                log::warn!("{error}; emitting the file as a single opaque chunk");
                return Self::opaque(file, language, &lines, error);
            }
        };

        let options = ScanOptions {
            long_line_threshold: self.config.long_line_threshold_bytes,
            min_literal_bytes: self.config.signals.min_literal_bytes,
        };
        let structure = boundary::detect(text, language, &lines, &self.grammar, &options);
        let signals = SignalExtractor::new(&self.catalog, &self.config.signals)
            .extract(text, language, &structure, &lines);
        let classifications = self.classifier.classify_tree(&structure.root, &signals);
        let file_classification = self.classifier.classify(&signals);

        let drafts = partition(
            content,
            &structure.root,
            &classifications,
            self.config.target_chunk_bytes,
            self.config.max_chunk_bytes,
        );

        let deviations = if self.config.signals.audit_templates {
            let regions: Vec<_> = drafts
                .iter()
                .filter(|draft| draft.generated)
                .filter_map(|draft| {
                    draft
                        .members
                        .first()
                        .map(|&unit| (unit, draft.start..draft.end))
                })
                .collect();
            audit(
                text,
                language,
                &regions,
                &classifications,
                &self.catalog,
                &lines,
            )
        } else {
            Vec::new()
        };
        let chunks = drafts
            .iter()
            .enumerate()
            .map(|(sequence_index, draft)| Chunk {
                span: lines.span(draft.start, draft.end),
                classification: merged_classification(draft, &classifications),
                sequence_index,
                fingerprint: fingerprint(&content[draft.start..draft.end], language),
                deviations: deviations
                    .iter()
                    .filter(|d| draft.members.contains(&d.unit))
                    .map(|d| d.line)
                    .collect(),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "{}: {} units, {} signals, {} chunks ({} generated), file kind {} ({:.2})",
            file.path(),
            structure.root.count(),
            signals.len(),
            chunks.len(),
            chunks.iter().filter(|c| c.classification.is_generated()).count(),
            file_classification.kind,
            file_classification.confidence
        );

        FileAnalysis {
            path: file.path().to_string(),
            language,
            structure,
            signals,
            classifications,
            file_classification,
            deviations,
            chunks,
            input_error: None,
        }
    }

    /// Read and chunk a file; only the read can fail
    pub fn chunk_file(&self, path: impl AsRef<Path>) -> Result<FileAnalysis> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let tag = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let file = SourceFile::new(path.to_string_lossy(), tag, content);
        Ok(self.chunk(&file))
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn get_stats(chunks: &[Chunk]) -> ChunkingStats {
        ChunkingStats {
            total_chunks: chunks.len(),
            generated_chunks: chunks
                .iter()
                .filter(|c| c.classification.is_generated())
                .count(),
            total_lines: chunks.iter().map(Chunk::line_count).sum(),
            total_bytes: chunks.iter().map(Chunk::len).sum(),
            min_bytes: chunks.iter().map(Chunk::len).min().unwrap_or(0),
            max_bytes: chunks.iter().map(Chunk::len).max().unwrap_or(0),
        }
    }

    /// Whole-file fallback for content that is not valid UTF-8
    fn opaque(file: &SourceFile, language: Language, lines: &LineIndex, error: InputError) -> FileAnalysis {
        let content = file.content();
        let span = lines.span(0, content.len());
        let root = StructuralUnit {
            id: UnitId(0),
            kind: UnitKind::File,
            span,
            name: None,
            atomic: false,
            children: Vec::new(),
        };
        let chunks = if content.is_empty() {
            Vec::new()
        } else {
            vec![Chunk {
                span,
                classification: Classification::none(),
                sequence_index: 0,
                fingerprint: fingerprint(content, language),
                deviations: Vec::new(),
            }]
        };
        FileAnalysis {
            path: file.path().to_string(),
            language,
            structure: Structure {
                root,
                literals: Vec::new(),
            },
            signals: Vec::new(),
            classifications: vec![Classification::none()],
            file_classification: Classification::none(),
            deviations: Vec::new(),
            chunks,
            input_error: Some(error),
        }
    }
}

/// A single member keeps its classification; several collapse to `None`
fn merged_classification(draft: &Draft, classifications: &[Classification]) -> Classification {
    match draft.members.as_slice() {
        [] => Classification::none(),
        [only] => classifications.get(only.0).cloned().unwrap_or_default(),
        many => {
            let members: Vec<&Classification> = many
                .iter()
                .filter_map(|id| classifications.get(id.0))
                .collect();
            let confidence = members
                .iter()
                .map(|c| c.confidence)
                .fold(0.0, f64::max);
            let mut supporting_signals: Vec<Signal> = members
                .iter()
                .flat_map(|c| c.supporting_signals.iter().cloned())
                .collect();
            supporting_signals.sort_by(|a, b| {
                (a.location.start, a.kind.rank(), a.subject).cmp(&(
                    b.location.start,
                    b.kind.rank(),
                    b.subject,
                ))
            });
            supporting_signals.dedup();
            Classification {
                kind: GeneratedKind::None,
                confidence,
                supporting_signals,
            }
        }
    }
}

/// Everything one processing call produced for a file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub path: String,
    pub language: Language,
    pub structure: Structure,
    /// All signals, ordered by location then kind
    pub signals: Vec<Signal>,
    /// Per-unit classifications, indexed by `UnitId`
    pub classifications: Vec<Classification>,
    pub file_classification: Classification,
    pub deviations: Vec<TemplateDeviation>,
    /// Total partition of the file, in `sequence_index` order
    pub chunks: Vec<Chunk>,
    /// Set when the content could not be decoded and was chunked opaquely
    pub input_error: Option<InputError>,
}

impl FileAnalysis {
    /// Flat descriptors for downstream consumers
    #[must_use]
    pub fn descriptors(&self) -> Vec<ChunkDescriptor> {
        self.chunks.iter().map(Chunk::descriptor).collect()
    }

    /// Classification of a single unit
    #[must_use]
    pub fn classification_of(&self, id: UnitId) -> Option<&Classification> {
        self.classifications.get(id.0)
    }

    #[must_use]
    pub fn stats(&self) -> ChunkingStats {
        Chunker::get_stats(&self.chunks)
    }
}

/// Statistics about chunking results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub generated_chunks: usize,
    pub total_lines: usize,
    pub total_bytes: usize,
    pub min_bytes: usize,
    pub max_bytes: usize,
}

impl ChunkingStats {
    #[must_use]
    pub const fn avg_bytes_per_chunk(&self) -> usize {
        if self.total_chunks == 0 {
            0
        } else {
            self.total_bytes / self.total_chunks
        }
    }

    /// Fold another file's statistics into these
    pub fn absorb(&mut self, other: &ChunkingStats) {
        if other.total_chunks == 0 {
            return;
        }
        self.min_bytes = if self.total_chunks == 0 {
            other.min_bytes
        } else {
            self.min_bytes.min(other.min_bytes)
        };
        self.max_bytes = self.max_bytes.max(other.max_bytes);
        self.total_chunks += other.total_chunks;
        self.generated_chunks += other.generated_chunks;
        self.total_lines += other.total_lines;
        self.total_bytes += other.total_bytes;
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Generated: {} | Lines: {} | Bytes: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.generated_chunks,
            self.total_lines,
            self.total_bytes,
            self.avg_bytes_per_chunk(),
            self.min_bytes,
            self.max_bytes
        )
    }
}
