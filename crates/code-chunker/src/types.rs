use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// An immutable source file handed to the chunker by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: String,
    language_tag: String,
    content: Vec<u8>,
}

impl SourceFile {
    /// Create a new source file from already-read bytes
    pub fn new(
        path: impl Into<String>,
        language_tag: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            language_tag: language_tag.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn language_tag(&self) -> &str {
        &self.language_tag
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Number of lines; a trailing newline does not open a new line
    #[must_use]
    pub fn line_count(&self) -> usize {
        let newlines = self.content.iter().filter(|&&b| b == b'\n').count();
        match self.content.last() {
            None => 0,
            Some(b'\n') => newlines,
            Some(_) => newlines + 1,
        }
    }
}

/// Contiguous byte range `[start, end)` with its 1-based inclusive line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether `other` lies entirely inside this span
    #[must_use]
    pub const fn contains(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Preorder index of a unit inside its file's tree (root = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

/// Kind of a structural unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    File,
    Class,
    Function,
    Block,
    Statement,
}

impl UnitKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Function => "function",
            Self::Block => "block",
            Self::Statement => "statement",
        }
    }
}

/// Node of the lightweight boundary tree.
///
/// A parent's span contains its children's spans; siblings are disjoint and
/// ordered by start offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub span: Span,
    /// Declared name for classes and functions
    pub name: Option<String>,
    /// Long line that must never be divided
    pub atomic: bool,
    pub children: Vec<StructuralUnit>,
}

impl StructuralUnit {
    /// All units in preorder, root first
    #[must_use]
    pub fn descendants(&self) -> Vec<&StructuralUnit> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(unit) = stack.pop() {
            out.push(unit);
            stack.extend(unit.children.iter().rev());
        }
        out
    }

    /// Number of units in this subtree
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(StructuralUnit::count).sum::<usize>()
    }

    #[must_use]
    pub fn find(&self, id: UnitId) -> Option<&StructuralUnit> {
        if self.id == id {
            return Some(self);
        }
        // Preorder ids: the owning child is the last one starting at or before `id`.
        let idx = self
            .children
            .partition_point(|child| child.id <= id)
            .checked_sub(1)?;
        self.children[idx].find(id)
    }

    /// Whether any strict descendant is an atomic long line
    #[must_use]
    pub fn has_atomic_descendant(&self) -> bool {
        self.children
            .iter()
            .any(|child| child.atomic || child.has_atomic_descendant())
    }

    /// Id range `[self.id, end)` covered by this subtree
    #[must_use]
    pub fn id_range(&self) -> Range<usize> {
        self.id.0..self.id.0 + self.count()
    }
}

/// Classification label for mechanically produced boilerplate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedKind {
    #[default]
    None,
    Proxy,
    Interceptor,
    Factory,
    Extension,
    Other,
}

impl GeneratedKind {
    #[must_use]
    pub const fn is_generated(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Proxy => "proxy",
            Self::Interceptor => "interceptor",
            Self::Factory => "factory",
            Self::Extension => "extension",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for GeneratedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed classification observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum SignalKind {
    DocMarker(GeneratedKind),
    DelegationIdiom,
    NamingSuffix(GeneratedKind),
    SizeOutlier,
    LongLineOutlier,
}

impl SignalKind {
    /// Strong signals name a kind and may justify a positive classification
    #[must_use]
    pub const fn is_strong(self) -> bool {
        matches!(self, Self::DocMarker(_) | Self::NamingSuffix(_))
    }

    /// The kind a strong signal votes for
    #[must_use]
    pub const fn named_kind(self) -> Option<GeneratedKind> {
        match self {
            Self::DocMarker(kind) | Self::NamingSuffix(kind) => Some(kind),
            _ => None,
        }
    }

    /// Stable ordering among signals sharing a location
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::DocMarker(_) => 0,
            Self::NamingSuffix(_) => 1,
            Self::DelegationIdiom => 2,
            Self::SizeOutlier => 3,
            Self::LongLineOutlier => 4,
        }
    }
}

/// Weighted, typed observation about one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub location: Span,
    pub weight: f64,
    /// Unit the observation is about
    pub subject: UnitId,
}

/// Classification of a unit, a chunk or a whole file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub kind: GeneratedKind,
    /// Normalized weighted sum in `[0, 1]`
    pub confidence: f64,
    pub supporting_signals: Vec<Signal>,
}

impl Classification {
    /// Hand-written, no evidence
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.kind.is_generated()
    }
}

/// Contiguous slice of a source file emitted as the indexing unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub span: Span,
    pub classification: Classification,
    pub sequence_index: usize,
    /// Hash of the normalized lines, for deduplication
    pub fingerprint: u64,
    /// Lines of a generated unit that do not fit its generator's template
    #[serde(default)]
    pub deviations: Vec<usize>,
}

impl Chunk {
    /// Borrow this chunk's bytes out of the file content
    #[must_use]
    pub fn slice<'a>(&self, content: &'a [u8]) -> &'a [u8] {
        &content[self.span.range()]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.span.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.span.end_line.saturating_sub(self.span.start_line) + 1
    }

    /// Flat descriptor handed downstream
    #[must_use]
    pub fn descriptor(&self) -> ChunkDescriptor {
        ChunkDescriptor {
            start_offset: self.span.start,
            end_offset: self.span.end,
            start_line: self.span.start_line,
            end_line: self.span.end_line,
            generated_kind: self.classification.kind,
            confidence: self.classification.confidence,
            sequence_index: self.sequence_index,
            fingerprint: self.fingerprint,
            deviations: self.deviations.clone(),
        }
    }
}

/// Output record for one chunk; the caller slices text from its own content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub generated_kind: GeneratedKind,
    pub confidence: f64,
    pub sequence_index: usize,
    pub fingerprint: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deviations: Vec<usize>,
}
