//! # Sift Code Chunker
//!
//! Ingestion-time chunking and generated-code classification for source
//! indexing pipelines.
//!
//! ## Philosophy
//!
//! The chunker turns raw source files into bounded chunks that:
//! - Cover the file exactly, with no gaps or overlaps, whatever the input
//! - Follow structural boundaries (classes, functions, blocks) when it can
//! - Keep mechanically generated boilerplate (DI proxies, interceptors,
//!   factories, extension attributes) in chunks of its own, tagged with a kind
//!   and a confidence so search can down-weight or deduplicate it
//!
//! ## Architecture
//!
//! ```text
//! SourceFile (path, language tag, bytes)
//!     │
//!     ├──> Boundary Detection (brace or indent scanner, never fails)
//!     │    └─> StructuralUnit tree + long literal spans
//!     │
//!     ├──> Signal Extraction (catalog driven)
//!     │    ├─> DocMarker / NamingSuffix        (strong)
//!     │    └─> Delegation / Size / LongLine    (weak)
//!     │
//!     ├──> Classification (weighted sum per unit and per file)
//!     │
//!     ├──> Template Audit (generated units vs. their template lines)
//!     │
//!     └──> Partition
//!          ├─> Greedy sibling packing under the target size
//!          ├─> Generated units and long lines kept whole
//!          └─> Chunk[] with fingerprints and deviations
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sift_code_chunker::{Chunker, GeneratedKind, SourceFile};
//!
//! let chunker = Chunker::with_defaults().unwrap();
//!
//! let code = r#"<?php
//! /**
//!  * Proxy class for @see \Acme\Catalog\Model\Product
//!  */
//! class Proxy extends \Acme\Catalog\Model\Product
//! {
//!     public function getName()
//!     {
//!         return $this->_getSubject()->getName();
//!     }
//! }
//! "#;
//!
//! let analysis = chunker.chunk(&SourceFile::new("Product/Proxy.php", "php", code));
//! assert_eq!(analysis.chunks.len(), 1);
//! assert_eq!(analysis.chunks[0].classification.kind, GeneratedKind::Proxy);
//! for descriptor in analysis.descriptors() {
//!     println!(
//!         "Chunk at lines {}-{}: {} ({:.2})",
//!         descriptor.start_line,
//!         descriptor.end_line,
//!         descriptor.generated_kind,
//!         descriptor.confidence
//!     );
//! }
//! ```

mod audit;
mod boundary;
mod catalog;
mod chunker;
mod classifier;
mod config;
mod error;
mod fingerprint;
mod language;
mod line_index;
mod partition;
mod signals;
mod types;

pub use audit::TemplateDeviation;
pub use boundary::Structure;
pub use catalog::{
    DelegationRole, DelegationRule, DocMarkerRule, KindTemplate, SignalCatalog, SuffixRule,
    TemplateLines, WeakSignalWeights,
};
pub use chunker::{Chunker, ChunkingStats, FileAnalysis};
pub use classifier::Classifier;
pub use config::{ChunkerConfig, ClassifierConfig, SignalConfig};
pub use error::{ChunkerError, InputError, Result};
pub use fingerprint::fingerprint;
pub use language::{Language, ScanFamily};
pub use types::{
    Chunk, ChunkDescriptor, Classification, GeneratedKind, Signal, SignalKind, SourceFile, Span,
    StructuralUnit, UnitId, UnitKind,
};
