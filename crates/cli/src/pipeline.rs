use sift_code_chunker::{Chunker, FileAnalysis, SourceFile};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of processing one file; read failures are recorded, never fatal
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileAnalysis, String>,
}

/// Chunk every file with bounded fan-out, preserving input order
pub async fn process_files(chunker: Arc<Chunker>, files: &[PathBuf]) -> Vec<FileOutcome> {
    // Reading is IO bound, chunking CPU bound; a small adaptive cap keeps both in check.
    let max_concurrent = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(2, 8);

    let mut outcomes = Vec::with_capacity(files.len());
    for batch in files.chunks(max_concurrent) {
        let mut tasks = Vec::with_capacity(batch.len());
        for path in batch {
            let chunker = Arc::clone(&chunker);
            let path = path.clone();
            tasks.push(tokio::spawn(async move { analyze_file(chunker, path).await }));
        }

        for (task, path) in tasks.into_iter().zip(batch) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(format!("{}: task panicked: {e}", path.display())),
            };
            if let Err(e) = &result {
                log::warn!("{e}");
            }
            outcomes.push(FileOutcome {
                path: path.clone(),
                result,
            });
        }
    }
    outcomes
}

async fn analyze_file(chunker: Arc<Chunker>, path: PathBuf) -> Result<FileAnalysis, String> {
    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;
    let tag = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string();
    let file = SourceFile::new(path.to_string_lossy(), tag, content);

    log::debug!("Processing file: {}", path.display());
    tokio::task::spawn_blocking(move || chunker.chunk(&file))
        .await
        .map_err(|e| format!("{}: analysis failed: {e}", path.display()))
}
