use ignore::WalkBuilder;
use sift_code_chunker::Language;
use std::path::{Path, PathBuf};

/// Finds the source files named by the command line
pub struct FileScanner {
    roots: Vec<PathBuf>,
}

impl FileScanner {
    pub fn new(roots: &[PathBuf]) -> Self {
        Self {
            roots: roots.to_vec(),
        }
    }

    /// Explicit files are taken as-is; directories are walked (.gitignore aware)
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            if root.is_file() {
                files.push(root.clone());
            } else {
                self.walk(root, &mut files);
            }
        }
        files.sort();
        files.dedup();

        log::info!("Found {} source files", files.len());
        files
    }

    fn walk(&self, root: &Path, files: &mut Vec<PathBuf>) {
        let scope_root = root.to_path_buf();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false);
        builder.filter_entry(move |entry| !Self::is_ignored_scope(entry.path(), &scope_root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    if Language::from_path(path) == Language::Unknown {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => {
                let lowered = name.to_string_lossy().to_lowercase();
                IGNORED_SCOPES.contains(&lowered.as_str())
            }
            _ => false,
        })
    }
}

/// Tooling and build output; `vendor` and `generated` stay in scope on purpose
const IGNORED_SCOPES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    "node_modules",
    "target",
    ".venv",
    "__pycache__",
];

const MAX_FILE_SIZE_BYTES: u64 = 4 * 1_048_576;
