use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Php,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Unknown,
}

/// How a language expresses nesting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFamily {
    /// Nesting through `{ ... }`
    Braces,
    /// Nesting through indentation
    Indentation,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "php" | "phtml" | "inc" => Language::Php,
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Resolve a caller-supplied language tag.
    ///
    /// Accepts language names (`"php"`, `"python"`) as well as bare
    /// extensions (`"py"`, `"kt"`); falls back to the path extension.
    pub fn from_tag(tag: &str, path: &str) -> Self {
        let normalized = tag.trim().trim_start_matches('.').to_lowercase();
        let by_name = match normalized.as_str() {
            "php" => Language::Php,
            "rust" => Language::Rust,
            "python" => Language::Python,
            "javascript" => Language::JavaScript,
            "typescript" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" => Language::Cpp,
            "csharp" | "c#" => Language::CSharp,
            "ruby" => Language::Ruby,
            "swift" => Language::Swift,
            "kotlin" => Language::Kotlin,
            other => Self::from_extension(other),
        };
        if by_name != Language::Unknown {
            return by_name;
        }
        Self::from_path(path)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Php => "php",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }

    /// Which boundary scanner handles this language
    pub fn family(self) -> ScanFamily {
        match self {
            Language::Python | Language::Ruby => ScanFamily::Indentation,
            _ => ScanFamily::Braces,
        }
    }

    /// Markers that start a comment running to end of line
    pub fn line_comment_markers(self) -> &'static [&'static str] {
        match self {
            Language::Php => &["//", "#"],
            Language::Python | Language::Ruby => &["#"],
            _ => &["//"],
        }
    }

    /// Whether `/* ... */` comments exist
    pub fn has_block_comments(self) -> bool {
        !matches!(self, Language::Python | Language::Ruby)
    }

    /// Quote characters that open string literals
    pub fn quotes(self) -> &'static [u8] {
        match self {
            Language::JavaScript | Language::TypeScript | Language::Go | Language::Unknown => {
                b"\"'`"
            }
            _ => b"\"'",
        }
    }

    /// Whether a literal opened by `quote` may continue past a newline
    pub fn quote_spans_lines(self, quote: u8) -> bool {
        match self {
            Language::Php | Language::Ruby => true,
            Language::Rust => quote == b'"',
            Language::JavaScript | Language::TypeScript | Language::Go => quote == b'`',
            _ => false,
        }
    }

    /// Whether `'` may also introduce a lifetime or label rather than a literal
    pub fn has_lifetimes(self) -> bool {
        matches!(self, Language::Rust)
    }

    /// Whether `"""`/`'''` open multi-line literals
    pub fn has_triple_quotes(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Check whether a trimmed line is a comment line
    pub fn is_comment_line(self, trimmed: &str) -> bool {
        if self.has_block_comments()
            && (trimmed.starts_with("/*") || trimmed.starts_with('*'))
        {
            return true;
        }
        self.line_comment_markers()
            .iter()
            .any(|marker| trimmed.starts_with(marker))
            && !self.is_attribute_line(trimmed)
    }

    /// Check whether a trimmed line is an attribute/annotation/decorator line
    pub fn is_attribute_line(self, trimmed: &str) -> bool {
        match self {
            Language::Rust => trimmed.starts_with("#["),
            Language::Php => trimmed.starts_with("#[") || trimmed.starts_with('@'),
            Language::CSharp => trimmed.starts_with('['),
            _ => trimmed.starts_with('@'),
        }
    }
}
