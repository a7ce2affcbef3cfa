use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::UnitKind;
use regex::Regex;

/// Words that look like a return type or a method name but open control flow
const CONTROL_WORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "try", "return",
    "new", "throw", "goto", "sizeof", "typeof", "await", "yield", "delete", "echo", "print",
    "using", "lock", "synchronized", "elif", "with", "match", "when", "function",
];

const MODIFIERS: &str = r"(?:(?:public|private|protected|internal|static|final|abstract|sealed|partial|async|export|default|declare|override|open|data|inline|value|suspend|operator|const|unsafe|readonly|mutating|extern(?:\s+[A-Za-z]+)?|pub(?:\([^)]*\))?|@\w+)\s+)*";

/// Which languages a declaration pattern applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Braces,
    Rust,
    Go,
    CLike,
    Script,
    Python,
    Ruby,
}

impl Scope {
    fn applies(self, language: Language) -> bool {
        match self {
            Scope::Braces => !matches!(language, Language::Python | Language::Ruby),
            Scope::Rust => language == Language::Rust,
            Scope::Go => language == Language::Go,
            Scope::CLike => matches!(
                language,
                Language::Java | Language::C | Language::Cpp | Language::CSharp
            ),
            Scope::Script => matches!(language, Language::JavaScript | Language::TypeScript),
            Scope::Python => language == Language::Python,
            Scope::Ruby => language == Language::Ruby,
        }
    }
}

#[derive(Debug)]
struct DeclPattern {
    regex: Regex,
    kind: UnitKind,
    scope: Scope,
    /// Reject matches whose first word or name is a control keyword
    guarded: bool,
}

/// A declaration recognized at the start of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub kind: UnitKind,
    pub name: Option<String>,
}

/// Line-start declaration patterns for every supported language.
///
/// Compiled once per [`crate::Chunker`]; matching is read-only.
#[derive(Debug)]
pub(crate) struct Grammar {
    patterns: Vec<DeclPattern>,
}

impl Grammar {
    pub(crate) fn new() -> Result<Self> {
        let rules: Vec<(String, UnitKind, Scope, bool)> = vec![
            (
                format!(
                    r"^\s*{MODIFIERS}(?:enum\s+)?(?:class|interface|trait|enum|struct|record|object|protocol|extension|union|mod)\s+(?P<name>[A-Za-z_$][\w$]*)"
                ),
                UnitKind::Class,
                Scope::Braces,
                false,
            ),
            (
                r"^\s*(?:unsafe\s+)?impl(?:\s*<[^>]*>)?\s+(?:[\w:<>, ]+\s+for\s+)?(?P<name>[A-Za-z_]\w*)"
                    .to_string(),
                UnitKind::Class,
                Scope::Rust,
                false,
            ),
            (
                r"^\s*type\s+(?P<name>[A-Za-z_]\w*)\s+(?:struct|interface)\b".to_string(),
                UnitKind::Class,
                Scope::Go,
                false,
            ),
            (
                format!(
                    r"^\s*{MODIFIERS}(?:function|fn|func|fun)\b\s*\*?\s*&?\s*(?:\([^)]*\)\s*)?(?:<[^>]*>\s*)?(?P<name>[A-Za-z_$][\w$]*)"
                ),
                UnitKind::Function,
                Scope::Braces,
                false,
            ),
            (
                r"^\s*(?:[\w:<>\[\],.?~]+[*&]*\s+)+[*&]*(?P<name>[A-Za-z_~][\w~]*)\s*\(".to_string(),
                UnitKind::Function,
                Scope::CLike,
                true,
            ),
            (
                r"^\s*(?:(?:static|async|get|set|public|private|protected|readonly|override|abstract)\s+)*\*?(?P<name>[A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{;=]+?)?\s*\{\s*$"
                    .to_string(),
                UnitKind::Function,
                Scope::Script,
                true,
            ),
            (
                r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::\s*[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)"
                    .to_string(),
                UnitKind::Function,
                Scope::Script,
                false,
            ),
            (
                r"^\s*class\s+(?P<name>[A-Za-z_]\w*)".to_string(),
                UnitKind::Class,
                Scope::Python,
                false,
            ),
            (
                r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)".to_string(),
                UnitKind::Function,
                Scope::Python,
                false,
            ),
            (
                r"^\s*(?:class|module)\s+(?P<name>[A-Z][\w:]*)".to_string(),
                UnitKind::Class,
                Scope::Ruby,
                false,
            ),
            (
                r"^\s*def\s+(?:self\.)?(?P<name>[A-Za-z_][\w]*[?!=]?)".to_string(),
                UnitKind::Function,
                Scope::Ruby,
                false,
            ),
        ];

        let patterns = rules
            .into_iter()
            .map(|(pattern, kind, scope, guarded)| {
                let regex = Regex::new(&pattern)
                    .map_err(|e| ChunkerError::invalid_pattern(pattern.clone(), e))?;
                Ok(DeclPattern {
                    regex,
                    kind,
                    scope,
                    guarded,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Recognize a declaration on `line` (without its terminator)
    pub(crate) fn match_line(&self, language: Language, line: &str) -> Option<Declaration> {
        for pattern in self.patterns.iter().filter(|p| p.scope.applies(language)) {
            let Some(caps) = pattern.regex.captures(line) else {
                continue;
            };
            let name = caps.name("name").map(|m| m.as_str());
            if pattern.guarded && is_control_flow(line, name) {
                continue;
            }
            return Some(Declaration {
                kind: pattern.kind,
                name: name.map(str::to_string),
            });
        }
        None
    }
}

fn is_control_flow(line: &str, name: Option<&str>) -> bool {
    let first = line
        .trim_start()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();
    CONTROL_WORDS.contains(&first) || name.is_some_and(|n| CONTROL_WORDS.contains(&n))
}
