//! Data-driven fingerprint table for generated code.
//!
//! Every fingerprint the extractor knows about lives here as data: adding a
//! new framework is a catalog edit (or a TOML file), never a code change.

use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::GeneratedKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Signal template table. Sections missing from a TOML document are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCatalog {
    /// Phrases found in the comment block preceding a class
    #[serde(default)]
    pub doc_markers: Vec<DocMarkerRule>,

    /// Declared-name suffixes
    #[serde(default)]
    pub naming_suffixes: Vec<SuffixRule>,

    /// Line shapes of forwarding method bodies
    #[serde(default)]
    pub delegation_idioms: Vec<DelegationRule>,

    /// Weights of the kind-agnostic signals
    #[serde(default)]
    pub weights: WeakSignalWeights,

    /// Lines a generator may emit, per kind
    #[serde(default)]
    pub template_lines: TemplateLines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMarkerRule {
    /// Literal phrase, matched case-sensitively on word boundaries
    pub phrase: String,
    pub kind: GeneratedKind,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRule {
    pub suffix: String,
    pub kind: GeneratedKind,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationRole {
    /// Call forwarded to a held collaborator
    #[default]
    Forward,
    /// Lookup deciding whether an override replaces the collaborator
    OverrideLookup,
    /// Neutral line allowed in a forwarding body
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRule {
    /// Regex applied to a trimmed statement line; a `target` capture group
    /// names the collaborator
    pub pattern: String,
    #[serde(default)]
    pub role: DelegationRole,
    /// Collaborator label when the pattern has no `target` group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeakSignalWeights {
    /// Total delegation weight of a file whose functions all delegate
    pub delegation: f64,
    pub size_outlier: f64,
    pub long_line: f64,
}

impl Default for WeakSignalWeights {
    fn default() -> Self {
        Self {
            delegation: 0.3,
            size_outlier: 0.1,
            long_line: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateLines {
    /// Languages the templates describe; empty means every language
    #[serde(default)]
    pub languages: Vec<String>,
    /// Allowed in every generated kind
    #[serde(default)]
    pub common: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<KindTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindTemplate {
    pub kind: GeneratedKind,
    pub patterns: Vec<String>,
}

impl Default for SignalCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SignalCatalog {
    /// A catalog with no rules at all
    pub fn empty() -> Self {
        Self {
            doc_markers: Vec::new(),
            naming_suffixes: Vec::new(),
            delegation_idioms: Vec::new(),
            weights: WeakSignalWeights::default(),
            template_lines: TemplateLines::default(),
        }
    }

    /// Shipped fingerprints: Magento 2 code generation and Dagger factories
    pub fn builtin() -> Self {
        use GeneratedKind::{Extension, Factory, Interceptor, Proxy};

        let doc_markers = [
            ("Proxy class for", Proxy, 0.6),
            ("Interceptor class for", Interceptor, 0.6),
            ("Factory class for", Factory, 0.6),
            ("Extension class for", Extension, 0.6),
            ("ExtensionInterface class for", Extension, 0.6),
            ("dagger.internal.codegen.ComponentProcessor", Factory, 0.6),
        ]
        .into_iter()
        .map(|(phrase, kind, weight)| DocMarkerRule {
            phrase: phrase.to_string(),
            kind,
            weight,
        })
        .collect();

        let naming_suffixes = [
            ("Proxy", Proxy, 0.3),
            ("Interceptor", Interceptor, 0.3),
            ("Factory", Factory, 0.3),
            ("_Factory", Factory, 0.3),
            ("Extension", Extension, 0.3),
            ("ExtensionInterface", Extension, 0.3),
        ]
        .into_iter()
        .map(|(suffix, kind, weight)| SuffixRule {
            suffix: suffix.to_string(),
            kind,
            weight,
        })
        .collect();

        let rule = |pattern: &str, role: DelegationRole, collaborator: Option<&str>| DelegationRule {
            pattern: pattern.to_string(),
            role,
            collaborator: collaborator.map(str::to_string),
        };
        let delegation_idioms = vec![
            rule(
                r"\$this->pluginList->getNext\(",
                DelegationRole::OverrideLookup,
                None,
            ),
            rule(r"^\$this->___init\(\);$", DelegationRole::Passthrough, None),
            rule(r"\bparent::\w+\(", DelegationRole::Forward, Some("parent")),
            rule(
                r"\$this->_getSubject\(\)->\w+\(",
                DelegationRole::Forward,
                Some("subject"),
            ),
            rule(
                r"^return \$this->_objectManager->(?:create|get)\(",
                DelegationRole::Forward,
                Some("objectManager"),
            ),
            rule(
                r"^(?:return )?\$this->(?:_get|setData)\(",
                DelegationRole::Forward,
                Some("data"),
            ),
            rule(r"^return \$this;$", DelegationRole::Passthrough, None),
            rule(
                r"^(?:return\s+)?\$this->(?P<target>[A-Za-z_]\w*)->\w+\(",
                DelegationRole::Forward,
                None,
            ),
            rule(
                r"^(?:return\s+)?(?:await\s+)?(?:this|self)\.(?P<target>[A-Za-z_$][\w$]*)\.[A-Za-z_$][\w$]*\(",
                DelegationRole::Forward,
                None,
            ),
        ];

        let common = [
            r"^\s*$",
            r"^\s*<\?php\s*$",
            r"^\s*namespace\s+",
            r"^\s*use\s+\\?[A-Z]",
            r"^\s*(abstract\s+)?class\s+",
            r"^\s*interface\s+",
            r"^\s*\{",
            r"^\s*\}",
            r"^\s*\*",
            r"^\s*/\*",
            r"^\s*\*/",
            r"^\s*//",
            r"^\s*#",
            r"^\s*@",
            r"^\s*public\s+function\s+",
            r"^\s*protected\s+function\s+",
            r"^\s*private\s+function\s+",
            r"^\s*protected\s+\$",
            r"^\s*return\s+",
            r"^\s*return;",
            r"^\s*\)",
            r"^\s*\?\s+\$this->",
            r"^\s*:\s+\$this->",
            r"^\s*\$this->",
            r"^\s*implements\s+",
            r"^\s*extends\s+",
        ];

        let kinds = vec![
            KindTemplate {
                kind: Interceptor,
                patterns: strings(&[
                    r"\$this->pluginList->getNext\(",
                    r"\$this->___callPlugins\(",
                    r"\$this->___init\(\)",
                    r"parent::",
                    r"use\s+\\?Magento\\Framework\\Interception\\Interceptor",
                    r"InterceptorInterface",
                    r"func_get_args\(\)",
                ]),
            },
            KindTemplate {
                kind: Factory,
                patterns: strings(&[
                    r"\$this->_objectManager",
                    r"\$this->_instanceName",
                    r"ObjectManagerInterface",
                ]),
            },
            KindTemplate {
                kind: Proxy,
                patterns: strings(&[
                    r"\$this->_getSubject\(\)->",
                    r"\$this->_objectManager",
                    r"ObjectManager::getInstance\(\)",
                    r"\$this->_subject",
                    r"\$this->_isShared",
                    r"\$this->_instanceName",
                    r"__sleep",
                    r"__wakeup",
                    r"__clone",
                    r"__debugInfo",
                    r"_resetState",
                    r"_getSubject",
                    r"NoninterceptableInterface",
                    r"ObjectManagerInterface",
                ]),
            },
            KindTemplate {
                kind: Extension,
                patterns: strings(&[
                    r"\$this->_get\(",
                    r"\$this->setData\(",
                    r"return\s+\$this;",
                    r"AbstractSimpleObject",
                    r"ExtensionInterface",
                    r"^\s*public\s+function\s+(get|set)\w+\(",
                    r"ExtensionAttributesInterface",
                ]),
            },
        ];

        Self {
            doc_markers,
            naming_suffixes,
            delegation_idioms,
            weights: WeakSignalWeights::default(),
            template_lines: TemplateLines {
                languages: vec!["php".to_string()],
                common: strings(&common),
                kinds,
            },
        }
    }

    /// Parse a TOML catalog
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML catalog file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML, e.g. as a starting point for a custom catalog
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ChunkerError::invalid_config(e.to_string()))
    }

    /// Append every rule of `other`; weights are taken from `other`
    pub fn extend(&mut self, other: SignalCatalog) {
        self.doc_markers.extend(other.doc_markers);
        self.naming_suffixes.extend(other.naming_suffixes);
        self.delegation_idioms.extend(other.delegation_idioms);
        self.template_lines.languages.extend(other.template_lines.languages);
        self.template_lines.common.extend(other.template_lines.common);
        self.template_lines.kinds.extend(other.template_lines.kinds);
        self.weights = other.weights;
    }

    /// Validate the table and compile its patterns
    pub(crate) fn compile(&self) -> Result<CompiledCatalog> {
        let mut doc_markers = Vec::with_capacity(self.doc_markers.len());
        for rule in &self.doc_markers {
            check_rule("doc marker", &rule.phrase, rule.kind, rule.weight)?;
            doc_markers.push(CompiledMarker {
                regex: compile(&phrase_pattern(&rule.phrase))?,
                kind: rule.kind,
                weight: rule.weight,
            });
        }

        for rule in &self.naming_suffixes {
            check_rule("naming suffix", &rule.suffix, rule.kind, rule.weight)?;
        }
        let mut naming_suffixes = self.naming_suffixes.clone();
        // Longest suffix first, so only the most specific rule fires.
        naming_suffixes.sort_by(|a, b| b.suffix.len().cmp(&a.suffix.len()));

        let mut delegation = Vec::with_capacity(self.delegation_idioms.len());
        for (index, rule) in self.delegation_idioms.iter().enumerate() {
            let regex = compile(&rule.pattern)?;
            let has_target = regex.capture_names().flatten().any(|name| name == "target");
            delegation.push(CompiledDelegation {
                regex,
                role: rule.role,
                collaborator: rule
                    .collaborator
                    .clone()
                    .unwrap_or_else(|| format!("#{index}")),
                has_target,
            });
        }

        let weights = &self.weights;
        for (name, weight) in [
            ("delegation", weights.delegation),
            ("size_outlier", weights.size_outlier),
            ("long_line", weights.long_line),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ChunkerError::invalid_config(format!(
                    "weights.{name} ({weight}) must be a non-negative number"
                )));
            }
        }

        let common = self
            .template_lines
            .common
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;
        let mut templates: HashMap<GeneratedKind, Vec<Regex>> = HashMap::new();
        for template in &self.template_lines.kinds {
            if !template.kind.is_generated() {
                return Err(ChunkerError::invalid_config(
                    "template_lines.kinds cannot target kind `none`",
                ));
            }
            let entry = templates.entry(template.kind).or_default();
            for pattern in &template.patterns {
                entry.push(compile(pattern)?);
            }
        }

        Ok(CompiledCatalog {
            doc_markers,
            naming_suffixes,
            delegation,
            weights: self.weights.clone(),
            template_languages: self
                .template_lines
                .languages
                .iter()
                .map(|tag| Language::from_tag(tag, ""))
                .collect(),
            template_common: common,
            templates,
        })
    }
}

fn strings(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| (*p).to_string()).collect()
}

fn check_rule(what: &str, text: &str, kind: GeneratedKind, weight: f64) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ChunkerError::invalid_config(format!("empty {what}")));
    }
    if !kind.is_generated() {
        return Err(ChunkerError::invalid_config(format!(
            "{what} `{text}` cannot name kind `none`"
        )));
    }
    if !weight.is_finite() || weight < 0.0 {
        return Err(ChunkerError::invalid_config(format!(
            "{what} `{text}` has invalid weight {weight}"
        )));
    }
    Ok(())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ChunkerError::invalid_pattern(pattern, e))
}

/// Literal phrase bounded by word boundaries where the phrase edges are word chars
fn phrase_pattern(phrase: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if phrase.starts_with(is_word) { r"\b" } else { "" };
    let tail = if phrase.ends_with(is_word) { r"\b" } else { "" };
    format!("{lead}{}{tail}", regex::escape(phrase))
}

#[derive(Debug)]
pub(crate) struct CompiledMarker {
    pub regex: Regex,
    pub kind: GeneratedKind,
    pub weight: f64,
}

#[derive(Debug)]
pub(crate) struct CompiledDelegation {
    pub regex: Regex,
    pub role: DelegationRole,
    pub collaborator: String,
    pub has_target: bool,
}

impl CompiledDelegation {
    /// Collaborator named by a matching line
    pub(crate) fn collaborator_of(&self, line: &str) -> Option<String> {
        if self.has_target {
            let caps = self.regex.captures(line)?;
            return caps.name("target").map(|m| m.as_str().to_string());
        }
        self.regex
            .is_match(line)
            .then(|| self.collaborator.clone())
    }
}

/// Catalog ready for matching; shared read-only across files
#[derive(Debug)]
pub(crate) struct CompiledCatalog {
    pub doc_markers: Vec<CompiledMarker>,
    /// Sorted longest suffix first
    pub naming_suffixes: Vec<SuffixRule>,
    pub delegation: Vec<CompiledDelegation>,
    pub weights: WeakSignalWeights,
    pub template_languages: Vec<Language>,
    pub template_common: Vec<Regex>,
    pub templates: HashMap<GeneratedKind, Vec<Regex>>,
}

impl CompiledCatalog {
    /// The most specific suffix rule matching `name`
    pub(crate) fn suffix_for(&self, name: &str) -> Option<&SuffixRule> {
        self.naming_suffixes
            .iter()
            .find(|rule| name.ends_with(&rule.suffix))
    }

    /// Template lines to audit a unit of `kind` against, if any apply
    pub(crate) fn templates_for(&self, language: Language, kind: GeneratedKind) -> Option<&[Regex]> {
        if !self.template_languages.is_empty() && !self.template_languages.contains(&language) {
            return None;
        }
        self.templates.get(&kind).map(Vec::as_slice)
    }
}
