use crate::poll::PollPolicy;
use crate::transform::{Insertion, Placement, Replacement, RuleSet};
use crate::walk::CandidateFilter;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Top-level run configuration (`extract-interface.toml`).
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub classes: ClassConfig,
    #[serde(default)]
    pub interface: InterfaceConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.walk.extension.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "walk.extension",
            });
        }
        if self.walk.extension.starts_with('.') {
            issues.push(ValidationIssue::InvalidValue {
                field: "walk.extension",
                message: "extension must not start with a dot".to_string(),
            });
        }

        if let Some(base) = &self.interface.base {
            if base.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "interface.base",
                });
            }
        }

        if let Some(namespace) = &self.interface.namespace {
            if namespace.from.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "interface.namespace.from",
                });
            }
        }

        if let Some(region) = &self.interface.region {
            if region.text.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "interface.region.text",
                });
            }
            if region.anchor.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "interface.region.anchor",
                });
            }
        }

        if let Some(program) = &self.host.program {
            if program.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "host.program",
                });
            }
        }
        if self.host.poll_interval_ms == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "host.poll_interval_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.host.poll_interval_ms > self.host.timeout_ms {
            issues.push(ValidationIssue::InvalidValue {
                field: "host.poll_interval_ms",
                message: format!(
                    "{} exceeds host.timeout_ms ({})",
                    self.host.poll_interval_ms, self.host.timeout_ms
                ),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter {
            extension: self.walk.extension.clone(),
            exclude_files: self.walk.exclude_files.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(self.host.poll_interval_ms, self.host.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WalkConfig {
    /// Top-level folder names skipped entirely
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    /// File names skipped wherever they appear
    #[serde(default = "default_exclude_files")]
    pub exclude_files: Vec<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            exclude_folders: default_exclude_folders(),
            exclude_files: default_exclude_files(),
            extension: default_extension(),
        }
    }
}

fn default_exclude_folders() -> Vec<String> {
    ["bin", "obj", "Interfaces"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exclude_files() -> Vec<String> {
    vec!["AssemblyInfo.cs".to_string()]
}

fn default_extension() -> String {
    "cs".to_string()
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClassConfig {
    /// Classes never extracted
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub ignore_file: Option<PathBuf>,
    /// Classes whose interface does not get the shared base interface
    #[serde(default)]
    pub base_exempt: Vec<String>,
    #[serde(default)]
    pub base_exempt_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    /// Interface every generated interface inherits from
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub namespace: Option<NamespaceRewrite>,
    #[serde(default)]
    pub region: Option<RegionInsert>,
    /// Lines removed when their trimmed text matches exactly
    #[serde(default)]
    pub delete_lines: Vec<String>,
    #[serde(default)]
    pub delete_lines_file: Option<PathBuf>,
    /// Lines removed when their trimmed text starts with one of these
    #[serde(default)]
    pub delete_prefixes: Vec<String>,
    #[serde(default)]
    pub delete_prefixes_file: Option<PathBuf>,
    /// Directory, relative to the project root, that interfaces move into
    #[serde(default)]
    pub relocate_to: Option<PathBuf>,
}

impl InterfaceConfig {
    /// Deletions and the namespace rewrite, which do not depend on the
    /// class being processed.
    pub fn line_rules(&self) -> RuleSet {
        RuleSet {
            delete_lines: self.delete_lines.clone(),
            delete_prefixes: self.delete_prefixes.clone(),
            replacements: self
                .namespace
                .iter()
                .map(|ns| Replacement {
                    from: ns.from.clone(),
                    to: ns.to.clone(),
                })
                .collect(),
            insertions: Vec::new(),
        }
    }

    /// The region block as an insertion whose newlines match `line_ending`.
    pub fn region_insertion(&self, line_ending: &str) -> Option<Insertion> {
        self.region.as_ref().map(|region| Insertion {
            anchor: region.anchor.clone(),
            text: normalize_newlines(&region.text, line_ending),
            placement: region.placement,
        })
    }
}

fn normalize_newlines(text: &str, line_ending: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', line_ending)
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NamespaceRewrite {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegionInsert {
    #[serde(default = "default_region_anchor")]
    pub anchor: String,
    pub text: String,
    #[serde(default)]
    pub placement: Placement,
}

fn default_region_anchor() -> String {
    "    {".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing or empty required field '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
        }
    }
}
