use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Source language of a scanned file.
/// Declaration order is the fixed column order used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
    Launch,
    CMake,
    Interface,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Cpp,
        Language::Python,
        Language::Launch,
        Language::CMake,
        Language::Interface,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Launch => "launch",
            Language::CMake => "cmake",
            Language::Interface => "interface",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpp" | "c++" | "c" => Ok(Language::Cpp),
            "python" | "py" => Ok(Language::Python),
            "launch" => Ok(Language::Launch),
            "cmake" => Ok(Language::CMake),
            "interface" | "msg" => Ok(Language::Interface),
            _ => Err(anyhow::anyhow!("unknown language: {s}")),
        }
    }
}

/// Code/comment/blank line split for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
}

impl LineCounts {
    pub fn total(&self) -> u64 {
        self.code + self.comment + self.blank
    }
}

/// A file that was counted and scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the package root, `/`-separated.
    pub path: String,
    pub language: Language,
    pub lines: LineCounts,
}

/// Aggregated line counts for one language within a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageVolume {
    pub files: u64,
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
}

/// Code volume of a package, partitioned by language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeVolume {
    pub by_language: BTreeMap<Language, LanguageVolume>,
}

impl CodeVolume {
    pub fn add_file(&mut self, language: Language, lines: &LineCounts) {
        let entry = self.by_language.entry(language).or_default();
        entry.files += 1;
        entry.code += lines.code;
        entry.comment += lines.comment;
        entry.blank += lines.blank;
    }

    pub fn get(&self, language: Language) -> LanguageVolume {
        self.by_language.get(&language).copied().unwrap_or_default()
    }

    pub fn code_lines(&self, language: Language) -> u64 {
        self.get(language).code
    }

    pub fn files(&self, language: Language) -> u64 {
        self.get(language).files
    }
}

/// Occurrence counts per API-pattern category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsageCounts {
    pub counts: BTreeMap<String, u64>,
}

impl ApiUsageCounts {
    pub fn get(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn add(&mut self, category: &str, n: u64) {
        if n == 0 {
            return;
        }
        *self.counts.entry(category.to_string()).or_insert(0) += n;
    }

    pub fn merge(&mut self, other: &ApiUsageCounts) {
        for (category, n) in &other.counts {
            self.add(category, *n);
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Declared package kind, as far as the manifest tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Library,
    Node,
    /// Message/service/action definitions only.
    Interface,
    Metapackage,
    Unknown,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Library => write!(f, "library"),
            PackageType::Node => write!(f, "node"),
            PackageType::Interface => write!(f, "interface"),
            PackageType::Metapackage => write!(f, "metapackage"),
            PackageType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ManifestStatus {
    Parsed,
    Degraded { reason: String },
}

/// What the package manifest declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub name: String,
    pub version: Option<String>,
    pub format: Option<u32>,
    pub package_type: PackageType,
    pub build_depends: usize,
    pub exec_depends: usize,
    pub test_depends: usize,
    /// Every declared dependency name, deduplicated.
    pub dependencies: BTreeSet<String>,
    pub status: ManifestStatus,
}

impl ManifestInfo {
    /// Placeholder for a manifest that could not be parsed. Carries no
    /// dependencies, so scoring falls back to source signals only.
    pub fn degraded(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            format: None,
            package_type: PackageType::Unknown,
            build_depends: 0,
            exec_depends: 0,
            test_depends: 0,
            dependencies: BTreeSet::new(),
            status: ManifestStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ManifestStatus::Degraded { .. })
    }
}

/// Final effort classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffortBucket {
    Small,
    Medium,
    Large,
}

impl fmt::Display for EffortBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffortBucket::Small => write!(f, "Small"),
            EffortBucket::Medium => write!(f, "Medium"),
            EffortBucket::Large => write!(f, "Large"),
        }
    }
}

/// Weighted effort score with its contributing terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortScore {
    pub dependency_penalty: f64,
    pub usage_penalty: f64,
    pub volume_score: f64,
    pub mixed_language_penalty: f64,
    pub total: f64,
    pub bucket: EffortBucket,
}

/// A directory recognised as a package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub root: PathBuf,
    /// Root relative to the scan root, `/`-separated; `.` for the scan root itself.
    pub relative: String,
    pub manifest_path: PathBuf,
    /// An ignore marker (e.g. `CATKIN_IGNORE`) sits in the package root.
    pub ignored: bool,
}

impl PackageDescriptor {
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.relative.clone())
    }

    /// A package-relative path re-based onto the scan root.
    pub fn scan_relative(&self, inside: &str) -> String {
        match (self.relative.as_str(), inside) {
            (".", _) => inside.to_string(),
            (_, ".") => self.relative.clone(),
            (outer, _) => format!("{outer}/{inside}"),
        }
    }
}

/// Everything known about one package after scanning and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub path: String,
    pub ignored: bool,
    pub manifest: ManifestInfo,
    pub files: Vec<SourceFile>,
    pub volume: CodeVolume,
    pub usage: ApiUsageCounts,
    pub score: EffortScore,
}

/// Kind of recoverable problem met during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DirectoryAccess,
    ManifestParse,
    FileRead,
    LineCount,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::DirectoryAccess => write!(f, "directory access"),
            WarningKind::ManifestParse => write!(f, "manifest parse"),
            WarningKind::FileRead => write!(f, "file read"),
            WarningKind::LineCount => write!(f, "line count"),
        }
    }
}

/// A skipped or degraded item, reported alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub package: Option<String>,
    pub path: PathBuf,
    pub message: String,
}

impl Warning {
    /// Build a warning and log it.
    pub fn new(
        kind: WarningKind,
        package: Option<&str>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        let warning = Self {
            kind,
            package: package.map(str::to_string),
            path: path.into(),
            message: message.into(),
        };
        tracing::warn!(
            kind = %warning.kind,
            package = warning.package.as_deref().unwrap_or("-"),
            path = %warning.path.display(),
            "{}",
            warning.message
        );
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(pkg) => write!(
                f,
                "[{}] {} ({}): {}",
                self.kind,
                pkg,
                self.path.display(),
                self.message
            ),
            None => write!(f, "[{}] {}: {}", self.kind, self.path.display(), self.message),
        }
    }
}
