use std::path::Path;

use anyhow::Result;

use crate::types::{Language, LineCounts};

/// Trait that each language line counter must implement.
pub trait LanguageScanner: Send + Sync {
    /// Language tag recorded for files this scanner claims.
    fn language(&self) -> Language;

    /// File extensions this scanner handles (e.g., &["py"]).
    fn file_extensions(&self) -> &[&str];

    /// Exact file names this scanner handles regardless of extension.
    fn file_names(&self) -> &[&str] {
        &[]
    }

    /// Split a file's lines into code, comment and blank.
    fn count_lines(&self, path: &Path, content: &str) -> Result<LineCounts>;

    /// Whether this scanner claims the file at `path`.
    fn handles(&self, path: &Path) -> bool {
        let name_match = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.file_names().contains(&name));
        name_match
            || path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.file_extensions().contains(&ext))
    }
}

/// Pick the first scanner that claims `path`.
pub fn scanner_for<'a>(
    scanners: &'a [Box<dyn LanguageScanner>],
    path: &Path,
) -> Option<&'a dyn LanguageScanner> {
    scanners
        .iter()
        .find(|s| s.handles(path))
        .map(|s| s.as_ref())
}
