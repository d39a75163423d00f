use std::path::Path;

use globset::GlobSet;
use walkdir::WalkDir;

use crate::analyzer::{scanner_for, LanguageScanner};
use crate::catalog::PatternCatalog;
use crate::error::ScanError;
use crate::locator::{is_hidden, relative_path};
use crate::types::{
    ApiUsageCounts, CodeVolume, LineCounts, PackageDescriptor, SourceFile, Warning, WarningKind,
};

/// Everything the source scan of one package produced.
#[derive(Debug, Default)]
pub struct PackageScan {
    pub files: Vec<SourceFile>,
    pub volume: CodeVolume,
    pub usage: ApiUsageCounts,
    pub warnings: Vec<Warning>,
}

impl ScanError {
    fn warning_kind(&self) -> WarningKind {
        match self {
            ScanError::Walk(_) => WarningKind::DirectoryAccess,
            ScanError::Read(_) => WarningKind::FileRead,
            ScanError::Count(_) => WarningKind::LineCount,
        }
    }
}

fn scan_file(
    scanner: &dyn LanguageScanner,
    catalog: &PatternCatalog,
    path: &Path,
) -> Result<(LineCounts, ApiUsageCounts), ScanError> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let lines = scanner
        .count_lines(path, &content)
        .map_err(ScanError::Count)?;
    let usage = catalog.scan(scanner.language(), &content);
    Ok((lines, usage))
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Count and pattern-match every recognised source file of a package.
///
/// Symlinks are followed. Files that cannot be read or counted are left out
/// of every total and reported as warnings, as are link cycles and
/// unreadable directories. Exclude globs match paths relative to the scan
/// root. Only an unreadable package root fails the scan.
pub fn scan_package(
    package: &str,
    descriptor: &PackageDescriptor,
    scanners: &[Box<dyn LanguageScanner>],
    catalog: &PatternCatalog,
    excludes: &GlobSet,
) -> Result<PackageScan, ScanError> {
    let root = descriptor.root.as_path();
    let skipped = |path: &Path| {
        is_hidden(path) || excludes.is_match(descriptor.scan_relative(&relative_path(root, path)))
    };

    let mut scan = PackageScan::default();
    let mut walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(ScanError::Walk(e)),
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                if skipped(path.as_path()) {
                    continue;
                }
                let dangling = e.loop_ancestor().is_none() && is_symlink(&path);
                // A dangling link only matters when it names a source file.
                if dangling && scanner_for(scanners, &path).is_none() {
                    continue;
                }
                let err = if dangling {
                    ScanError::Read(
                        e.into_io_error()
                            .unwrap_or_else(|| std::io::ErrorKind::NotFound.into()),
                    )
                } else {
                    ScanError::Walk(e)
                };
                scan.warnings.push(Warning::new(
                    err.warning_kind(),
                    Some(package),
                    path,
                    err.to_string(),
                ));
                continue;
            }
        };

        let path = entry.path();
        if entry.depth() > 0 && skipped(path) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(scanner) = scanner_for(scanners, path) else {
            continue;
        };

        match scan_file(scanner, catalog, path) {
            Ok((lines, usage)) => {
                scan.volume.add_file(scanner.language(), &lines);
                scan.usage.merge(&usage);
                scan.files.push(SourceFile {
                    path: relative_path(root, path),
                    language: scanner.language(),
                    lines,
                });
            }
            Err(err) => {
                scan.warnings.push(Warning::new(
                    err.warning_kind(),
                    Some(package),
                    path,
                    err.to_string(),
                ));
            }
        }
    }

    Ok(scan)
}
