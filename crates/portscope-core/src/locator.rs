use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::Error;
use crate::types::{PackageDescriptor, Warning, WarningKind};

/// Packages found under a source root plus anything that could not be read.
#[derive(Debug, Default)]
pub struct Located {
    pub packages: Vec<PackageDescriptor>,
    pub warnings: Vec<Warning>,
}

/// Compile exclude globs. Patterns are matched against `/`-separated paths
/// relative to the source root.
pub fn build_excludes(patterns: &[String]) -> Result<GlobSet, Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| Error::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// `path` relative to `base`, `/`-separated; `.` for `base` itself.
pub fn relative_path(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

/// Ensure the source root is a readable directory.
pub fn check_root(root: &Path) -> Result<(), Error> {
    let meta = std::fs::metadata(root).map_err(|source| Error::RootAccess {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(Error::RootNotDirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| Error::RootAccess {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Find every package root under `root`.
///
/// A directory holding `manifest_file` is a package; its subdirectories are
/// not searched, so nested packages belong to the outer one. Symlinks are
/// followed; unreadable entries and link cycles are reported and skipped.
/// Only an inaccessible `root` fails the call.
pub fn locate_packages(
    root: &Path,
    manifest_file: &str,
    ignore_markers: &[String],
    excludes: &GlobSet,
) -> Result<Located, Error> {
    check_root(root)?;

    let mut located = Located::default();
    let mut walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                if e.depth() == 0 {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk failed"));
                    return Err(Error::RootAccess { path, source });
                }
                located.warnings.push(Warning::new(
                    WarningKind::DirectoryAccess,
                    None,
                    path,
                    format!("skipping unreadable entry: {e}"),
                ));
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        let relative = relative_path(root, dir);
        if entry.depth() > 0 && (is_hidden(dir) || excludes.is_match(&relative)) {
            walker.skip_current_dir();
            continue;
        }

        let manifest_path = dir.join(manifest_file);
        if manifest_path.is_file() {
            let ignored = ignore_markers.iter().any(|m| dir.join(m).exists());
            tracing::debug!(package = %relative, ignored, "found package");
            located.packages.push(PackageDescriptor {
                root: dir.to_path_buf(),
                relative,
                manifest_path,
                ignored,
            });
            walker.skip_current_dir();
        }
    }

    Ok(located)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate_with_patterns(
        root: &Path,
        manifest_file: &str,
        ignore_markers: &[String],
        exclude_patterns: &[String],
    ) -> Result<Located, Error> {
        let excludes = build_excludes(exclude_patterns)?;
        locate_packages(root, manifest_file, ignore_markers, &excludes)
    }

    fn write_manifest(dir: &Path, name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("package.xml");
        std::fs::write(
            &path,
            format!("<package format=\"2\"><name>{name}</name></package>"),
        )
        .unwrap();
        path
    }

    fn relatives(located: &Located) -> Vec<&str> {
        located
            .packages
            .iter()
            .map(|p| p.relative.as_str())
            .collect()
    }

    #[test]
    fn test_finds_packages_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("src/zeta"), "zeta");
        write_manifest(&base.join("src/alpha"), "alpha");
        write_manifest(&base.join("src/group/mid"), "mid");
        std::fs::create_dir_all(base.join("docs")).unwrap();

        let located = locate_with_patterns(base, "package.xml", &[], &[]).unwrap();
        assert_eq!(
            relatives(&located),
            vec!["src/alpha", "src/group/mid", "src/zeta"]
        );
        assert!(located.warnings.is_empty());
    }

    #[test]
    fn test_nested_packages_are_not_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("outer"), "outer");
        write_manifest(&base.join("outer/vendor/inner"), "inner");

        let located = locate_with_patterns(base, "package.xml", &[], &[]).unwrap();
        assert_eq!(relatives(&located), vec!["outer"]);
    }

    #[test]
    fn test_root_itself_can_be_a_package() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "solo");
        let located = locate_with_patterns(tmp.path(), "package.xml", &[], &[]).unwrap();
        assert_eq!(relatives(&located), vec!["."]);
    }

    #[test]
    fn test_excludes_and_hidden_dirs_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("src/keep"), "keep");
        write_manifest(&base.join("build/generated"), "generated");
        write_manifest(&base.join(".git/weird"), "weird");

        let located =
            locate_with_patterns(base, "package.xml", &[], &["**/build".to_string()]).unwrap();
        assert_eq!(relatives(&located), vec!["src/keep"]);
    }

    #[test]
    fn test_ignore_marker_flags_package() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("skipme"), "skipme");
        std::fs::write(base.join("skipme/CATKIN_IGNORE"), "").unwrap();
        write_manifest(&base.join("used"), "used");

        let located = locate_with_patterns(
            base,
            "package.xml",
            &["CATKIN_IGNORE".to_string()],
            &[],
        )
        .unwrap();
        let flags: Vec<_> = located
            .packages
            .iter()
            .map(|p| (p.relative.as_str(), p.ignored))
            .collect();
        assert_eq!(flags, vec![("skipme", true), ("used", false)]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let err = locate_with_patterns(&missing, "package.xml", &[], &[]).unwrap_err();
        assert!(matches!(err, Error::RootAccess { .. }), "{err}");
    }

    #[test]
    fn test_file_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("package.xml");
        std::fs::write(&file, "<package/>").unwrap();
        let err = locate_with_patterns(&file, "package.xml", &[], &[]).unwrap_err();
        assert!(matches!(err, Error::RootNotDirectory(_)), "{err}");
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        assert!(build_excludes(&["src/[".to_string()]).is_err());
    }

    #[test]
    fn test_relative_path() {
        let base = Path::new("/ws/src");
        assert_eq!(relative_path(base, Path::new("/ws/src")), ".");
        assert_eq!(relative_path(base, Path::new("/ws/src/a/b")), "a/b");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_package_is_found() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("store/real"), "real");
        std::fs::create_dir_all(base.join("src")).unwrap();
        std::os::unix::fs::symlink(base.join("store/real"), base.join("src/linked")).unwrap();

        let located =
            locate_with_patterns(base, "package.xml", &[], &["store".to_string()]).unwrap();
        assert_eq!(relatives(&located), vec!["src/linked"]);
        assert!(located.warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_cycle_warns_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        write_manifest(&base.join("ok"), "ok");
        std::fs::create_dir_all(base.join("group")).unwrap();
        std::os::unix::fs::symlink(base, base.join("group/back")).unwrap();

        let located = locate_with_patterns(base, "package.xml", &[], &[]).unwrap();
        assert_eq!(relatives(&located), vec!["ok"]);
        assert_eq!(located.warnings.len(), 1);
        assert_eq!(located.warnings[0].kind, WarningKind::DirectoryAccess);
        assert!(located.warnings[0].path.ends_with("group/back"));
    }
}
