//! Scanners for the text formats that need no real parser: CMake build
//! files, roslaunch XML, and message/service/action definitions.

use std::path::Path;

use anyhow::Result;

use crate::analyzer::LanguageScanner;
use crate::lines::{count_with_comments, hash_comment_ranges, xml_comment_ranges};
use crate::types::{Language, LineCounts};

/// `CMakeLists.txt` and `*.cmake` files.
pub struct CMakeScanner;

impl LanguageScanner for CMakeScanner {
    fn language(&self) -> Language {
        Language::CMake
    }

    fn file_extensions(&self) -> &[&str] {
        &["cmake"]
    }

    fn file_names(&self) -> &[&str] {
        &["CMakeLists.txt"]
    }

    fn count_lines(&self, _path: &Path, content: &str) -> Result<LineCounts> {
        Ok(count_with_comments(content, &hash_comment_ranges(content)))
    }
}

/// roslaunch files.
pub struct LaunchScanner;

impl LanguageScanner for LaunchScanner {
    fn language(&self) -> Language {
        Language::Launch
    }

    fn file_extensions(&self) -> &[&str] {
        &["launch"]
    }

    fn count_lines(&self, _path: &Path, content: &str) -> Result<LineCounts> {
        Ok(count_with_comments(content, &xml_comment_ranges(content)))
    }
}

/// `.msg`, `.srv` and `.action` interface definitions.
pub struct InterfaceScanner;

impl LanguageScanner for InterfaceScanner {
    fn language(&self) -> Language {
        Language::Interface
    }

    fn file_extensions(&self) -> &[&str] {
        &["msg", "srv", "action"]
    }

    fn count_lines(&self, _path: &Path, content: &str) -> Result<LineCounts> {
        Ok(count_with_comments(content, &hash_comment_ranges(content)))
    }
}

/// The scanners that live in this crate.
pub fn builtin_scanners() -> Vec<Box<dyn LanguageScanner>> {
    vec![
        Box::new(CMakeScanner),
        Box::new(LaunchScanner),
        Box::new(InterfaceScanner),
    ]
}
