use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use portscope_core::analyzer::LanguageScanner;
use portscope_core::lines::count_with_comments;
use portscope_core::types::{self, LineCounts};

/// C and C++ line counter using tree-sitter.
pub struct CppScanner {
    language: Language,
    comment_query: Query,
}

impl CppScanner {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_cpp::LANGUAGE.into();
        let comment_query =
            Query::new(&language, "(comment) @comment").context("failed to compile comment query")?;
        Ok(Self {
            language,
            comment_query,
        })
    }
}

impl LanguageScanner for CppScanner {
    fn language(&self) -> types::Language {
        types::Language::Cpp
    }

    fn file_extensions(&self) -> &[&str] {
        &["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"]
    }

    fn count_lines(&self, _path: &Path, content: &str) -> Result<LineCounts> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set C++ language")?;
        let tree = parser
            .parse(content, None)
            .context("failed to parse C++ file")?;

        let mut ranges = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.comment_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                ranges.push(capture.node.byte_range());
            }
        }

        Ok(count_with_comments(content, &ranges))
    }
}
