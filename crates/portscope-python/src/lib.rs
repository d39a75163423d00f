use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use portscope_core::analyzer::LanguageScanner;
use portscope_core::lines::count_with_comments;
use portscope_core::types::{self, LineCounts};

/// Python line counter using tree-sitter.
///
/// `#` comments and module, class and function docstrings count as comment
/// lines. Other string literals are code.
pub struct PythonScanner {
    language: Language,
    comment_query: Query,
    body_query: Query,
}

impl PythonScanner {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();

        let comment_query = Query::new(&language, "(comment) @comment")
            .context("failed to compile comment query")?;

        let body_query = Query::new(
            &language,
            r#"
            (class_definition body: (block) @body)
            (function_definition body: (block) @body)
            "#,
        )
        .context("failed to compile body query")?;

        Ok(Self {
            language,
            comment_query,
            body_query,
        })
    }
}

fn captured_nodes<'tree>(query: &Query, root: Node<'tree>, source: &[u8]) -> Vec<Node<'tree>> {
    let mut nodes = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        nodes.extend(m.captures.iter().map(|c| c.node));
    }
    nodes
}

/// Byte range of the docstring opening `body`, if any. Comments before the
/// first statement (a shebang or license header) do not displace it.
fn leading_docstring(body: Node) -> Option<Range<usize>> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let mut cursor = first.walk();
    let value = first.named_children(&mut cursor).next()?;
    (value.kind() == "string").then(|| value.byte_range())
}

impl LanguageScanner for PythonScanner {
    fn language(&self) -> types::Language {
        types::Language::Python
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn count_lines(&self, _path: &Path, content: &str) -> Result<LineCounts> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set Python language")?;
        let tree = parser
            .parse(content, None)
            .context("failed to parse Python file")?;

        let root = tree.root_node();
        let source = content.as_bytes();
        let mut ranges: Vec<Range<usize>> = captured_nodes(&self.comment_query, root, source)
            .iter()
            .map(|node| node.byte_range())
            .collect();
        ranges.extend(leading_docstring(root));
        for body in captured_nodes(&self.body_query, root, source) {
            ranges.extend(leading_docstring(body));
        }

        Ok(count_with_comments(content, &ranges))
    }
}
