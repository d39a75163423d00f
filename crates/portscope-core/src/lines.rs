//! Line classification shared by every scanner.
//!
//! Scanners only need to report where comments are (byte ranges); this
//! module turns those ranges into code/comment/blank counts. A line is
//! blank when it holds only whitespace, code when any non-whitespace byte
//! lies outside a comment, and comment otherwise.

use std::ops::Range;

use crate::types::LineCounts;

/// Count lines given the byte ranges of all comments in `content`.
pub fn count_with_comments(content: &str, comments: &[Range<usize>]) -> LineCounts {
    let len = content.len();
    let mut in_comment = vec![false; len];
    for range in comments {
        let end = range.end.min(len);
        let start = range.start.min(end);
        in_comment[start..end].iter_mut().for_each(|b| *b = true);
    }

    let mut counts = LineCounts::default();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let mut has_code = false;
        let mut has_comment = false;
        for (i, byte) in line.bytes().enumerate() {
            if byte.is_ascii_whitespace() {
                continue;
            }
            if in_comment[offset + i] {
                has_comment = true;
            } else {
                has_code = true;
                break;
            }
        }

        if has_code {
            counts.code += 1;
        } else if has_comment {
            counts.comment += 1;
        } else {
            counts.blank += 1;
        }
        offset += line.len();
    }
    counts
}

/// Comment ranges for `#`-style languages (CMake, ROS interface files).
///
/// Full-line `#` comments and CMake bracket comments (`#[[ ... ]]`,
/// `#[==[ ... ]==]`) are recognised. Trailing `#` after code is treated as
/// part of a code line anyway, so it needs no range.
pub fn hash_comment_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let bytes = content.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let line_end = content[pos..]
            .find('\n')
            .map_or(bytes.len(), |i| pos + i);
        let line = &content[pos..line_end];
        let indent = line.len() - line.trim_start().len();
        let start = pos + indent;

        if line.trim_start().starts_with('#') {
            if let Some(close) = bracket_close(&content[start + 1..]) {
                let end = content[start..]
                    .find(&close)
                    .map_or(bytes.len(), |i| start + i + close.len());
                ranges.push(start..end);
                pos = content[end..].find('\n').map_or(bytes.len(), |i| end + i + 1);
                continue;
            }
            ranges.push(start..line_end);
        }
        pos = line_end + 1;
    }
    ranges
}

/// For text following `#`, return the closing delimiter if it opens a
/// CMake bracket comment (`[[`, `[=[`, `[==[`, ...).
fn bracket_close(after_hash: &str) -> Option<String> {
    let rest = after_hash.strip_prefix('[')?;
    let equals = rest.bytes().take_while(|b| *b == b'=').count();
    if rest[equals..].starts_with('[') {
        Some(format!("]{}]", "=".repeat(equals)))
    } else {
        None
    }
}

/// Comment ranges for XML documents (`<!-- ... -->`).
pub fn xml_comment_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some(open) = content[pos..].find("<!--") {
        let start = pos + open;
        let end = content[start + 4..]
            .find("-->")
            .map_or(content.len(), |i| start + 4 + i + 3);
        ranges.push(start..end);
        pos = end;
    }
    ranges
}
