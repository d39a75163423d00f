use anyhow::{Context, Result};

use portscope_core::pipeline::Analysis;

/// Format a full analysis as JSON.
pub fn format_report(analysis: &Analysis, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(analysis)
    } else {
        serde_json::to_string_pretty(analysis)
    };
    json.context("failed to serialize analysis")
}
