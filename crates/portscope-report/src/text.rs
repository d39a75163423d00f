use colored::{ColoredString, Colorize};

use portscope_core::pipeline::Analysis;
use portscope_core::types::{EffortBucket, PackageRecord};

fn bucket_label(bucket: EffortBucket) -> ColoredString {
    let label = format!("{:<6}", bucket.to_string());
    match bucket {
        EffortBucket::Small => label.green(),
        EffortBucket::Medium => label.yellow(),
        EffortBucket::Large => label.red().bold(),
    }
}

fn package_line(record: &PackageRecord, name_width: usize) -> String {
    let mut notes = Vec::new();
    if record.manifest.is_degraded() {
        notes.push("manifest degraded");
    }
    if record.ignored {
        notes.push("ignored");
    }
    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    };

    format!(
        "  {:<width$}  {}  {:>8.2}  {}{}\n",
        record.name,
        bucket_label(record.score.bucket),
        record.score.total,
        record.path,
        notes.dimmed(),
        width = name_width,
    )
}

/// Format the analysis for terminal output.
pub fn format_report(analysis: &Analysis) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "portscope - ROS 2 Porting Estimate".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    if analysis.packages.is_empty() {
        out.push_str("No packages found.\n");
    } else {
        let name_width = analysis
            .packages
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max("Package".len());
        out.push_str(&format!(
            "  {:<width$}  {:<6}  {:>8}  {}\n",
            "Package".bold(),
            "Effort".bold(),
            "Score".bold(),
            "Path".bold(),
            width = name_width,
        ));
        for record in &analysis.packages {
            out.push_str(&package_line(record, name_width));
        }
    }

    let counts = analysis.bucket_counts();
    let breakdown: Vec<String> = counts
        .iter()
        .map(|(bucket, n)| format!("{n} {bucket}"))
        .collect();
    out.push_str(&format!(
        "\n{}: {} packages ({})\n",
        "Summary".bold(),
        analysis.packages.len(),
        breakdown.join(", "),
    ));

    if !analysis.warnings.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "Warnings".yellow().bold(),
            analysis.warnings.len(),
            "-".repeat(40),
        ));
        for warning in &analysis.warnings {
            out.push_str(&format!("  {warning}\n"));
        }
    }

    out.push('\n');
    out
}
