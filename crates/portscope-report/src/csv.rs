use anyhow::{Context, Result};

use portscope_core::pipeline::Analysis;
use portscope_core::types::{Language, PackageRecord};

/// Column names, in output order.
pub fn header(categories: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = [
        "name",
        "path",
        "manifest",
        "package_type",
        "ignored",
        "build_depends",
        "exec_depends",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    for language in Language::ALL {
        columns.push(format!("files_{language}"));
        columns.push(format!("code_{language}"));
    }
    columns.push("dependency_penalty".to_string());
    columns.extend(categories.iter().map(|c| format!("api_{c}")));
    for column in [
        "usage_penalty",
        "volume_score",
        "mixed_language_penalty",
        "score",
        "effort",
    ] {
        columns.push(column.to_string());
    }
    columns
}

fn row(record: &PackageRecord, categories: &[String]) -> Vec<String> {
    let manifest = if record.manifest.is_degraded() {
        "degraded"
    } else {
        "ok"
    };
    let mut fields = vec![
        record.name.clone(),
        record.path.clone(),
        manifest.to_string(),
        record.manifest.package_type.to_string(),
        record.ignored.to_string(),
        record.manifest.build_depends.to_string(),
        record.manifest.exec_depends.to_string(),
    ];
    for language in Language::ALL {
        let volume = record.volume.get(language);
        fields.push(volume.files.to_string());
        fields.push(volume.code.to_string());
    }
    let score = &record.score;
    fields.push(format!("{:.2}", score.dependency_penalty));
    fields.extend(categories.iter().map(|c| record.usage.get(c).to_string()));
    fields.push(format!("{:.2}", score.usage_penalty));
    fields.push(format!("{:.2}", score.volume_score));
    fields.push(format!("{:.2}", score.mixed_language_penalty));
    fields.push(format!("{:.2}", score.total));
    fields.push(score.bucket.to_string());
    fields
}

/// Format the analysis as CSV, one row per package. The header row is
/// always written, even when no package was found.
pub fn format_report(analysis: &Analysis) -> Result<String> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header(&analysis.categories))
        .context("failed to write CSV header")?;
    for record in &analysis.packages {
        writer
            .write_record(row(record, &analysis.categories))
            .with_context(|| format!("failed to write CSV row for '{}'", record.name))?;
    }
    let bytes = writer.into_inner().context("failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
