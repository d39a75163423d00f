use std::collections::BTreeSet;
use std::path::PathBuf;

use portscope_core::pipeline::Analysis;
use portscope_core::types::*;

fn record(
    name: &str,
    manifest: ManifestInfo,
    usage: &[(&str, u64)],
    cpp_lines: u64,
    score: EffortScore,
) -> PackageRecord {
    let mut volume = CodeVolume::default();
    let lines = LineCounts {
        code: cpp_lines,
        comment: 3,
        blank: 2,
    };
    volume.add_file(Language::Cpp, &lines);
    let mut counts = ApiUsageCounts::default();
    for (category, n) in usage {
        counts.add(category, *n);
    }
    PackageRecord {
        name: name.to_string(),
        path: format!("src/{name}"),
        ignored: false,
        manifest,
        files: vec![SourceFile {
            path: "src/main.cpp".to_string(),
            language: Language::Cpp,
            lines,
        }],
        volume,
        usage: counts,
        score,
    }
}

pub fn sample_analysis() -> Analysis {
    let talker_manifest = ManifestInfo {
        name: "talker".to_string(),
        version: Some("1.0.0".to_string()),
        format: Some(2),
        package_type: PackageType::Node,
        build_depends: 2,
        exec_depends: 2,
        test_depends: 0,
        dependencies: BTreeSet::from(["roscpp".to_string(), "tf".to_string()]),
        status: ManifestStatus::Parsed,
    };
    let talker = record(
        "talker",
        talker_manifest,
        &[("roscpp_client", 1)],
        120,
        EffortScore {
            dependency_penalty: 1.0,
            usage_penalty: 1.0,
            volume_score: 1.0,
            mixed_language_penalty: 0.0,
            total: 3.0,
            bucket: EffortBucket::Small,
        },
    );
    let broken = record(
        "broken_driver",
        ManifestInfo::degraded("broken_driver", "malformed XML"),
        &[("roscpp_client", 1), ("cpp_tf", 4)],
        2500,
        EffortScore {
            dependency_penalty: 0.0,
            usage_penalty: 9.0,
            volume_score: 3.0,
            mixed_language_penalty: 0.0,
            total: 12.0,
            bucket: EffortBucket::Medium,
        },
    );

    Analysis {
        packages: vec![talker, broken],
        categories: vec!["roscpp_client".to_string(), "cpp_tf".to_string()],
        warnings: vec![Warning {
            kind: WarningKind::ManifestParse,
            package: Some("broken_driver".to_string()),
            path: PathBuf::from("src/broken_driver/package.xml"),
            message: "malformed XML at byte 12".to_string(),
        }],
    }
}
