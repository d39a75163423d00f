use std::path::Path;

use globset::GlobSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyzer::LanguageScanner;
use crate::catalog::PatternCatalog;
use crate::config::Config;
use crate::error::Error;
use crate::locator::{build_excludes, locate_packages};
use crate::manifest::{analyze_manifest, degraded_warning};
use crate::scanner::scan_package;
use crate::scoring::{pin_ignored, score_package, ScoringModel};
use crate::types::{EffortBucket, PackageDescriptor, PackageRecord, Warning, WarningKind};

/// Name-based package selection.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    /// When non-empty, only these packages are reported.
    pub only: Vec<String>,
    pub exclude: Vec<String>,
}

impl PackageFilter {
    pub fn accepts(&self, name: &str) -> bool {
        if !self.only.is_empty() && !self.only.iter().any(|n| n == name) {
            return false;
        }
        !self.exclude.iter().any(|n| n == name)
    }
}

/// Output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub packages: Vec<PackageRecord>,
    /// Usage categories in catalog order.
    pub categories: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl Analysis {
    /// Package count per bucket, Small to Large.
    pub fn bucket_counts(&self) -> [(EffortBucket, usize); 3] {
        [EffortBucket::Small, EffortBucket::Medium, EffortBucket::Large].map(|bucket| {
            let n = self
                .packages
                .iter()
                .filter(|p| p.score.bucket == bucket)
                .count();
            (bucket, n)
        })
    }
}

struct PackageOutcome {
    record: Option<PackageRecord>,
    warnings: Vec<Warning>,
}

pub struct AnalysisPipeline {
    scanners: Vec<Box<dyn LanguageScanner>>,
    config: Config,
    catalog: PatternCatalog,
    model: ScoringModel,
    excludes: GlobSet,
}

impl AnalysisPipeline {
    pub fn new(scanners: Vec<Box<dyn LanguageScanner>>, config: Config) -> Result<Self, Error> {
        let model = ScoringModel::from_config(&config)?;
        let catalog = PatternCatalog::compile(&config.patterns)?;
        let excludes = build_excludes(&config.project.exclude_patterns)?;
        Ok(Self {
            scanners,
            config,
            catalog,
            model,
            excludes,
        })
    }

    /// Locate, scan and score every package under `root`.
    pub fn analyze(&self, root: &Path, filter: &PackageFilter) -> Result<Analysis, Error> {
        let located = locate_packages(
            root,
            &self.config.project.manifest_file,
            &self.config.project.ignore_markers,
            &self.excludes,
        )?;
        tracing::debug!(
            root = %root.display(),
            packages = located.packages.len(),
            "located packages"
        );

        let outcomes: Vec<PackageOutcome> = located
            .packages
            .par_iter()
            .map(|descriptor| self.analyze_package(descriptor, filter))
            .collect();

        let mut warnings = located.warnings;
        let mut packages = Vec::new();
        for outcome in outcomes {
            warnings.extend(outcome.warnings);
            packages.extend(outcome.record);
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        warnings.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.message.cmp(&b.message))
        });

        let analysis = Analysis {
            packages,
            categories: self.catalog.names(),
            warnings,
        };
        let [small, medium, large] = analysis.bucket_counts().map(|(_, n)| n);
        tracing::info!(
            packages = analysis.packages.len(),
            small,
            medium,
            large,
            warnings = analysis.warnings.len(),
            "analysis complete"
        );
        Ok(analysis)
    }

    fn analyze_package(
        &self,
        descriptor: &PackageDescriptor,
        filter: &PackageFilter,
    ) -> PackageOutcome {
        let mut warnings = Vec::new();

        let (manifest, manifest_error) = analyze_manifest(descriptor);
        if !filter.accepts(&manifest.name) {
            tracing::debug!(package = %manifest.name, "filtered out");
            return PackageOutcome {
                record: None,
                warnings,
            };
        }
        if let Some(error) = manifest_error {
            warnings.push(degraded_warning(descriptor, &error));
        }

        let scan = match scan_package(
            &manifest.name,
            descriptor,
            &self.scanners,
            &self.catalog,
            &self.excludes,
        ) {
            Ok(scan) => scan,
            Err(e) => {
                warnings.push(Warning::new(
                    WarningKind::DirectoryAccess,
                    Some(&manifest.name),
                    &descriptor.root,
                    format!("skipping package: {e}"),
                ));
                return PackageOutcome {
                    record: None,
                    warnings,
                };
            }
        };
        warnings.extend(scan.warnings);

        let score = pin_ignored(
            score_package(&self.model, &manifest, &scan.usage, &scan.volume),
            descriptor.ignored,
        );
        tracing::debug!(
            package = %manifest.name,
            files = scan.files.len(),
            score = score.total,
            bucket = %score.bucket,
            "scored package"
        );

        PackageOutcome {
            record: Some(PackageRecord {
                name: manifest.name.clone(),
                path: descriptor.relative.clone(),
                ignored: descriptor.ignored,
                manifest,
                files: scan.files,
                volume: scan.volume,
                usage: scan.usage,
                score,
            }),
            warnings,
        }
    }
}
