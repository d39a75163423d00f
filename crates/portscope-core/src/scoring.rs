use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::Error;
use crate::types::{
    ApiUsageCounts, CodeVolume, EffortBucket, EffortScore, Language, ManifestInfo,
};

/// Weights and thresholds for one run. Built once, then shared read-only
/// by every package.
#[derive(Debug, Clone)]
pub struct ScoringModel {
    dependency_weights: BTreeMap<String, f64>,
    category_weights: BTreeMap<String, f64>,
    lines_per_point: BTreeMap<Language, u64>,
    mixed_language_penalty: f64,
    medium_threshold: f64,
    large_threshold: f64,
}

impl ScoringModel {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        let mut lines_per_point = BTreeMap::new();
        for (key, n) in &config.scoring.lines_per_point {
            let language = key
                .parse::<Language>()
                .map_err(|e| Error::InvalidConfig(format!("[scoring.lines_per_point]: {e}")))?;
            lines_per_point.insert(language, *n);
        }

        Ok(Self {
            dependency_weights: config.dependencies.clone(),
            category_weights: config
                .patterns
                .iter()
                .map(|p| (p.name.clone(), p.weight))
                .collect(),
            lines_per_point,
            mixed_language_penalty: config.scoring.mixed_language_penalty,
            medium_threshold: config.scoring.medium_threshold,
            large_threshold: config.scoring.large_threshold,
        })
    }

    pub fn bucket_for(&self, total: f64) -> EffortBucket {
        if total >= self.large_threshold {
            EffortBucket::Large
        } else if total >= self.medium_threshold {
            EffortBucket::Medium
        } else {
            EffortBucket::Small
        }
    }

    fn dependency_penalty(&self, manifest: &ManifestInfo) -> f64 {
        manifest
            .dependencies
            .iter()
            .filter_map(|dep| self.dependency_weights.get(dep))
            .sum()
    }

    fn usage_penalty(&self, usage: &ApiUsageCounts) -> f64 {
        usage
            .counts
            .iter()
            .map(|(category, n)| {
                let weight = self.category_weights.get(category).copied().unwrap_or(0.0);
                *n as f64 * weight
            })
            .sum()
    }

    fn volume_score(&self, volume: &CodeVolume) -> f64 {
        self.lines_per_point
            .iter()
            .filter(|(_, per_point)| **per_point > 0)
            .map(|(language, per_point)| volume.code_lines(*language).div_ceil(*per_point) as f64)
            .sum()
    }

    fn mixed_penalty(&self, volume: &CodeVolume) -> f64 {
        if volume.files(Language::Cpp) > 0 && volume.files(Language::Python) > 0 {
            self.mixed_language_penalty
        } else {
            0.0
        }
    }
}

/// Score one package. Pure: equal inputs always give an equal score.
pub fn score_package(
    model: &ScoringModel,
    manifest: &ManifestInfo,
    usage: &ApiUsageCounts,
    volume: &CodeVolume,
) -> EffortScore {
    let dependency_penalty = model.dependency_penalty(manifest);
    let usage_penalty = model.usage_penalty(usage);
    let volume_score = model.volume_score(volume);
    let mixed_language_penalty = model.mixed_penalty(volume);
    let total = dependency_penalty + usage_penalty + volume_score + mixed_language_penalty;

    EffortScore {
        dependency_penalty,
        usage_penalty,
        volume_score,
        mixed_language_penalty,
        total,
        bucket: model.bucket_for(total),
    }
}

/// Packages marked with an ignore file keep their score but report as Small.
pub fn pin_ignored(mut score: EffortScore, ignored: bool) -> EffortScore {
    if ignored {
        score.bucket = EffortBucket::Small;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineCounts, ManifestStatus};

    fn model() -> ScoringModel {
        ScoringModel::from_config(&Config::default()).unwrap()
    }

    fn manifest(deps: &[&str]) -> ManifestInfo {
        let mut info = ManifestInfo::degraded("pkg", "");
        info.status = ManifestStatus::Parsed;
        info.dependencies = deps.iter().map(|d| d.to_string()).collect();
        info
    }

    fn volume(files: &[(Language, u64)]) -> CodeVolume {
        let mut volume = CodeVolume::default();
        for (language, code) in files {
            volume.add_file(
                *language,
                &LineCounts {
                    code: *code,
                    comment: 0,
                    blank: 0,
                },
            );
        }
        volume
    }

    fn usage(counts: &[(&str, u64)]) -> ApiUsageCounts {
        let mut usage = ApiUsageCounts::default();
        for (category, n) in counts {
            usage.add(category, *n);
        }
        usage
    }

    #[test]
    fn test_single_difficult_dependency_small_package() {
        let score = score_package(
            &model(),
            &manifest(&["roscpp", "std_msgs", "tf"]),
            &ApiUsageCounts::default(),
            &volume(&[(Language::Cpp, 50)]),
        );
        assert_eq!(score.dependency_penalty, 1.0);
        assert_eq!(score.usage_penalty, 0.0);
        assert_eq!(score.volume_score, 1.0);
        assert_eq!(score.total, 2.0);
        assert_eq!(score.bucket, EffortBucket::Small);
    }

    #[test]
    fn test_heavy_api_usage_is_large() {
        let score = score_package(
            &model(),
            &manifest(&[]),
            &usage(&[("cpp_tf", 200)]),
            &volume(&[(Language::Cpp, 5000)]),
        );
        assert_eq!(score.usage_penalty, 400.0);
        assert_eq!(score.volume_score, 5.0);
        assert!(score.usage_penalty > score.volume_score + score.dependency_penalty);
        assert_eq!(score.bucket, EffortBucket::Large);
    }

    #[test]
    fn test_degraded_manifest_scores_from_sources() {
        let degraded = ManifestInfo::degraded("broken_pkg", "malformed XML");
        let files: Vec<_> = (0..10).map(|_| (Language::Cpp, 120)).collect();
        let score = score_package(
            &model(),
            &degraded,
            &usage(&[("roscpp_client", 10)]),
            &volume(&files),
        );
        assert_eq!(score.dependency_penalty, 0.0);
        assert_eq!(score.usage_penalty, 10.0);
        assert_eq!(score.volume_score, 2.0);
        assert_eq!(score.bucket, EffortBucket::Medium);
    }

    #[test]
    fn test_volume_rounds_up_per_language() {
        let m = model();
        let v = volume(&[(Language::Cpp, 1001), (Language::Python, 500)]);
        assert_eq!(m.volume_score(&v), 3.0);
        assert_eq!(m.volume_score(&volume(&[(Language::Cpp, 0)])), 0.0);
        // No lines_per_point entry for CMake by default.
        assert_eq!(m.volume_score(&volume(&[(Language::CMake, 4000)])), 0.0);
    }

    #[test]
    fn test_zero_lines_per_point_disables_language() {
        let mut config = Config::default();
        config.scoring.lines_per_point.insert("cpp".to_string(), 0);
        let m = ScoringModel::from_config(&config).unwrap();
        assert_eq!(m.volume_score(&volume(&[(Language::Cpp, 9000)])), 0.0);
    }

    #[test]
    fn test_mixed_language_penalty() {
        let m = model();
        let mixed = score_package(
            &m,
            &manifest(&[]),
            &ApiUsageCounts::default(),
            &volume(&[(Language::Cpp, 10), (Language::Python, 10)]),
        );
        assert_eq!(mixed.mixed_language_penalty, 1.0);
        let cpp_only = score_package(
            &m,
            &manifest(&[]),
            &ApiUsageCounts::default(),
            &volume(&[(Language::Cpp, 10), (Language::CMake, 10)]),
        );
        assert_eq!(cpp_only.mixed_language_penalty, 0.0);
    }

    #[test]
    fn test_threshold_boundaries() {
        let m = model();
        assert_eq!(m.bucket_for(0.0), EffortBucket::Small);
        assert_eq!(m.bucket_for(9.99), EffortBucket::Small);
        assert_eq!(m.bucket_for(10.0), EffortBucket::Medium);
        assert_eq!(m.bucket_for(29.99), EffortBucket::Medium);
        assert_eq!(m.bucket_for(30.0), EffortBucket::Large);
    }

    #[test]
    fn test_score_exactly_at_medium_threshold() {
        let mut config = Config::default();
        config.dependencies = BTreeMap::from([("legacy_driver".to_string(), 10.0)]);
        let m = ScoringModel::from_config(&config).unwrap();
        let score = score_package(
            &m,
            &manifest(&["legacy_driver"]),
            &ApiUsageCounts::default(),
            &CodeVolume::default(),
        );
        assert_eq!(score.total, 10.0);
        assert_eq!(score.bucket, EffortBucket::Medium);
    }

    #[test]
    fn test_unknown_dependencies_and_categories_add_nothing() {
        let score = score_package(
            &model(),
            &manifest(&["std_msgs", "geometry_msgs"]),
            &usage(&[("not_a_category", 50)]),
            &CodeVolume::default(),
        );
        assert_eq!(score.total, 0.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let m = model();
        let mf = manifest(&["actionlib", "tf", "nodelet"]);
        let u = usage(&[("roscpp_logging", 37), ("cpp_nodelet", 3), ("rospy_client", 2)]);
        let v = volume(&[(Language::Cpp, 2345), (Language::Python, 678)]);
        let first = score_package(&m, &mf, &u, &v);
        for _ in 0..10 {
            assert_eq!(score_package(&m, &mf, &u, &v), first);
        }
    }

    #[test]
    fn test_score_is_monotonic_in_counts_and_lines() {
        let m = model();
        let mf = manifest(&["tf"]);
        let mut previous = 0.0;
        for n in 0..60 {
            let score = score_package(
                &m,
                &mf,
                &usage(&[("roscpp_logging", n), ("cpp_tf", n / 3)]),
                &volume(&[(Language::Cpp, n * 97)]),
            );
            assert!(score.total >= previous, "{} < {previous}", score.total);
            previous = score.total;
        }
    }

    #[test]
    fn test_alternate_weight_table() {
        let mut config = Config::default();
        config.dependencies.insert("tf".to_string(), 5.0);
        let m = ScoringModel::from_config(&config).unwrap();
        let score = score_package(
            &m,
            &manifest(&["tf"]),
            &ApiUsageCounts::default(),
            &CodeVolume::default(),
        );
        assert_eq!(score.dependency_penalty, 5.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.scoring.large_threshold = 1.0;
        assert!(ScoringModel::from_config(&config).is_err());
    }

    #[test]
    fn test_ignored_package_keeps_score_but_is_small() {
        let score = score_package(
            &model(),
            &manifest(&[]),
            &usage(&[("cpp_tf", 50)]),
            &CodeVolume::default(),
        );
        assert_eq!(score.bucket, EffortBucket::Large);
        let pinned = pin_ignored(score.clone(), true);
        assert_eq!(pinned.bucket, EffortBucket::Small);
        assert_eq!(pinned.total, score.total);
        assert_eq!(pin_ignored(score.clone(), false), score);
    }
}
