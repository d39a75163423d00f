use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::Error;
use crate::types::Language;

/// File name searched for in the source root and its ancestors.
pub const CONFIG_FILE: &str = ".portscope.toml";

/// Top-level configuration from `.portscope.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Known migration-difficulty dependencies and their weights.
    #[serde(default = "default_dependency_weights")]
    pub dependencies: BTreeMap<String, f64>,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            scoring: ScoringConfig::default(),
            dependencies: default_dependency_weights(),
            patterns: default_patterns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_ignore_markers")]
    pub ignore_markers: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_manifest_file() -> String {
    "package.xml".to_string()
}

fn default_ignore_markers() -> Vec<String> {
    vec!["CATKIN_IGNORE".to_string()]
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/build".to_string(),
        "**/devel".to_string(),
        "**/install".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            manifest_file: default_manifest_file(),
            ignore_markers: default_ignore_markers(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Bucket thresholds and volume weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Scores at or above this are Medium.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
    /// Scores at or above this are Large.
    #[serde(default = "default_large_threshold")]
    pub large_threshold: f64,
    /// Added when a package holds both C/C++ and Python sources.
    #[serde(default = "default_mixed_language_penalty")]
    pub mixed_language_penalty: f64,
    /// One point per started block of this many code lines.
    #[serde(default = "default_lines_per_point")]
    pub lines_per_point: BTreeMap<String, u64>,
}

fn default_medium_threshold() -> f64 {
    10.0
}
fn default_large_threshold() -> f64 {
    30.0
}
fn default_mixed_language_penalty() -> f64 {
    1.0
}

fn default_lines_per_point() -> BTreeMap<String, u64> {
    BTreeMap::from([
        (Language::Cpp.to_string(), 1000),
        (Language::Python.to_string(), 500),
    ])
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            medium_threshold: default_medium_threshold(),
            large_threshold: default_large_threshold(),
            mixed_language_penalty: default_mixed_language_penalty(),
            lines_per_point: default_lines_per_point(),
        }
    }
}

fn default_dependency_weights() -> BTreeMap<String, f64> {
    [
        ("actionlib", 2.0),
        ("dynamic_reconfigure", 2.0),
        ("nodelet", 2.0),
        ("tf", 1.0),
        ("tf_conversions", 1.0),
        ("pluginlib", 1.0),
        ("rostest", 1.0),
        ("roslaunch", 1.0),
        ("rosbag", 1.0),
        ("message_filters", 1.0),
        ("image_transport", 1.0),
        ("diagnostic_updater", 1.0),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

/// How matches in one file contribute to a category count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    /// 1 per file with at least one matching line.
    #[default]
    Files,
    /// 1 per matching line.
    Lines,
}

/// A named API-usage category and the signatures that detect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub languages: Vec<Language>,
    pub patterns: Vec<String>,
    /// A file matching any of these contributes nothing to the category.
    #[serde(default)]
    pub unless: Vec<String>,
    #[serde(default = "default_pattern_weight")]
    pub weight: f64,
    #[serde(default)]
    pub count: CountMode,
}

fn default_pattern_weight() -> f64 {
    1.0
}

fn category(
    name: &str,
    language: Language,
    count: CountMode,
    weight: f64,
    patterns: &[&str],
    unless: &[&str],
) -> PatternConfig {
    PatternConfig {
        name: name.to_string(),
        languages: vec![language],
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        unless: unless.iter().map(|p| p.to_string()).collect(),
        weight,
        count,
    }
}

fn default_patterns() -> Vec<PatternConfig> {
    use CountMode::{Files, Lines};
    use Language::{CMake, Cpp, Launch, Python};

    vec![
        category(
            "roscpp_client",
            Cpp,
            Files,
            1.0,
            &["using namespace ros", "ros::"],
            &[],
        ),
        category("roscpp_node_init", Cpp, Lines, 1.0, &[r"ros::init\s*\("], &[]),
        category(
            "roscpp_logging",
            Cpp,
            Lines,
            0.05,
            &["ROS_(DEBUG|INFO|WARN|ERROR|FATAL)"],
            &[],
        ),
        category("cpp_tf", Cpp, Files, 2.0, &["tf::"], &["tf2_ros::"]),
        category(
            "cpp_dynamic_reconfigure",
            Cpp,
            Files,
            2.0,
            &["dynamic_reconfigure::"],
            &[],
        ),
        category(
            "cpp_action_server",
            Cpp,
            Files,
            2.0,
            &["(?i)actionlib::.*server"],
            &[],
        ),
        category(
            "cpp_nodelet",
            Cpp,
            Files,
            1.0,
            &["nodelet::Nodelet", "PLUGINLIB_EXPORT_CLASS"],
            &[],
        ),
        category("rospy_client", Python, Files, 1.0, &["rospy"], &[]),
        category(
            "rospy_node_init",
            Python,
            Lines,
            1.0,
            &[r"rospy\.init_node\s*\("],
            &[],
        ),
        category(
            "rospy_logging",
            Python,
            Lines,
            0.05,
            &[r"rospy\.log(debug|info|warn|err|fatal)"],
            &[],
        ),
        category(
            "python_tf",
            Python,
            Files,
            2.0,
            &["import tf$", "from tf_conversions import"],
            &[],
        ),
        category(
            "python_action_server",
            Python,
            Files,
            2.0,
            &["(?i)actionlib.*server"],
            &[],
        ),
        category("rostest_launch", Launch, Files, 1.0, &["(?i)<test"], &[]),
        category(
            "message_generation_macros",
            CMake,
            Lines,
            1.0,
            &[
                r"add_(message|service|action)_files\s*\(",
                r"generate_messages\s*\(",
            ],
            &[],
        ),
        category(
            "catkin_build_macros",
            CMake,
            Lines,
            1.0,
            &[r"catkin_(package|python_setup|add_gtest|add_nosetests|install_python)\s*\("],
            &[],
        ),
    ]
}

impl Config {
    /// Load configuration from a `.portscope.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `portscope --print-config` for a valid template",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.portscope.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        config
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Reject settings that would make scoring non-monotonic or ambiguous.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        let s = &self.scoring;
        if !(s.medium_threshold.is_finite() && s.large_threshold.is_finite()) {
            return Err(Error::InvalidConfig(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if s.medium_threshold < 0.0 || s.medium_threshold > s.large_threshold {
            return Err(Error::InvalidConfig(format!(
                "thresholds must satisfy 0 <= medium_threshold ({}) <= large_threshold ({})",
                s.medium_threshold, s.large_threshold
            )));
        }
        if !non_negative(s.mixed_language_penalty) {
            return Err(Error::InvalidConfig(
                "mixed_language_penalty must be a non-negative number".to_string(),
            ));
        }
        for language in s.lines_per_point.keys() {
            language
                .parse::<Language>()
                .map_err(|e| Error::InvalidConfig(format!("[scoring.lines_per_point]: {e}")))?;
        }
        for (name, weight) in &self.dependencies {
            if !non_negative(*weight) {
                return Err(Error::InvalidConfig(format!(
                    "dependency '{name}' has negative or non-finite weight {weight}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for pattern in &self.patterns {
            if pattern.name.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "pattern category with an empty name".to_string(),
                ));
            }
            if !seen.insert(pattern.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "pattern category '{}' is defined twice",
                    pattern.name
                )));
            }
            if pattern.patterns.is_empty() || pattern.languages.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "pattern category '{}' needs at least one pattern and one language",
                    pattern.name
                )));
            }
            if !non_negative(pattern.weight) {
                return Err(Error::InvalidConfig(format!(
                    "pattern category '{}' has negative or non-finite weight {}",
                    pattern.name, pattern.weight
                )));
            }
        }
        Ok(())
    }

    /// Generate the default TOML content printed by `portscope --print-config`.
    pub fn default_toml() -> String {
        r#"# portscope - ROS 2 porting effort configuration

[project]
manifest_file = "package.xml"
# Packages containing one of these files are reported as Small regardless of score
ignore_markers = ["CATKIN_IGNORE"]
# Globs matched against paths relative to the source root, for package
# directories and for files inside packages alike
exclude_patterns = ["**/build", "**/devel", "**/install"]

[scoring]
# score < medium_threshold -> Small; score >= large_threshold -> Large
medium_threshold = 10.0
large_threshold = 30.0
mixed_language_penalty = 1.0

[scoring.lines_per_point]
# One point per started block of N code lines
cpp = 1000
python = 500

# Declared dependencies known to be hard to port, with their weight
[dependencies]
actionlib = 2.0
dynamic_reconfigure = 2.0
nodelet = 2.0
tf = 1.0
tf_conversions = 1.0
pluginlib = 1.0
rostest = 1.0
roslaunch = 1.0
rosbag = 1.0
message_filters = 1.0
image_transport = 1.0
diagnostic_updater = 1.0

# API-usage categories. Patterns are regular expressions matched line by line.
# count = "files" adds 1 per matching file, count = "lines" adds 1 per matching line.
# A file matching any `unless` pattern adds nothing to the category.

[[patterns]]
name = "roscpp_client"
languages = ["cpp"]
patterns = ['using namespace ros', 'ros::']
weight = 1.0
count = "files"

[[patterns]]
name = "roscpp_node_init"
languages = ["cpp"]
patterns = ['ros::init\s*\(']
weight = 1.0
count = "lines"

[[patterns]]
name = "roscpp_logging"
languages = ["cpp"]
patterns = ['ROS_(DEBUG|INFO|WARN|ERROR|FATAL)']
weight = 0.05
count = "lines"

[[patterns]]
name = "cpp_tf"
languages = ["cpp"]
patterns = ['tf::']
unless = ['tf2_ros::']
weight = 2.0
count = "files"

[[patterns]]
name = "cpp_dynamic_reconfigure"
languages = ["cpp"]
patterns = ['dynamic_reconfigure::']
weight = 2.0
count = "files"

[[patterns]]
name = "cpp_action_server"
languages = ["cpp"]
patterns = ['(?i)actionlib::.*server']
weight = 2.0
count = "files"

[[patterns]]
name = "cpp_nodelet"
languages = ["cpp"]
patterns = ['nodelet::Nodelet', 'PLUGINLIB_EXPORT_CLASS']
weight = 1.0
count = "files"

[[patterns]]
name = "rospy_client"
languages = ["python"]
patterns = ['rospy']
weight = 1.0
count = "files"

[[patterns]]
name = "rospy_node_init"
languages = ["python"]
patterns = ['rospy\.init_node\s*\(']
weight = 1.0
count = "lines"

[[patterns]]
name = "rospy_logging"
languages = ["python"]
patterns = ['rospy\.log(debug|info|warn|err|fatal)']
weight = 0.05
count = "lines"

[[patterns]]
name = "python_tf"
languages = ["python"]
patterns = ['import tf$', 'from tf_conversions import']
weight = 2.0
count = "files"

[[patterns]]
name = "python_action_server"
languages = ["python"]
patterns = ['(?i)actionlib.*server']
weight = 2.0
count = "files"

[[patterns]]
name = "rostest_launch"
languages = ["launch"]
patterns = ['(?i)<test']
weight = 1.0
count = "files"

[[patterns]]
name = "message_generation_macros"
languages = ["cmake"]
patterns = ['add_(message|service|action)_files\s*\(', 'generate_messages\s*\(']
weight = 1.0
count = "lines"

[[patterns]]
name = "catkin_build_macros"
languages = ["cmake"]
patterns = ['catkin_(package|python_setup|add_gtest|add_nosetests|install_python)\s*\(']
weight = 1.0
count = "lines"
"#
        .to_string()
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.manifest_file, "package.xml");
        assert!((config.scoring.medium_threshold - 10.0).abs() < f64::EPSILON);
        assert!((config.scoring.large_threshold - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.scoring.lines_per_point["cpp"], 1000);
        assert_eq!(config.dependencies["actionlib"], 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_toml_matches_defaults() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[scoring]
medium_threshold = 5
large_threshold = 12.5

[dependencies]
tf = 3

[[patterns]]
name = "tf_everywhere"
languages = ["cpp", "python"]
patterns = ['tf']
count = "lines"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scoring.medium_threshold, 5.0);
        assert_eq!(config.scoring.large_threshold, 12.5);
        // Untouched fields keep their defaults
        assert_eq!(config.scoring.mixed_language_penalty, 1.0);
        assert_eq!(config.project.manifest_file, "package.xml");
        // Tables given in the file replace the defaults wholesale
        assert_eq!(config.dependencies.len(), 1);
        assert_eq!(config.dependencies["tf"], 3.0);
        assert_eq!(config.patterns.len(), 1);
        assert_eq!(config.patterns[0].weight, 1.0);
        assert_eq!(config.patterns[0].count, CountMode::Lines);
        assert_eq!(
            config.patterns[0].languages,
            vec![Language::Cpp, Language::Python]
        );
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.scoring.medium_threshold = 40.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_negative_weights() {
        let mut config = Config::default();
        config.dependencies.insert("tf".to_string(), -1.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.patterns[0].weight = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_volume_language() {
        let mut config = Config::default();
        config.scoring.lines_per_point.insert("cobol".to_string(), 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_category() {
        let mut config = Config::default();
        let dup = config.patterns[0].clone();
        config.patterns.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("defined twice"), "{err}");
    }

    #[test]
    fn test_load_or_default_finds_ancestor_config() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "[scoring]\nmedium_threshold = 2.0\n",
        )
        .unwrap();
        let nested = tmp.path().join("src/pkg");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.scoring.medium_threshold, 2.0);
    }

    #[test]
    fn test_load_or_default_falls_back_on_broken_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "[scoring\n").unwrap();
        let config = Config::load_or_default(tmp.path());
        assert_eq!(config, Config::default());
    }
}
