use regex::Regex;

use crate::config::{CountMode, PatternConfig};
use crate::error::Error;
use crate::types::{ApiUsageCounts, Language};

/// A compiled API-usage category.
pub struct Category {
    pub name: String,
    pub languages: Vec<Language>,
    pub weight: f64,
    pub count: CountMode,
    patterns: Vec<Regex>,
    unless: Vec<Regex>,
}

impl Category {
    pub fn applies_to(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }

    fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }

    /// Contribution of one file's content to this category.
    pub fn count_in(&self, content: &str) -> u64 {
        let excluded = content
            .lines()
            .any(|line| self.unless.iter().any(|re| re.is_match(line)));
        if excluded {
            return 0;
        }
        match self.count {
            CountMode::Files => u64::from(content.lines().any(|line| self.matches(line))),
            CountMode::Lines => content.lines().filter(|line| self.matches(line)).count() as u64,
        }
    }
}

/// The fixed, ordered set of categories a run scans for.
pub struct PatternCatalog {
    categories: Vec<Category>,
}

fn compile_all(category: &str, patterns: &[String]) -> Result<Vec<Regex>, Error> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| Error::InvalidPattern {
                category: category.to_string(),
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

impl PatternCatalog {
    /// Compile pattern configs into regex-based categories, keeping their order.
    pub fn compile(configs: &[PatternConfig]) -> Result<Self, Error> {
        let categories = configs
            .iter()
            .map(|cfg| {
                Ok(Category {
                    name: cfg.name.clone(),
                    languages: cfg.languages.clone(),
                    weight: cfg.weight,
                    count: cfg.count,
                    patterns: compile_all(&cfg.name, &cfg.patterns)?,
                    unless: compile_all(&cfg.name, &cfg.unless)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self { categories })
    }

    /// Category names in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Count every applicable category in one file.
    pub fn scan(&self, language: Language, content: &str) -> ApiUsageCounts {
        let mut usage = ApiUsageCounts::default();
        for category in self.categories.iter().filter(|c| c.applies_to(language)) {
            usage.add(&category.name, category.count_in(content));
        }
        usage
    }
}
