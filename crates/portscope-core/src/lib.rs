pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lines;
pub mod locator;
pub mod manifest;
pub mod pipeline;
pub mod plain;
pub mod scanner;
pub mod scoring;
pub mod types;

pub use analyzer::LanguageScanner;
pub use catalog::PatternCatalog;
pub use config::Config;
pub use error::Error;
pub use pipeline::{Analysis, AnalysisPipeline, PackageFilter};
pub use scoring::{score_package, ScoringModel};
pub use types::*;
