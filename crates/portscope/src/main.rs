use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use portscope_core::analyzer::LanguageScanner;
use portscope_core::config::Config;
use portscope_core::pipeline::{AnalysisPipeline, PackageFilter};
use portscope_core::plain::builtin_scanners;

use portscope_cpp::CppScanner;
use portscope_python::PythonScanner;
use portscope_report::{csv, json, text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "portscope")]
#[command(about = "Estimate the effort of porting ROS 1 packages to ROS 2")]
#[command(version)]
struct Cli {
    /// Root of the ROS 1 source tree
    #[arg(required_unless_present = "print_config")]
    source_path: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,

    /// Config file path (defaults to .portscope.toml in the source root or an ancestor)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only report these packages (repeatable)
    #[arg(long, visible_alias = "exclusive", value_name = "NAME")]
    only: Vec<String>,

    /// Leave these packages out (repeatable)
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if cli.print_config {
        print!("{}", Config::default_toml());
        return Ok(());
    }
    let Some(root) = cli.source_path else {
        anyhow::bail!("missing <SOURCE_PATH>");
    };

    let config = load_config(&root, cli.config.as_deref())?;
    let pipeline =
        AnalysisPipeline::new(scanners()?, config).context("failed to prepare analysis")?;
    let filter = PackageFilter {
        only: cli.only,
        exclude: cli.exclude,
    };
    let analysis = pipeline.analyze(&root, &filter)?;

    let report = match cli.format {
        OutputFormat::Csv => csv::format_report(&analysis)?,
        OutputFormat::Json => {
            let mut out = json::format_report(&analysis, cli.compact)?;
            out.push('\n');
            out
        }
        OutputFormat::Text => text::format_report(&analysis),
    };
    print!("{report}");
    Ok(())
}

fn scanners() -> Result<Vec<Box<dyn LanguageScanner>>> {
    let mut scanners: Vec<Box<dyn LanguageScanner>> = vec![
        Box::new(CppScanner::new().context("failed to initialize C++ scanner")?),
        Box::new(PythonScanner::new().context("failed to initialize Python scanner")?),
    ];
    scanners.extend(builtin_scanners());
    Ok(scanners)
}

fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(root)),
    }
}
