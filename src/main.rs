//! Code Sensei CLI - run the analysis service or analyze files locally.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use code_sensei::output::{format_analysis, format_json, AnalysisSummary, OutputFormat};
use code_sensei::rules::language_for_extension;
use code_sensei::{server, AnalysisKind, Analyzer, Assessment, RiskLevel, Scorer, SenseiConfig};

/// Code Sensei - educational code review, bug finding and optimization
#[derive(Parser, Debug)]
#[command(name = "code-sensei")]
#[command(version)]
#[command(about = "Heuristic and AI-assisted code analysis for learners", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP analysis service
    Serve {
        /// Config file (default: nearest code-sensei.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on, overriding config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze files or directories with the heuristic engine only
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Which analysis to run
        #[arg(short, long, value_enum, default_value = "review")]
        kind: KindArg,

        /// Language of every file (default: inferred from extension)
        #[arg(short, long)]
        language: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: OutputFormatArg,

        /// Exit with an error when any file's risk reaches this level
        #[arg(long, value_enum, default_value = "high")]
        fail_on: FailOnArg,

        /// Config file supplying disabled rules
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Review,
    Bugs,
    Optimize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Human-readable colored output
    Pretty,
    /// JSON output for tooling integration
    Json,
    /// Compact one-line-per-finding
    Compact,
    /// Markdown report, as returned by the service
    Markdown,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum FailOnArg {
    High,
    Medium,
    Low,
    Never,
}

impl From<KindArg> for AnalysisKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Review => AnalysisKind::Review,
            KindArg::Bugs => AnalysisKind::Bugs,
            KindArg::Optimize => AnalysisKind::Optimize,
        }
    }
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Pretty => OutputFormat::Pretty,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Compact => OutputFormat::Compact,
            OutputFormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

impl FailOnArg {
    /// Lowest risk that fails the run.
    fn threshold(self) -> Option<RiskLevel> {
        match self {
            FailOnArg::High => Some(RiskLevel::High),
            FailOnArg::Medium => Some(RiskLevel::Medium),
            FailOnArg::Low => Some(RiskLevel::Low),
            FailOnArg::Never => None,
        }
    }

    /// Whether an assessment fails the run. A file without findings never
    /// does, even though its risk is LOW.
    fn fails(self, assessment: &Assessment) -> bool {
        self.threshold().is_some_and(|threshold| {
            assessment.risk.total > 0 && assessment.risk.overall_risk >= threshold
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("code_sensei=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    match Cli::parse().command {
        Command::Serve { config, port } => run_serve(config, port),
        Command::Analyze {
            paths,
            kind,
            language,
            format,
            fail_on,
            config,
        } => run_analyze(paths, kind.into(), language, format.into(), fail_on, config),
    }
}

fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> ExitCode {
    let mut config = match SenseiConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            return ExitCode::from(2);
        }
    };
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(source) = &config.source {
        tracing::info!(path = %source.display(), "Loaded configuration");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: failed to start runtime - {}", "Error".red().bold(), e);
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(server::serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run_analyze(
    paths: Vec<PathBuf>,
    kind: AnalysisKind,
    language: Option<String>,
    format: OutputFormat,
    fail_on: FailOnArg,
    config_path: Option<PathBuf>,
) -> ExitCode {
    let config = match SenseiConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            return ExitCode::from(2);
        }
    };
    let analyzer = Analyzer::with_scorer(Scorer::with_disabled_rules(&config.rules.disabled));

    // Collect all files with a known language
    let files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|path| {
            if path.is_dir() {
                WalkDir::new(path)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| {
                        language.is_some()
                            || e.path()
                                .extension()
                                .and_then(|ext| ext.to_str())
                                .and_then(language_for_extension)
                                .is_some()
                    })
                    .map(|e| e.path().to_path_buf())
                    .collect::<Vec<_>>()
            } else {
                vec![path.clone()]
            }
        })
        .collect();

    if files.is_empty() {
        eprintln!("{}", "No source files found to analyze.".yellow());
        return ExitCode::SUCCESS;
    }

    // Analyze files in parallel
    let mut results: Vec<_> = files
        .par_iter()
        .filter_map(|file| match analyzer.analyze_file(file, kind, language.as_deref()) {
            Ok(result) => Some(result),
            Err(e) => {
                eprintln!("{}: {:#}", "Error".red().bold(), e);
                None
            }
        })
        .collect();
    results.sort_by(|a, b| a.path.cmp(&b.path));

    if format == OutputFormat::Json {
        println!("{}", format_json(&results));
    } else {
        for result in &results {
            print!("{}", format_analysis(result, kind, format));
        }
        let summary = AnalysisSummary::from_results(&results);
        println!();
        if summary.total > 0 {
            println!("{} {}", "Found".bold(), summary.format_pretty());
        } else {
            println!("{}", "✓ No issues found!".green().bold());
        }
    }

    let failed = results.iter().any(|r| fail_on.fails(&r.assessment));

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
