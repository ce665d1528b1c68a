//! Veil CLI: command-line driver for the secrecy analysis.

mod config;

use clap::{Parser as ClapParser, Subcommand};
use config::{ConfigError, OutputFormat, VeilConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use veil_compiler::compiler::error_codes::{all_error_codes, error_doc};
use veil_compiler::diagnostics::{format_compile_error, format_warning, Diagnostic};
use veil_compiler::{analyze, AnalysisOptions, WarningMode};

const DEFAULT_LOG_FILTER: &str = "veil_compiler=warn,veil_cli=info";
const VERBOSE_LOG_FILTER: &str = "veil_compiler=debug,veil_cli=debug";

// ANSI color helpers
fn green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}
fn gray(s: &str) -> String {
    format!("\x1b[90m{}\x1b[0m", s)
}

#[derive(ClapParser)]
#[command(name = "veil", version, about = "Secrecy analysis for privacy-preserving contracts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run access analysis over a compact JSON AST
    Check {
        /// Path to the JSON AST
        #[arg()]
        file: PathBuf,

        /// Contract source the AST was produced from, for snippets
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output format (overrides veil.toml)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Fail when any warning is raised
        #[arg(long)]
        deny_warnings: bool,

        /// Do not color diagnostics
        #[arg(long)]
        no_color: bool,

        /// Explicit config file instead of searching for veil.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log analysis details
        #[arg(short, long)]
        verbose: bool,
    },
    /// Describe an error or warning code
    Explain {
        /// Code such as E0701, or "all" to list every code
        #[arg()]
        code: String,
    },
    /// Write a default veil.toml into the current directory
    Init,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("cannot encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Outcome of a command that ran to completion.
enum Status {
    Clean,
    Failed,
}

struct CheckArgs {
    file: PathBuf,
    source: Option<PathBuf>,
    format: Option<OutputFormat>,
    deny_warnings: bool,
    no_color: bool,
    config: Option<PathBuf>,
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check { file, source, format, deny_warnings, no_color, config, verbose } => {
            cmd_check(CheckArgs { file, source, format, deny_warnings, no_color, config, verbose })
        }
        Commands::Explain { code } => Ok(cmd_explain(&code)),
        Commands::Init => cmd_init(),
    };
    match result {
        Ok(Status::Clean) => ExitCode::SUCCESS,
        Ok(Status::Failed) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Install the log subscriber. `RUST_LOG` wins over `-v`, which wins over the
/// config file.
fn init_logging(verbose: bool, config_level: Option<&str>) {
    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        config_level.unwrap_or(DEFAULT_LOG_FILTER)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<(Option<PathBuf>, VeilConfig), ConfigError> {
    match explicit {
        Some(path) => Ok((Some(path.to_path_buf()), VeilConfig::load_from(path)?)),
        None => VeilConfig::load(),
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn print_diagnostics(diagnostics: &[Diagnostic], color: bool) {
    for diag in diagnostics {
        if color {
            eprint!("{}", diag.render_ansi());
        } else {
            eprint!("{}", diag.render_plain());
        }
    }
}

fn cmd_check(args: CheckArgs) -> Result<Status, CliError> {
    let (config_path, config) = load_config(args.config.as_deref())?;
    init_logging(args.verbose, config.log_level.as_deref());
    if let Some(path) = &config_path {
        debug!("using config {}", path.display());
    }

    let json = read_file(&args.file)?;
    let source = args.source.as_deref().map(read_file).transpose()?;
    let filename = args
        .source
        .as_ref()
        .unwrap_or(&args.file)
        .display()
        .to_string();

    let warning_mode = if args.deny_warnings {
        WarningMode::Deny
    } else {
        config.analysis.warnings
    };
    let format = args.format.unwrap_or(config.output.format);
    let color = config.output.color && !args.no_color;
    let options = AnalysisOptions { warning_mode };

    info!("checking {}", args.file.display());
    let analysis = match analyze(&json, source.as_deref(), &options) {
        Ok(a) => a,
        Err(e) => {
            print_diagnostics(&format_compile_error(&e, source.as_deref(), &filename), color);
            return Ok(Status::Failed);
        }
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis.report())?);
        }
        OutputFormat::Text => {
            let diagnostics: Vec<Diagnostic> = analysis
                .warnings
                .iter()
                .map(|w| format_warning(w, source.as_deref(), &filename))
                .collect();
            print_diagnostics(&diagnostics, color);
            let accessed = analysis.symbols.bindings.values().filter(|b| b.is_accessed).count();
            let summary = format!(
                "({} warning(s), {} secret state(s) accessed)",
                analysis.warnings.len(),
                accessed
            );
            if color {
                println!("{} {} {}", green("✓"), bold(&filename), gray(&summary));
            } else {
                println!("ok {} {}", filename, summary);
            }
        }
    }
    Ok(Status::Clean)
}

fn cmd_explain(code: &str) -> Status {
    if code.eq_ignore_ascii_case("all") {
        for (code, doc) in all_error_codes() {
            println!("{}  {}", code, doc);
        }
        return Status::Clean;
    }
    let code = code.to_ascii_uppercase();
    let doc = error_doc(&code);
    if doc == error_doc("") {
        eprintln!("error: unknown code '{}'", code);
        return Status::Failed;
    }
    println!("{}: {}", code, doc);
    Status::Clean
}

fn cmd_init() -> Result<Status, CliError> {
    let path = PathBuf::from(config::CONFIG_FILE);
    if path.exists() {
        return Err(CliError::AlreadyExists(path));
    }
    std::fs::write(&path, VeilConfig::default_template())
        .map_err(|source| CliError::Write { path: path.clone(), source })?;
    println!("created {}", path.display());
    Ok(Status::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_flags_parse() {
        let cli = Cli::try_parse_from([
            "veil", "check", "ast.json", "--source", "Token.sol", "--format", "json",
            "--deny-warnings", "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Check { file, source, format, deny_warnings, verbose, no_color, config } => {
                assert_eq!(file, PathBuf::from("ast.json"));
                assert_eq!(source, Some(PathBuf::from("Token.sol")));
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(deny_warnings && verbose);
                assert!(!no_color);
                assert!(config.is_none());
            }
            _ => panic!("expected the check command"),
        }
    }

    #[test]
    fn explain_known_and_unknown_codes() {
        assert!(matches!(cmd_explain("e0701"), Status::Clean));
        assert!(matches!(cmd_explain("E9999"), Status::Failed));
    }
}
