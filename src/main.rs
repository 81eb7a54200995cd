//! devloop Command Line Interface
//!
//! Usage:
//!   devloop [OPTIONS] <input-file>
//!   devloop --help
//!
//! Examples:
//!   devloop addVectors.okl                   # Check loops, print a report
//!   devloop --batch kernels.okl              # Report every malformed loop
//!   devloop --emit=json --flat-index=tid k.okl
//!   devloop --emit=ast addVectors.okl        # Just parse and print the source back

use clap::{Parser, ValueEnum};
use devloop::utils::location::SourceMap;
use devloop::utils::pretty::SourcePrinter;
use devloop::{CheckConfig, CheckMode, CheckReport};
use std::path::PathBuf;
use std::fs;
use std::fmt::Write as _;
use std::process::ExitCode;
use anyhow::{Result, Context};
use log::{info, debug, error};

/// devloop - device loop validation for kernel languages
#[derive(Parser, Debug)]
#[command(name = "devloop")]
#[command(version)]
#[command(about = "Validates @outer/@inner kernel loops and synthesizes their iteration arithmetic", long_about = None)]
struct Cli {
    /// Kernel source file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Label prefixed to every loop error
    #[arg(long, value_name = "LABEL")]
    label: Option<String>,

    /// Report every malformed loop instead of stopping at the first
    #[arg(long)]
    batch: bool,

    /// Name of the flat index in synthesized expressions
    #[arg(long, value_name = "NAME", default_value = "flat_idx")]
    flat_index: String,

    /// What to emit
    #[arg(long, default_value = "report")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (no diagnostics on stderr)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Human-readable loop report
    Report,
    /// Loop report as JSON
    Json,
    /// Parsed source, printed back
    Ast,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("devloop v{}", devloop::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;

    info!("Parsing...");
    let mut program = devloop::parse(&source)
        .with_context(|| "Failed to parse input")?;

    if matches!(cli.emit, EmitKind::Ast) {
        let output = SourcePrinter::new(&program.vars).print_program(&program);
        write_output(&cli.output, &output)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = build_config(&cli);
    debug!("Check config: {:?}", config);

    info!("Checking loops...");
    let report = devloop::check_program(&mut program, &config);

    if !cli.quiet {
        let map = SourceMap::new(source.as_str());
        for diagnostic in &report.diagnostics {
            eprintln!("{}\n", diagnostic.render(&map));
        }
    }

    let output = match cli.emit {
        EmitKind::Json => serde_json::to_string_pretty(&report)
            .context("Failed to serialize report")?,
        _ => render_report(&report),
    };
    write_output(&cli.output, &output)?;

    if report.ok {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("{} malformed loop(s)", report.errors.len());
        Ok(ExitCode::FAILURE)
    }
}

fn build_config(cli: &Cli) -> CheckConfig {
    let mut config = CheckConfig::default()
        .with_flat_index_name(cli.flat_index.clone());

    if cli.batch {
        config.mode = CheckMode::Batch;
    }
    if let Some(ref label) = cli.label {
        config.source_label = label.clone();
    }
    config
}

fn render_report(report: &CheckReport) -> String {
    let mut out = String::new();
    for l in &report.loops {
        let dim = l.dim.map(|d| format!("({})", d)).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}:{} {}{} {}{}",
            l.kernel,
            l.line,
            l.attribute,
            dim,
            "  ".repeat(l.depth),
            l.iterator,
        );
        let _ = writeln!(out, "    trip count:     {}", l.trip_count);
        let _ = writeln!(out, "    value at index: {}", l.value_at_flat_index);
    }
    let _ = write!(
        out,
        "{} loop(s) accepted, {} error(s)",
        report.loops.len(),
        report.errors.len()
    );
    out
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
