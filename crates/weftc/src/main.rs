//! Weft Compiler - semantic checker and graph assembler for Weft programs
//!
//! Usage: weftc [OPTIONS] <input> [--emit module] [-o <output>]

use anyhow::Context as _;
use clap::{Parser as ClapParser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weft_compiler::common::{CompileError, DiagnosticReporter};
use weft_compiler::driver::{Pipeline, PipelineConfig, channels_from_json};

/// What to produce after analysis
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Emit {
    /// Report diagnostics only
    #[default]
    Check,
    /// Assembled module as JSON
    Module,
}

#[derive(ClapParser, Debug)]
#[command(name = "weftc")]
#[command(author = "Weft Team")]
#[command(version)]
#[command(about = "Semantic checker and graph assembler for Weft programs", long_about = None)]
struct Args {
    /// Input source file (.weft)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file for the module JSON (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file mapping channel names to element types ({"sensor": "f64"})
    #[arg(long, value_name = "FILE")]
    channels: Option<PathBuf>,

    /// Output kind (check or module)
    #[arg(long, value_enum, default_value = "check")]
    emit: Emit,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump the scope tree after analysis (for debugging)
    #[arg(long)]
    dump_symbols: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    let config = PipelineConfig {
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_symbols: args.dump_symbols,
    };
    let mut pipeline = Pipeline::new(config);

    if let Some(path) = &args.channels {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let resolver = channels_from_json(&json)
            .with_context(|| format!("invalid channel file {}", path.display()))?;
        pipeline = pipeline.with_resolver(Arc::new(resolver));
    }

    let (program, analysis) = match pipeline.check(&source) {
        Ok(checked) => checked,
        Err(err) => {
            reporter.report_error(file_id, &err);
            return Err(err.into());
        }
    };

    for diagnostic in &analysis.diagnostics {
        reporter.report_diagnostic(file_id, diagnostic);
    }
    if analysis.diagnostics.has_errors() {
        let count = analysis.diagnostics.iter().filter(|d| d.is_error()).count();
        return Err(CompileError::semantic(count).into());
    }

    match args.emit {
        Emit::Check => {
            info!("{filename}: no errors");
        }
        Emit::Module => {
            let module = pipeline.assemble(&source, &program, &analysis)?;
            let json = module.to_json()?;
            match &args.output {
                Some(path) => {
                    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
                    if args.verbose {
                        info!("wrote module to {}", path.display());
                    }
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}
