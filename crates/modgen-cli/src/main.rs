//! modgen CLI
//!
//! Generates modularization boilerplate for one C header or source file.

use anyhow::{Context, Result};
use clap::Parser;
use modgen_core::config::{Config, StubPolicy};
use modgen_parser::{get_adapter, parse_file, SignatureExtractor};
use modgen_synth::Synthesizer;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modgen")]
#[command(author, version, about = "C modularization boilerplate generator", long_about = None)]
struct Cli {
    /// C header or source file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "build")]
    output: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stub body (zero, abort, empty)
    #[arg(long, value_name = "POLICY")]
    stub_policy: Option<StubPolicy>,

    /// Emit a function-pointer ops table
    #[arg(long)]
    ops_table: bool,

    /// C compiler used as preprocessor
    #[arg(long, value_name = "PATH")]
    cc: Option<PathBuf>,

    /// Include path for the preprocessor
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Macro definition for the preprocessor, NAME or NAME=VALUE
    #[arg(short = 'D', value_name = "MACRO")]
    define: Vec<String>,

    /// Parse the input as written, without running the preprocessor
    #[arg(long)]
    no_cpp: bool,
}

impl Cli {
    /// File configuration with command-line flags applied on top
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(policy) = self.stub_policy {
            config.synthesis.stub_policy = policy;
        }
        if self.ops_table {
            config.synthesis.emit_ops_table = true;
        }
        if let Some(cc) = &self.cc {
            config.preprocessor.compiler = Some(cc.clone());
        }
        if self.no_cpp {
            config.preprocessor.enabled = false;
        }
        config.preprocessor.include_paths.extend(self.include.iter().cloned());
        config.preprocessor.defines.extend(self.define.iter().cloned());

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    debug!("Configuration: {:?}", config);

    let span = info_span!("modgen", input = %cli.input.display());
    let _enter = span.enter();

    let adapter = get_adapter(&config.preprocessor, span.clone())?;
    info!("Parsing {} ({})", cli.input.display(), adapter.name());

    let extractor = SignatureExtractor::new(span.clone());
    let unit = parse_file(adapter.as_ref(), &extractor, &cli.input)
        .with_context(|| format!("failed to process {}", cli.input.display()))?;

    let synthesizer = Synthesizer::new(config.synthesis.clone(), span.clone());
    let record = synthesizer
        .synthesize(&unit, &cli.output)
        .with_context(|| format!("failed to generate into {}", cli.output.display()))?;

    info!(
        "Summary: {} stubs, {} forwards, files: {}",
        record.stubs.len(),
        record.forwards.len(),
        record.files.join(", ")
    );
    Ok(())
}
