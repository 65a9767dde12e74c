//! # blockfft - Block FFT Analysis CLI
//!
//! Reads a WAV file, transforms it block by block and prints the complex
//! spectrum, one value per input sample.
//!
//! ## Pipeline
//! - **Source**: `WavSource` decodes the file to mono samples
//! - **Scheduler**: sequential, or parallel with one scratch buffer per worker
//! - **Sink**: `a + bi` text lines or a JSON array, to stdout or a file
//!
//! Diagnostics go to stderr through `env_logger` (`RUST_LOG`, default `info`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use blockfft_core::{
    parallel::run_parallel,
    sink::{self, JsonSink, ResultSink, TextSink},
    source::{SampleSource, WavSource},
    BlockScheduler, RustFftKernel, SpectrumBuffer, TransformConfig,
};
use clap::{Parser, ValueEnum};
use log::info;

/// Output notation for the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `re + im i` lines
    Text,
    /// One JSON array of points
    Json,
}

/// Block FFT analysis of a WAV file
#[derive(Debug, Parser)]
#[command(name = "blockfft", version)]
struct Cli {
    /// WAV file to analyse
    input: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Samples per full block (power of two)
    #[arg(long)]
    block_size: Option<usize>,

    /// Scratch capacity in real-valued slots
    #[arg(long)]
    scratch_capacity: Option<usize>,

    /// Worker threads, each with its own scratch buffer
    #[arg(long)]
    workers: Option<usize>,

    /// Output notation
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the spectrum here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file, if any, then applies flag overrides.
    fn transform_config(&self) -> Result<TransformConfig> {
        let mut config = match &self.config {
            Some(path) => TransformConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TransformConfig::default(),
        };
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
            // A scratch size sized for the old block would be stale.
            if self.scratch_capacity.is_none() {
                config.scratch_capacity = None;
            }
        }
        if let Some(capacity) = self.scratch_capacity {
            config.scratch_capacity = Some(capacity);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate().context("invalid transform configuration")?;
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.transform_config()?;
    info!(
        "Block size {}, scratch {} slots, {} worker(s)",
        config.block_size,
        config.effective_scratch_capacity(),
        config.workers
    );

    let input = cli.input.to_string_lossy();
    let samples = WavSource
        .provide(&input)
        .with_context(|| format!("reading {input}"))?;

    let mut spectrum = SpectrumBuffer::from(samples);
    let outcome = if config.workers > 1 {
        run_parallel(&config, RustFftKernel::new, &mut spectrum)
    } else {
        BlockScheduler::new(&config)
            .and_then(|mut scheduler| scheduler.run(&mut RustFftKernel::new(), &mut spectrum))
    };
    let summary = outcome.context("block transform failed")?;

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut out: Box<dyn ResultSink> = match cli.format {
        OutputFormat::Text => Box::new(TextSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    };
    sink::emit(&spectrum, &summary, out.as_mut()).context("writing spectrum")?;

    Ok(())
}
