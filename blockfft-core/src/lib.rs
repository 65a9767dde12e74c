// blockfft-core/src/lib.rs

//! The core logic for block-wise spectral analysis of audio.
//! This crate is responsible for decoding samples, partitioning them into
//! fixed-size transform blocks, driving the FFT kernel over each block and
//! handing the resulting spectrum to a sink. It is completely headless
//! and contains no command-line code.

pub mod config;
pub mod error;
pub mod kernel;
pub mod parallel;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod spectrum;

pub use config::TransformConfig;
pub use error::{Error, Result};
pub use kernel::{FftKernel, RustFftKernel, ScratchBuffer};
pub use scheduler::{BlockDescriptor, BlockKind, BlockPlan, BlockScheduler, RunSummary};
pub use spectrum::SpectrumBuffer;
