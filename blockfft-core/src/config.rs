//! # Transform Configuration Module
//!
//! Settings shared by the sequential and parallel schedulers. The
//! configuration can be built in code, loaded from a JSON file, or both
//! (load, then override individual fields).
//!
//! ## Defaults
//! - Block size: 1024 samples. Larger blocks give finer frequency
//!   resolution but make each kernel call heavier.
//! - Scratch capacity: `4 × block_size` real-valued slots, which is what
//!   the bundled kernel needs for a full block.
//! - Workers: 1 (sequential).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kernel::SCRATCH_SLOTS_PER_SAMPLE;

/// Default number of samples per full transform block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Parameters for one scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Samples per full block. Must be a positive power of two.
    pub block_size: usize,
    /// Scratch capacity in real-valued slots. `None` sizes it from the block size.
    pub scratch_capacity: Option<usize>,
    /// Number of worker threads, each with its own scratch buffer.
    pub workers: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            scratch_capacity: None,
            workers: 1,
        }
    }
}

impl TransformConfig {
    /// Creates a sequential configuration with the given block size.
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::invalid_config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Scratch capacity actually allocated, in real-valued slots.
    pub fn effective_scratch_capacity(&self) -> usize {
        self.scratch_capacity
            .unwrap_or_else(|| self.block_size.saturating_mul(SCRATCH_SLOTS_PER_SAMPLE))
    }

    /// Checks the block size and scratch sizing without allocating anything.
    pub fn validate(&self) -> Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(Error::invalid_config(format!(
                "block size {} is not a positive power of two",
                self.block_size
            )));
        }
        let capacity = self.effective_scratch_capacity();
        if self.block_size > capacity {
            return Err(Error::invalid_config(format!(
                "block size {} exceeds scratch capacity {capacity}",
                self.block_size
            )));
        }
        if self.workers == 0 {
            return Err(Error::invalid_config("at least one worker is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_kernel_contract() {
        let config = TransformConfig::default();
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.effective_scratch_capacity(), 4 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_block() {
        for block_size in [0, 3, 1000] {
            let err = TransformConfig::with_block_size(block_size)
                .validate()
                .unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration { .. }));
        }
    }

    #[test]
    fn rejects_block_larger_than_scratch() {
        let config = TransformConfig {
            block_size: 1024,
            scratch_capacity: Some(512),
            workers: 1,
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_zero_workers() {
        let config = TransformConfig {
            workers: 0,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TransformConfig = serde_json::from_str(r#"{ "block_size": 256 }"#).unwrap();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.workers, 1);
        assert_eq!(config.effective_scratch_capacity(), 1024);
    }
}
