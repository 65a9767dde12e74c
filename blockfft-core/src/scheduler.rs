//! # Block Transform Scheduler
//!
//! Partitions `N` samples into fixed-size transform blocks and drives the
//! FFT kernel over each one.
//!
//! ## Partitioning
//! 1. `floor(N / B)` full blocks of exactly `B` samples, issued in strictly
//!    increasing offset order. Frame `i` covers `[i·B, (i+1)·B)`.
//! 2. If `R = N mod B` is non-zero, one remainder block starting at `N − R`
//!    whose length is the largest power of four `P ≤ R`.
//!
//! Samples in `[N − R + P, N)` are never transformed: their real part stays
//! the original sample and their imaginary part stays zero. The tail is
//! neither padded nor folded into the remainder block, and consumers may
//! rely on that boundary.

use std::ops::Range;

use log::{debug, info, warn};

use crate::config::TransformConfig;
use crate::error::{Error, Result};
use crate::kernel::{FftKernel, ScratchBuffer};
use crate::spectrum::SpectrumBuffer;

/// Finds the largest power of four that fits in a trailing partial block.
///
/// This sizes the remainder window. Whatever lies past the returned length
/// is left untransformed. For any `r >= 1` the result `p` satisfies
/// `p <= r < 4p`.
///
/// # Arguments
/// * `samples` - Number of leftover samples after the full blocks
///
/// # Returns
/// * `Some(p)` - The largest power of four not exceeding `samples`
/// * `None` - `samples` is zero, so there is no remainder block
pub fn largest_power_of_four(samples: usize) -> Option<usize> {
    if samples == 0 {
        return None;
    }
    let mut power = 1usize;
    while let Some(next) = power.checked_mul(4) {
        if next > samples {
            break;
        }
        power = next;
    }
    Some(power)
}

/// Which phase of the schedule a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A full block of the configured size.
    Full,
    /// The power-of-four window over the trailing partial block.
    Remainder,
}

/// One contiguous window of the sample buffer to transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Position in issue order.
    pub index: usize,
    pub offset: usize,
    pub len: usize,
    pub kind: BlockKind,
}

impl BlockDescriptor {
    /// The sample range this block covers, checked against `total`.
    pub fn range(&self, total: usize) -> Result<Range<usize>> {
        match self.offset.checked_add(self.len) {
            Some(end) if end <= total => Ok(self.offset..end),
            _ => Err(Error::OutOfRange {
                offset: self.offset,
                len: self.len,
                total,
            }),
        }
    }
}

/// The full schedule for `total` samples at a given block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    pub total: usize,
    pub block_size: usize,
    pub full_blocks: usize,
    pub remainder: Option<BlockDescriptor>,
}

impl BlockPlan {
    /// Computes the schedule. Fails if `block_size` is not a positive power of two.
    pub fn new(total: usize, block_size: usize) -> Result<Self> {
        if !block_size.is_power_of_two() {
            return Err(Error::invalid_config(format!(
                "block size {block_size} is not a positive power of two"
            )));
        }

        let full_blocks = total / block_size;
        let leftover = total % block_size;
        let remainder = largest_power_of_four(leftover).map(|len| BlockDescriptor {
            index: full_blocks,
            offset: total - leftover,
            len,
            kind: BlockKind::Remainder,
        });

        Ok(Self {
            total,
            block_size,
            full_blocks,
            remainder,
        })
    }

    /// Every block in issue order: full blocks by increasing offset, then the remainder.
    pub fn descriptors(&self) -> impl Iterator<Item = BlockDescriptor> + '_ {
        (0..self.full_blocks)
            .map(|index| BlockDescriptor {
                index,
                offset: index * self.block_size,
                len: self.block_size,
                kind: BlockKind::Full,
            })
            .chain(self.remainder)
    }

    /// Number of kernel invocations the plan issues.
    pub fn block_count(&self) -> usize {
        self.full_blocks + usize::from(self.remainder.is_some())
    }

    /// Samples left raw after the remainder block.
    pub fn untransformed(&self) -> Range<usize> {
        match self.remainder {
            Some(block) => block.offset + block.len..self.total,
            None => self.total..self.total,
        }
    }
}

/// What a completed run covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub full_blocks: usize,
    pub remainder: Option<BlockDescriptor>,
    /// Trailing samples that were left untransformed.
    pub untransformed: Range<usize>,
}

impl RunSummary {
    pub(crate) fn from_plan(plan: &BlockPlan) -> Self {
        Self {
            total: plan.total,
            full_blocks: plan.full_blocks,
            remainder: plan.remainder,
            untransformed: plan.untransformed(),
        }
    }

    /// Whether the value at `index` is spectral output rather than a raw sample.
    pub fn is_transformed(&self, index: usize) -> bool {
        index < self.untransformed.start
    }

    pub(crate) fn log(&self) {
        info!(
            "Transformed {} full block(s) and {} remainder block(s) over {} samples",
            self.full_blocks,
            usize::from(self.remainder.is_some()),
            self.total
        );
        if !self.untransformed.is_empty() {
            warn!(
                "Samples [{}, {}) lie beyond the power-of-four remainder window and were left untransformed",
                self.untransformed.start, self.untransformed.end
            );
        }
    }
}

/// Sequential scheduler owning the one scratch buffer reused by every block.
#[derive(Debug)]
pub struct BlockScheduler {
    block_size: usize,
    scratch: ScratchBuffer,
}

impl BlockScheduler {
    /// Validates the configuration and allocates the scratch buffer.
    pub fn new(config: &TransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
            scratch: ScratchBuffer::with_capacity(config.effective_scratch_capacity()),
        })
    }

    pub fn plan(&self, total: usize) -> Result<BlockPlan> {
        BlockPlan::new(total, self.block_size)
    }

    /// Transforms `spectrum` in place, block by block.
    ///
    /// This function:
    /// 1. Checks that the kernel fits in the scheduler's scratch buffer
    /// 2. Plans the full blocks and the power-of-four remainder window
    /// 3. Invokes the kernel once per block, in increasing offset order
    ///
    /// # Arguments
    /// * `kernel` - FFT kernel invoked once per block
    /// * `spectrum` - Real/imaginary buffers, transformed in place
    ///
    /// # Returns
    /// * `Ok(summary)` - What was transformed and which tail was left raw
    /// * `Err(e)` - Configuration, range or kernel failure. The buffer may
    ///   then be partially transformed and must not be consumed.
    pub fn run<K: FftKernel>(
        &mut self,
        kernel: &mut K,
        spectrum: &mut SpectrumBuffer,
    ) -> Result<RunSummary> {
        check_scratch(kernel, self.block_size, &self.scratch)?;

        let plan = self.plan(spectrum.len())?;
        debug!(
            "Planned {} block(s) of up to {} samples over {} samples",
            plan.block_count(),
            plan.block_size,
            plan.total
        );

        for block in plan.descriptors() {
            let range = block.range(spectrum.len())?;
            debug!("Block {} ({:?}): [{}, {})", block.index, block.kind, range.start, range.end);
            let (real, imag) = spectrum.block_mut(range);
            kernel.transform(real, imag, &mut self.scratch)?;
        }

        let summary = RunSummary::from_plan(&plan);
        summary.log();
        Ok(summary)
    }
}

/// Fails if `kernel` needs more scratch for a full block than `scratch` holds.
pub(crate) fn check_scratch<K: FftKernel>(
    kernel: &K,
    block_size: usize,
    scratch: &ScratchBuffer,
) -> Result<()> {
    let required = kernel.required_scratch(block_size);
    if required > scratch.capacity() {
        return Err(Error::invalid_config(format!(
            "kernel needs {required} scratch slots for block size {block_size}, only {} configured",
            scratch.capacity()
        )));
    }
    Ok(())
}
