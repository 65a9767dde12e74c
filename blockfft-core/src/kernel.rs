//! # FFT Kernel Module
//!
//! The in-place complex FFT primitive the scheduler drives once per block,
//! together with the scratch memory it works in.
//!
//! ## Scratch contract
//! A transform of length `L` needs `4 × L` real-valued scratch slots. The
//! scratch is held as `2 × L` complex slots: the first `L` carry the packed
//! real/imaginary working buffer, the remainder is handed to RustFFT as its
//! in-place scratch. Whoever picks a block size must allocate scratch for
//! it accordingly (see [`crate::config::TransformConfig`]).

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Error, Result};

/// Real-valued scratch slots required per transformed sample.
pub const SCRATCH_SLOTS_PER_SAMPLE: usize = 4;

/// Reusable working memory for kernel calls.
///
/// Contents are meaningless outside a single [`FftKernel::transform`] call
/// and are overwritten by every call.
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    slots: Vec<Complex<f32>>,
}

impl ScratchBuffer {
    /// Allocates scratch holding at least `real_slots` real values.
    pub fn with_capacity(real_slots: usize) -> Self {
        Self {
            slots: vec![Complex::new(0.0, 0.0); real_slots.div_ceil(2)],
        }
    }

    /// Capacity in real-valued slots.
    pub fn capacity(&self) -> usize {
        self.slots.len() * 2
    }

    /// The scratch viewed as complex slots.
    pub fn as_complex_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.slots
    }
}

/// An in-place complex FFT over split real/imaginary arrays.
pub trait FftKernel {
    /// Real-valued scratch slots needed to transform `len` samples.
    fn required_scratch(&self, len: usize) -> usize;

    /// Computes a forward complex FFT of `real`/`imag` in place.
    ///
    /// The transform length is `real.len()`. The scratch contents are
    /// overwritten and carry no meaning after the call returns.
    ///
    /// # Arguments
    /// * `real` - Real parts, replaced by the spectrum's real parts
    /// * `imag` - Imaginary parts, same length as `real`
    /// * `scratch` - Working memory of at least `required_scratch(real.len())` slots
    ///
    /// # Returns
    /// * `Err(Error::KernelFailure)` - Mismatched lengths, unsupported length
    ///   or undersized scratch
    fn transform(
        &mut self,
        real: &mut [f32],
        imag: &mut [f32],
        scratch: &mut ScratchBuffer,
    ) -> Result<()>;
}

/// Forward, unnormalised FFT backed by RustFFT.
///
/// Plans are cached by the planner, so repeated transforms of the same
/// length only pay for planning once.
pub struct RustFftKernel {
    planner: FftPlanner<f32>,
}

impl RustFftKernel {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
}

impl Default for RustFftKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl FftKernel for RustFftKernel {
    fn required_scratch(&self, len: usize) -> usize {
        len.saturating_mul(SCRATCH_SLOTS_PER_SAMPLE)
    }

    fn transform(
        &mut self,
        real: &mut [f32],
        imag: &mut [f32],
        scratch: &mut ScratchBuffer,
    ) -> Result<()> {
        let len = real.len();
        if imag.len() != len {
            return Err(Error::kernel(format!(
                "real part has {len} samples but imaginary part has {}",
                imag.len()
            )));
        }
        if !len.is_power_of_two() {
            return Err(Error::kernel(format!(
                "unsupported transform length {len}"
            )));
        }

        let fft = self.planner.plan_fft_forward(len);
        let fft_scratch_len = fft.get_inplace_scratch_len();
        let slots = scratch.as_complex_mut();
        if slots.len() < len + fft_scratch_len {
            return Err(Error::kernel(format!(
                "scratch holds {} complex slots, length {len} needs {}",
                slots.len(),
                len + fft_scratch_len
            )));
        }

        let (work, rest) = slots.split_at_mut(len);
        for ((slot, &re), &im) in work.iter_mut().zip(real.iter()).zip(imag.iter()) {
            *slot = Complex::new(re, im);
        }

        fft.process_with_scratch(work, &mut rest[..fft_scratch_len]);

        for ((slot, re), im) in work.iter().zip(real.iter_mut()).zip(imag.iter_mut()) {
            *re = slot.re;
            *im = slot.im;
        }
        Ok(())
    }
}
