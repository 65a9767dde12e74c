use std::ops::Range;

use rustfft::num_complex::Complex;

use crate::source::Samples;

/// Split real/imaginary output arrays, co-indexed with the input samples.
///
/// The real part starts out as the samples themselves and the imaginary
/// part as zeros; the scheduler then transforms both in place block by block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectrumBuffer {
    real: Vec<f32>,
    imag: Vec<f32>,
}

impl SpectrumBuffer {
    /// Takes ownership of the samples and reuses them as the real part.
    pub fn from_samples(samples: Vec<f32>) -> Self {
        let imag = vec![0.0; samples.len()];
        Self {
            real: samples,
            imag,
        }
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn real(&self) -> &[f32] {
        &self.real
    }

    pub fn imag(&self) -> &[f32] {
        &self.imag
    }

    /// The value at `index` as a complex number.
    pub fn get(&self, index: usize) -> Option<Complex<f32>> {
        Some(Complex::new(*self.real.get(index)?, *self.imag.get(index)?))
    }

    /// Mutable real/imaginary slices for one block. `range` must be in bounds.
    pub(crate) fn block_mut(&mut self, range: Range<usize>) -> (&mut [f32], &mut [f32]) {
        (&mut self.real[range.clone()], &mut self.imag[range])
    }

    /// Both parts as mutable slices, for splitting across workers.
    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.real, &mut self.imag)
    }

    pub fn iter(&self) -> impl Iterator<Item = Complex<f32>> + '_ {
        self.real
            .iter()
            .zip(self.imag.iter())
            .map(|(&re, &im)| Complex::new(re, im))
    }
}

impl From<Samples> for SpectrumBuffer {
    fn from(samples: Samples) -> Self {
        Self::from_samples(samples.data)
    }
}
