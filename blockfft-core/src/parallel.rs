//! # Parallel Scheduling Module
//!
//! Runs the same block plan as [`BlockScheduler`](crate::scheduler::BlockScheduler)
//! across several worker threads.
//!
//! ## Architecture
//! - **Dispatch**: the main thread carves the spectrum into disjoint per-block
//!   slices and feeds them through a bounded crossbeam channel
//! - **Workers**: each scoped worker owns its own kernel and its own scratch
//!   buffer, so no scratch memory is ever shared
//! - **Placement**: every block writes straight into its own slice, so output
//!   position matches the sequential run even though completion order does not

use std::thread;

use crossbeam_channel::{bounded, Receiver};
use log::debug;

use crate::config::TransformConfig;
use crate::error::{Error, Result};
use crate::kernel::{FftKernel, ScratchBuffer};
use crate::scheduler::{check_scratch, BlockDescriptor, BlockPlan, RunSummary};
use crate::spectrum::SpectrumBuffer;

/// One unit of work: a block and the slices it owns for the duration of the run.
struct BlockJob<'a> {
    block: BlockDescriptor,
    real: &'a mut [f32],
    imag: &'a mut [f32],
}

/// Transforms `spectrum` in place using `config.workers` threads.
///
/// Any kernel error or worker panic fails the whole run. The buffer must
/// then not be consumed.
///
/// # Arguments
/// * `config` - Block size, scratch capacity and worker count
/// * `make_kernel` - Called once per worker to build that worker's kernel
/// * `spectrum` - Real/imaginary buffers, transformed in place
///
/// # Returns
/// * `Ok(summary)` - Same summary the sequential scheduler would produce
/// * `Err(e)` - Configuration, range or kernel failure, or a worker panic
///   reported as `KernelFailure`
pub fn run_parallel<K, F>(
    config: &TransformConfig,
    make_kernel: F,
    spectrum: &mut SpectrumBuffer,
) -> Result<RunSummary>
where
    K: FftKernel,
    F: Fn() -> K + Sync,
{
    config.validate()?;
    let plan = BlockPlan::new(spectrum.len(), config.block_size)?;
    let jobs = split_into_jobs(&plan, spectrum)?;
    let workers = config.workers.min(jobs.len()).max(1);
    debug!("Dispatching {} block(s) to {workers} worker(s)", jobs.len());

    let (sender, receiver) = bounded(workers);
    let make_kernel = &make_kernel;

    let outcomes: Vec<Result<usize>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let receiver = receiver.clone();
                scope.spawn(move || work(worker, config, make_kernel(), receiver))
            })
            .collect();
        drop(receiver);

        for job in jobs {
            // A send only fails once every worker has exited early on an error,
            // which the join below reports.
            if sender.send(job).is_err() {
                break;
            }
        }
        drop(sender);

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::kernel("worker thread panicked")))
            })
            .collect()
    });

    for outcome in outcomes {
        outcome?;
    }

    let summary = RunSummary::from_plan(&plan);
    summary.log();
    Ok(summary)
}

/// Worker loop: transforms jobs until the channel closes. Returns the number handled.
fn work<K: FftKernel>(
    worker: usize,
    config: &TransformConfig,
    mut kernel: K,
    jobs: Receiver<BlockJob<'_>>,
) -> Result<usize> {
    let mut scratch = ScratchBuffer::with_capacity(config.effective_scratch_capacity());
    check_scratch(&kernel, config.block_size, &scratch)?;

    let mut handled = 0;
    for job in jobs.iter() {
        debug!(
            "Worker {worker}: block {} ({:?}) at {}",
            job.block.index, job.block.kind, job.block.offset
        );
        kernel.transform(job.real, job.imag, &mut scratch)?;
        handled += 1;
    }
    Ok(handled)
}

/// Splits the spectrum into one disjoint slice pair per planned block.
fn split_into_jobs<'a>(
    plan: &BlockPlan,
    spectrum: &'a mut SpectrumBuffer,
) -> Result<Vec<BlockJob<'a>>> {
    let total = spectrum.len();
    let (mut real, mut imag) = spectrum.parts_mut();
    let mut consumed = 0;
    let mut jobs = Vec::with_capacity(plan.block_count());

    for block in plan.descriptors() {
        let range = block.range(total)?;
        let skip = range.start - consumed;

        let (_, rest) = std::mem::take(&mut real).split_at_mut(skip);
        let (block_real, rest) = rest.split_at_mut(block.len);
        real = rest;

        let (_, rest) = std::mem::take(&mut imag).split_at_mut(skip);
        let (block_imag, rest) = rest.split_at_mut(block.len);
        imag = rest;

        consumed = range.end;
        jobs.push(BlockJob {
            block,
            real: block_real,
            imag: block_imag,
        });
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::RustFftKernel;
    use crate::scheduler::BlockScheduler;

    fn signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 0.37).sin() + 0.25 * (i as f32 * 1.9).cos())
            .collect()
    }

    #[test]
    fn matches_sequential_placement() {
        let samples = signal(5 * 256 + 70);
        let mut config = TransformConfig::with_block_size(256);

        let mut sequential = SpectrumBuffer::from_samples(samples.clone());
        BlockScheduler::new(&config)
            .unwrap()
            .run(&mut RustFftKernel::new(), &mut sequential)
            .unwrap();

        config.workers = 3;
        let mut parallel = SpectrumBuffer::from_samples(samples);
        let summary = run_parallel(&config, RustFftKernel::new, &mut parallel).unwrap();

        assert_eq!(summary.full_blocks, 5);
        assert_eq!(summary.untransformed, 1344..1350);
        for (i, (a, b)) in sequential.iter().zip(parallel.iter()).enumerate() {
            assert!((a - b).norm() < 1e-4, "index {i}: {a} vs {b}");
        }
    }

    #[test]
    fn tail_is_left_raw() {
        let samples = signal(1500);
        let config = TransformConfig {
            workers: 2,
            ..TransformConfig::default()
        };
        let mut spectrum = SpectrumBuffer::from_samples(samples.clone());
        run_parallel(&config, RustFftKernel::new, &mut spectrum).unwrap();

        assert_eq!(&spectrum.real()[1280..], &samples[1280..]);
        assert!(spectrum.imag()[1280..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn more_workers_than_blocks_is_fine() {
        let config = TransformConfig {
            block_size: 4,
            scratch_capacity: None,
            workers: 16,
        };
        let mut spectrum = SpectrumBuffer::from_samples(vec![1.0; 9]);
        let summary = run_parallel(&config, RustFftKernel::new, &mut spectrum).unwrap();
        assert_eq!(summary.full_blocks, 2);
        assert_eq!(spectrum.real()[0], 4.0);
        assert_eq!(spectrum.real()[4], 4.0);
        assert_eq!(spectrum.real()[8], 1.0);
    }

    #[test]
    fn empty_input_spawns_one_idle_worker() {
        let config = TransformConfig {
            workers: 4,
            ..TransformConfig::default()
        };
        let mut spectrum = SpectrumBuffer::default();
        let summary = run_parallel(&config, RustFftKernel::new, &mut spectrum).unwrap();
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = TransformConfig {
            workers: 0,
            ..TransformConfig::default()
        };
        let mut spectrum = SpectrumBuffer::from_samples(vec![0.0; 16]);
        assert!(matches!(
            run_parallel(&config, RustFftKernel::new, &mut spectrum),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    struct FailingKernel;

    impl FftKernel for FailingKernel {
        fn required_scratch(&self, len: usize) -> usize {
            len
        }

        fn transform(
            &mut self,
            _real: &mut [f32],
            _imag: &mut [f32],
            _scratch: &mut ScratchBuffer,
        ) -> Result<()> {
            Err(Error::kernel("refused"))
        }
    }

    #[test]
    fn kernel_failure_fails_the_run() {
        let config = TransformConfig {
            block_size: 16,
            scratch_capacity: None,
            workers: 2,
        };
        let mut spectrum = SpectrumBuffer::from_samples(vec![0.0; 64]);
        assert_eq!(
            run_parallel(&config, || FailingKernel, &mut spectrum),
            Err(Error::KernelFailure {
                reason: "refused".to_string()
            })
        );
    }

    struct PanickingKernel;

    impl FftKernel for PanickingKernel {
        fn required_scratch(&self, len: usize) -> usize {
            len
        }

        fn transform(
            &mut self,
            _real: &mut [f32],
            _imag: &mut [f32],
            _scratch: &mut ScratchBuffer,
        ) -> Result<()> {
            panic!("kernel blew up");
        }
    }

    #[test]
    fn worker_panic_is_reported_not_propagated() {
        let config = TransformConfig {
            block_size: 16,
            scratch_capacity: None,
            workers: 2,
        };
        let mut spectrum = SpectrumBuffer::from_samples(vec![0.0; 64]);
        assert_eq!(
            run_parallel(&config, || PanickingKernel, &mut spectrum),
            Err(Error::KernelFailure {
                reason: "worker thread panicked".to_string()
            })
        );
    }
}
