//! Slice-parallel execution of bake stages.
//!
//! Every stage splits its output into disjoint rows or depth slices. The
//! executor hands those slices to a pool of scoped worker threads through a
//! bounded channel and returns once every slice has been written, so the next
//! stage always sees a fully materialized input.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded};
use tracing::{debug, warn};

/// Thread name of bake workers.
pub const WORKER_THREAD_NAME: &str = "atmosphere-bake-worker";

/// Runs per-slice jobs serially or on a pool of worker threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BakeExecutor {
    /// Number of worker threads. Zero runs every job on the calling thread.
    threads: usize,
}

impl Default for BakeExecutor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BakeExecutor {
    /// Run every job on the calling thread.
    pub fn serial() -> Self {
        Self { threads: 0 }
    }

    /// Use `threads` worker threads. `0` is equivalent to [`BakeExecutor::serial`].
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    /// A worker count based on CPU cores, leaving headroom for the rest of the system.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        let threads = (cpus - 2).max(1);
        Self::new(threads)
    }

    pub fn thread_count(&self) -> usize {
        self.threads
    }

    pub fn is_parallel(&self) -> bool {
        self.threads > 0
    }

    /// Apply `job` to every item, returning once all items are processed.
    ///
    /// Items must own or exclusively borrow the data they write. The result does
    /// not depend on the number of workers.
    pub fn for_each<T, I, F>(&self, stage: &str, items: I, job: F)
    where
        T: Send,
        I: IntoIterator<Item = T>,
        F: Fn(T) + Sync,
    {
        if self.threads == 0 {
            run_serial(stage, items, &job);
            return;
        }

        std::thread::scope(|scope| {
            let (task_sender, task_receiver) = bounded::<(usize, T)>(self.threads * 2);
            let (done_sender, done_receiver) = unbounded::<(usize, Duration)>();

            let mut spawned = 0;
            for _ in 0..self.threads {
                let receiver = task_receiver.clone();
                let sender = done_sender.clone();
                let job = &job;
                let spawn = std::thread::Builder::new()
                    .name(WORKER_THREAD_NAME.into())
                    .spawn_scoped(scope, move || {
                        while let Ok((index, item)) = receiver.recv() {
                            let start = Instant::now();
                            job(item);
                            if sender.send((index, start.elapsed())).is_err() {
                                break;
                            }
                        }
                    });
                match spawn {
                    Ok(_) => spawned += 1,
                    Err(err) => warn!(stage, error = %err, "failed to spawn bake worker"),
                }
            }
            drop(task_receiver);
            drop(done_sender);

            if spawned == 0 {
                warn!(stage, "no bake workers available, running on the calling thread");
                run_serial(stage, items, &job);
                return;
            }

            for (index, item) in items.into_iter().enumerate() {
                // Only fails once every worker has exited.
                if let Err(err) = task_sender.send((index, item)) {
                    let (index, item) = err.into_inner();
                    let start = Instant::now();
                    job(item);
                    log_slice(stage, index, start.elapsed());
                }
            }
            drop(task_sender);

            for (index, elapsed) in done_receiver.iter() {
                log_slice(stage, index, elapsed);
            }
        });
    }
}

fn run_serial<T, I, F>(stage: &str, items: I, job: &F)
where
    I: IntoIterator<Item = T>,
    F: Fn(T),
{
    for (index, item) in items.into_iter().enumerate() {
        let start = Instant::now();
        job(item);
        log_slice(stage, index, start.elapsed());
    }
}

fn log_slice(stage: &str, index: usize, elapsed: Duration) {
    debug!(
        stage,
        slice = index,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "slice finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(executor: &BakeExecutor) -> Vec<u64> {
        let mut data = vec![0u64; 64 * 16];
        executor.for_each("test", data.chunks_mut(16).enumerate(), |(i, chunk)| {
            for (j, value) in chunk.iter_mut().enumerate() {
                *value = (i * 1000 + j) as u64;
            }
        });
        data
    }

    #[test]
    fn test_serial_fills_every_slice() {
        let data = fill(&BakeExecutor::serial());
        assert_eq!(data[0], 0);
        assert_eq!(data[16 * 63 + 15], 63_015);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let serial = fill(&BakeExecutor::serial());
        for threads in [1, 3, 8] {
            assert_eq!(fill(&BakeExecutor::new(threads)), serial, "threads = {threads}");
        }
    }

    #[test]
    fn test_workers_are_named() {
        let executor = BakeExecutor::new(2);
        let names = std::sync::Mutex::new(Vec::new());
        executor.for_each("names", 0..8, |_| {
            let name = std::thread::current().name().map(str::to_owned);
            if let Ok(mut names) = names.lock() {
                names.push(name);
            }
        });
        let names = names.into_inner().unwrap();
        assert_eq!(names.len(), 8);
        assert!(
            names
                .iter()
                .all(|n| n.as_deref() == Some(WORKER_THREAD_NAME))
        );
    }

    #[test]
    fn test_default_thread_count_is_positive() {
        let executor = BakeExecutor::with_defaults();
        assert!(executor.thread_count() >= 1);
        assert!(executor.is_parallel());
        assert!(!BakeExecutor::serial().is_parallel());
    }

    #[test]
    fn test_empty_input() {
        BakeExecutor::new(4).for_each("empty", std::iter::empty::<u32>(), |_| {
            panic!("no job expected")
        });
    }
}
