// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A bounded work-stealing thread pool: one `crossbeam_deque::Worker` FIFO
//! per thread, shared `Stealer`s so idle workers can pull from busy ones, and
//! a global `Injector` for work submitted from outside the pool. Grounded in
//! the sibling pack's `pathfinder_renderer`/`vello` tile schedulers, which
//! this crate's teacher has no counterpart to (it is single-threaded).

use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::RasterError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    injector: Injector<Job>,
    stealers: Vec<Stealer<Job>>,
    closed: AtomicBool,
    pending: AtomicUsize,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let workers: Vec<Worker<Job>> = (0..worker_count).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = workers.iter().map(|w| w.stealer()).collect();
        let (done_tx, done_rx) = bounded(worker_count * 4 + 16);

        let shared = Arc::new(Shared {
            injector: Injector::new(),
            stealers,
            closed: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            done_tx,
            done_rx,
        });

        let handles = workers
            .into_iter()
            .enumerate()
            .map(|(id, worker)| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("vecraster-worker-{id}"))
                    .spawn(move || run_worker(worker, shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool { shared, handles }
    }

    /// Submit a job without waiting for it to complete.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), RasterError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RasterError::Closed);
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        self.shared.injector.push(Box::new(job));
        Ok(())
    }

    /// Submit every job in `jobs` and block until all of them (and anything
    /// already in flight) have completed.
    pub fn execute_all<I>(&self, jobs: I) -> Result<(), RasterError>
    where
        I: IntoIterator<Item = Job>,
    {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RasterError::Closed);
        }
        let mut count = 0;
        for job in jobs {
            self.shared.pending.fetch_add(1, Ordering::AcqRel);
            self.shared.injector.push(job);
            count += 1;
        }
        for _ in 0..count {
            self.shared.done_rx.recv().map_err(|_| RasterError::Closed)?;
        }
        Ok(())
    }

    /// Idempotent: calling `close` more than once is a no-op, logged at
    /// `debug` rather than treated as an error.
    pub fn close(&mut self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            log::debug!("WorkerPool::close called on an already-closed pool");
            return;
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(local: Worker<Job>, shared: Arc<Shared>) {
    loop {
        let job = local.pop().or_else(|| steal_from_others(&local, &shared));
        match job {
            Some(job) => {
                job();
                shared.pending.fetch_sub(1, Ordering::AcqRel);
                let _ = shared.done_tx.send(());
            }
            None => {
                if shared.closed.load(Ordering::Acquire) {
                    return;
                }
                std::thread::yield_now();
            }
        }
    }
}

fn steal_from_others(local: &Worker<Job>, shared: &Shared) -> Option<Job> {
    std::iter::repeat_with(|| {
        shared
            .injector
            .steal_batch_and_pop(local)
            .or_else(|| shared.stealers.iter().map(|s| s.steal()).collect())
    })
    .find(|s| !s.is_retry())
    .and_then(|s| s.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn execute_all_runs_every_job() {
        let mut pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicU32::new(0));
        let jobs: Vec<Job> = (0..100)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }) as Job
            })
            .collect();
        pool.execute_all(jobs).unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 100);
        pool.close();
    }

    #[test]
    fn close_is_idempotent() {
        let mut pool = WorkerPool::new(2);
        pool.close();
        pool.close();
    }

    #[test]
    fn submit_after_close_errors() {
        let mut pool = WorkerPool::new(2);
        pool.close();
        assert!(matches!(pool.submit(|| {}), Err(RasterError::Closed)));
    }
}
