use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc,
};
use std::thread;

pub(crate) type CopyTask = Box<dyn FnOnce() + Send>;

/// Executes asynchronous copies on dedicated worker threads.
///
/// Tasks are dispatched round robin. Workers live in the scope of a launch and stop once
/// the engine is dropped.
#[derive(Debug)]
pub(crate) struct CopyEngine {
    // TODO: a work-stealing deque would balance batches of uneven size, the channels keep
    // the dispatch simple for now.
    workers: Vec<mpsc::Sender<CopyTask>>,
    next: AtomicUsize,
}

impl CopyEngine {
    pub(crate) fn start<'scope>(scope: &'scope thread::Scope<'scope, '_>, num_workers: u32) -> Self {
        let workers = (0..num_workers.max(1))
            .map(|worker_id| {
                let (tx, rx) = mpsc::channel::<CopyTask>();
                scope.spawn(move || {
                    log::trace!("Copy worker {worker_id} started");
                    for task in rx.iter() {
                        task();
                    }
                    log::trace!("Copy worker {worker_id} stopped");
                });
                tx
            })
            .collect();

        Self {
            workers,
            next: AtomicUsize::new(0),
        }
    }

    pub(crate) fn submit(&self, task: CopyTask) {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        if let Err(mpsc::SendError(task)) = self.workers[index].send(task) {
            log::warn!("Copy worker {index} is gone, running the copy inline");
            task();
        }
    }
}
