mod engine;

pub(crate) use engine::*;

use crate::{
    ExecutionMode, Numeric,
    kernel::LaunchState,
    memory::{SharedSlice, TensorHandle, Writable},
};
use std::sync::{Arc, mpsc};

/// A run of contiguous elements of one row of a global tensor.
#[derive(Debug, Clone)]
pub struct GlobalSlice<E: Numeric> {
    tensor: TensorHandle<E>,
    row: usize,
    col: usize,
    len: usize,
}

impl<E: Numeric> GlobalSlice<E> {
    /// `len` elements of `tensor` starting at `(row, col)`.
    pub fn new(tensor: &TensorHandle<E>, row: usize, col: usize, len: usize) -> Self {
        Self {
            tensor: tensor.clone(),
            row,
            col,
            len,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Asynchronous global to shared memory copies issued by one plane.
///
/// Copies are batched until [commit](Pipeline::commit) and executed by the copy engine.
/// [wait](Pipeline::wait) blocks until every copy of this pipeline completed; copies of
/// other planes are not waited for, so a cube barrier must follow before reading shared
/// memory written by other planes.
pub struct Pipeline<'a> {
    engine: &'a CopyEngine,
    launch: Arc<LaunchState>,
    batch: Vec<CopyTask>,
    in_flight: Vec<mpsc::Receiver<()>>,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(engine: &'a CopyEngine, launch: Arc<LaunchState>) -> Self {
        Self {
            engine,
            launch,
            batch: Vec::new(),
            in_flight: Vec::new(),
        }
    }

    /// Issues a copy from global to shared memory without blocking.
    ///
    /// When the source is shorter than the destination, the rest of the destination is
    /// filled with zeros. In checked mode, source elements outside the logical tensor are
    /// not read and count as out-of-bounds accesses.
    pub fn memcpy_async<E: Numeric>(&mut self, source: GlobalSlice<E>, destination: SharedSlice<E>) {
        let readable = match self.launch.mode {
            ExecutionMode::Checked => {
                let tensor = &source.tensor;
                let readable = if source.row < tensor.rows() && source.col < tensor.cols() {
                    source.len.min(tensor.cols() - source.col)
                } else {
                    0
                };
                self.launch.record_out_of_bounds((source.len - readable) as u64);
                readable
            }
            ExecutionMode::Unchecked => source.len,
        };
        let copied = readable.min(destination.len());
        let start = source.row * source.tensor.stride() + source.col;

        self.batch.push(Box::new(move || {
            for i in 0..destination.len() {
                let value = if i < copied {
                    source.tensor.load(start + i).unwrap_or_else(E::zero)
                } else {
                    E::zero()
                };
                destination.write(i, value);
            }
        }));
    }

    /// Sends the issued copies to the copy engine.
    pub fn commit(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        let batch = core::mem::take(&mut self.batch);
        let (done, receiver) = mpsc::channel();
        self.engine.submit(Box::new(move || {
            for copy in batch {
                copy();
            }
            done.send(()).ok();
        }));
        self.in_flight.push(receiver);
    }

    /// Commits pending copies and blocks until all the copies of this pipeline completed.
    pub fn wait(&mut self) {
        self.commit();
        for receiver in self.in_flight.drain(..) {
            if receiver.recv().is_err() {
                log::warn!("A copy batch was dropped before completion");
            }
        }
    }

    /// Number of committed batches not yet waited for.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        self.wait();
    }
}

impl core::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("pending", &self.batch.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
