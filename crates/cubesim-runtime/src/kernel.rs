use crate::{
    CubeCount, CubeDim, CubePos, Elem, ExecutionMode, LaunchError, Numeric,
    memory::{SharedMemory, TensorHandle},
    pipeline::Pipeline,
    sync::{ClusterBarrier, CubeBarrier},
};
use core::ops::Range;
use hashbrown::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering},
};

/// A kernel executed by every plane of every cube of a launch.
pub trait Kernel: Sync {
    /// Name used in launch logs.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Runs the kernel for one plane.
    fn execute(&self, ctx: &mut KernelContext<'_>);
}

impl<F> Kernel for F
where
    F: Fn(&mut KernelContext<'_>) + Sync,
{
    fn execute(&self, ctx: &mut KernelContext<'_>) {
        self(ctx)
    }
}

/// State shared by every plane of a launch.
#[derive(Debug)]
pub(crate) struct LaunchState {
    pub(crate) mode: ExecutionMode,
    max_shared_memory: usize,
    out_of_bounds: AtomicU64,
    shared_memory_peak: AtomicUsize,
}

impl LaunchState {
    pub(crate) fn new(mode: ExecutionMode, max_shared_memory: usize) -> Self {
        Self {
            mode,
            max_shared_memory,
            out_of_bounds: AtomicU64::new(0),
            shared_memory_peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_out_of_bounds(&self, accesses: u64) {
        if accesses > 0 {
            self.out_of_bounds.fetch_add(accesses, Ordering::Relaxed);
        }
    }

    fn record_shared_memory(&self, bytes: usize) {
        self.shared_memory_peak.fetch_max(bytes, Ordering::Relaxed);
    }

    /// Largest amount of shared memory allocated by a cube, in bytes.
    pub(crate) fn shared_memory_peak(&self) -> usize {
        self.shared_memory_peak.load(Ordering::Relaxed)
    }

    pub(crate) fn finish(&self) -> Result<(), LaunchError> {
        let requested = self.shared_memory_peak();
        if requested > self.max_shared_memory {
            return Err(LaunchError::SharedMemoryExceeded {
                requested,
                available: self.max_shared_memory,
            });
        }

        match self.out_of_bounds.load(Ordering::Relaxed) {
            0 => Ok(()),
            accesses => Err(LaunchError::OutOfBounds { accesses }),
        }
    }
}

struct SharedAllocation {
    elem: Elem,
    words: Arc<[AtomicU32]>,
}

#[derive(Default)]
struct SharedRegistry {
    allocations: HashMap<u32, SharedAllocation>,
    bytes: usize,
}

/// State shared by the planes of one cube.
pub(crate) struct CubeState {
    barrier: CubeBarrier,
    shared: spin::Mutex<SharedRegistry>,
}

impl CubeState {
    pub(crate) fn new(num_planes: u32) -> Self {
        Self {
            barrier: CubeBarrier::new(num_planes as usize),
            shared: spin::Mutex::new(SharedRegistry::default()),
        }
    }
}

/// Execution context of one plane.
///
/// Gives access to the position of the plane in the launch, to the memories and to the
/// synchronization primitives of its cube and cluster.
pub struct KernelContext<'a> {
    pub(crate) cube_pos: CubePos,
    pub(crate) cube_count: CubeCount,
    pub(crate) cube_dim: CubeDim,
    pub(crate) cluster_dim: Option<CubeDim>,
    pub(crate) plane_dim: u32,
    pub(crate) plane_index: u32,
    pub(crate) cube: &'a CubeState,
    pub(crate) cluster: Option<&'a ClusterBarrier>,
    pub(crate) launch: Arc<LaunchState>,
    pub(crate) pipeline: Pipeline<'a>,
}

impl<'a> KernelContext<'a> {
    /// Position of the cube in the grid.
    pub fn cube_pos(&self) -> CubePos {
        self.cube_pos
    }

    /// Linear position of the cube in the grid.
    pub fn cube_index(&self) -> u32 {
        self.cube_pos.linear(&self.cube_count)
    }

    /// The launch grid.
    pub fn cube_count(&self) -> CubeCount {
        self.cube_count
    }

    /// Units of a cube.
    pub fn cube_dim(&self) -> CubeDim {
        self.cube_dim
    }

    /// Units of a plane.
    pub fn plane_dim(&self) -> u32 {
        self.plane_dim
    }

    /// Index of this plane in its cube.
    pub fn plane_index(&self) -> u32 {
        self.plane_index
    }

    /// Planes of a cube.
    pub fn num_planes(&self) -> u32 {
        self.cube_dim.num_elems() / self.plane_dim
    }

    /// Units of a cube.
    pub fn num_units(&self) -> u32 {
        self.cube_dim.num_elems()
    }

    /// The lanes simulated by this plane.
    pub fn lanes(&self) -> Range<u32> {
        0..self.plane_dim
    }

    /// Index in the cube of the unit running `lane` of this plane.
    pub fn unit_index(&self, lane: u32) -> u32 {
        self.plane_index * self.plane_dim + lane
    }

    /// Execution mode of the launch.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.launch.mode
    }

    /// Blocks until every plane of the cube reached this point.
    ///
    /// Shared memory writes made before the barrier are visible to every plane after it.
    pub fn sync_cube(&self) {
        self.cube.barrier.wait();
    }

    /// Shared memory allocation `id` of the cube, created on first use.
    ///
    /// Every plane asking for the same `id` gets the same memory.
    ///
    /// # Panics
    ///
    /// When `id` was already allocated with a different element type or length.
    pub fn shared<E: Numeric>(&self, id: u32, len: usize) -> SharedMemory<E> {
        let mut registry = self.cube.shared.lock();

        if let Some(allocation) = registry.allocations.get(&id) {
            assert!(
                allocation.elem == E::elem() && allocation.words.len() == len,
                "Shared memory {id} reused as {len} {} instead of {} {}",
                E::elem(),
                allocation.words.len(),
                allocation.elem,
            );
            return SharedMemory::from_words(allocation.words.clone());
        }

        registry.bytes += len * E::elem().size();
        self.launch.record_shared_memory(registry.bytes);

        let memory = SharedMemory::<E>::new(len);
        registry.allocations.insert(
            id,
            SharedAllocation {
                elem: E::elem(),
                words: memory.words(),
            },
        );
        memory
    }

    /// The asynchronous copy pipeline of this plane.
    pub fn pipeline(&mut self) -> &mut Pipeline<'a> {
        &mut self.pipeline
    }

    /// Shape of the cluster, in cubes, when launched with clusters.
    pub fn cluster_dim(&self) -> Option<CubeDim> {
        self.cluster_dim
    }

    /// Rank of the cube in its cluster, 0 without clusters.
    pub fn cluster_rank(&self) -> u32 {
        self.cluster_dim
            .map(|dim| self.cube_pos.rank_in_cluster(&dim))
            .unwrap_or(0)
    }

    /// Position of the cluster in the grid of clusters.
    pub fn cluster_pos(&self) -> CubePos {
        self.cluster_dim
            .map(|dim| self.cube_pos.cluster(&dim))
            .unwrap_or(self.cube_pos)
    }

    /// The barrier of the cluster, when launched with clusters.
    pub fn cluster(&self) -> Option<&'a ClusterBarrier> {
        self.cluster
    }

    /// Reads an element of a global tensor.
    ///
    /// In checked mode, reading outside the logical tensor returns zero and counts as an
    /// out-of-bounds access.
    pub fn read_global<E: Numeric>(&self, tensor: &TensorHandle<E>, row: usize, col: usize) -> E {
        match self.launch.mode {
            ExecutionMode::Checked if !tensor.in_bounds(row, col) => {
                self.launch.record_out_of_bounds(1);
                E::zero()
            }
            _ => tensor
                .load(row * tensor.stride() + col)
                .unwrap_or_else(E::zero),
        }
    }

    /// Writes an element of a global tensor.
    ///
    /// In checked mode, writing outside the logical tensor is skipped and counts as an
    /// out-of-bounds access.
    pub fn write_global<E: Numeric>(
        &self,
        tensor: &TensorHandle<E>,
        row: usize,
        col: usize,
        value: E,
    ) {
        match self.launch.mode {
            ExecutionMode::Checked if !tensor.in_bounds(row, col) => {
                self.launch.record_out_of_bounds(1);
            }
            _ => {
                tensor.store(row * tensor.stride() + col, value);
            }
        }
    }
}

impl core::fmt::Debug for KernelContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelContext")
            .field("cube_pos", &self.cube_pos)
            .field("cube_count", &self.cube_count)
            .field("cube_dim", &self.cube_dim)
            .field("cluster_dim", &self.cluster_dim)
            .field("plane_index", &self.plane_index)
            .finish()
    }
}
