use crate::{
    CubeCount, CubeDim, ExecutionMode, LaunchError, Numeric,
    config::{GlobalConfig, Logger, launch::LaunchLogLevel, matmul::MatmulLogLevel},
    kernel::{Kernel, LaunchState},
    memory::TensorHandle,
    properties::{DeviceProperties, Feature},
    scheduler::{self, LaunchPlan},
};
use core::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

/// The ComputeClient is the entry point to allocate tensors and launch kernels on a
/// simulated device.
///
/// Clones share the same device and logger.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    properties: Arc<DeviceProperties>,
    config: Arc<GlobalConfig>,
    mode: ExecutionMode,
    logger: Arc<spin::Mutex<Logger>>,
}

impl Default for ComputeClient {
    fn default() -> Self {
        Self::new(DeviceProperties::default())
    }
}

impl ComputeClient {
    /// Create a new client using the global configuration.
    pub fn new(properties: DeviceProperties) -> Self {
        Self::with_config(properties, GlobalConfig::get())
    }

    /// Create a new client with an explicit configuration.
    pub fn with_config(properties: DeviceProperties, config: Arc<GlobalConfig>) -> Self {
        Self {
            properties: Arc::new(properties),
            mode: config.launch.execution_mode,
            logger: Arc::new(spin::Mutex::new(Logger::from_config(config.clone()))),
            config,
        }
    }

    /// Change the execution mode of the launches of this client.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Properties of the device.
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Configuration the client was created with.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Execution mode of the launches.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Creates a `rows x cols` tensor from row-major data.
    ///
    /// # Panics
    ///
    /// When `data` doesn't hold `rows * cols` elements.
    pub fn create<E: Numeric>(&self, data: &[E], rows: usize, cols: usize) -> TensorHandle<E> {
        self.create_strided(data, rows, cols, cols)
    }

    /// Creates a `rows x cols` tensor from row-major data, with rows `stride` elements apart.
    ///
    /// # Panics
    ///
    /// When `data` doesn't hold `rows * cols` elements or `stride < cols`.
    pub fn create_strided<E: Numeric>(
        &self,
        data: &[E],
        rows: usize,
        cols: usize,
        stride: usize,
    ) -> TensorHandle<E> {
        assert_eq!(data.len(), rows * cols, "Data doesn't match a {rows}x{cols} tensor");
        assert!(stride >= cols, "Stride {stride} is smaller than {cols} columns");

        let handle = TensorHandle::new(rows, cols, stride);
        handle.fill_from(data);
        handle
    }

    /// Creates a zeroed `rows x cols` tensor.
    pub fn empty<E: Numeric>(&self, rows: usize, cols: usize) -> TensorHandle<E> {
        TensorHandle::new(rows, cols, cols)
    }

    /// Reads a tensor back as compact row-major data.
    pub fn read<E: Numeric>(&self, handle: &TensorHandle<E>) -> Vec<E> {
        handle.to_vec()
    }

    /// Launches `kernel` on a grid of `cube_count` cubes of `cube_dim` units.
    ///
    /// Blocks until every plane finished.
    pub fn launch<K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        cube_count: CubeCount,
        cube_dim: CubeDim,
    ) -> Result<(), LaunchError> {
        self.launch_inner(kernel, cube_count, cube_dim, None)
    }

    /// Launches `kernel` with cubes grouped in clusters of `cluster_dim` cubes.
    ///
    /// Every cube of a cluster is resident at the same time, so that the cluster barrier
    /// is always released once every plane arrived.
    pub fn launch_with_cluster<K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        cube_count: CubeCount,
        cube_dim: CubeDim,
        cluster_dim: CubeDim,
    ) -> Result<(), LaunchError> {
        self.launch_inner(kernel, cube_count, cube_dim, Some(cluster_dim))
    }

    /// Logs a matmul message when matmul logging is enabled.
    pub fn log_matmul<S: Display, F: FnOnce() -> S>(&self, message: F) {
        let mut logger = self.logger.lock();
        if !matches!(logger.log_level_matmul(), MatmulLogLevel::Disabled) {
            logger.log_matmul(&message());
        }
    }

    fn launch_inner<K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        cube_count: CubeCount,
        cube_dim: CubeDim,
        cluster_dim: Option<CubeDim>,
    ) -> Result<(), LaunchError> {
        if let Err(err) = self.validate(&cube_count, &cube_dim, cluster_dim.as_ref()) {
            log::debug!("Rejected launch of {}: {err}", kernel.name());
            return Err(err);
        }

        let plan = LaunchPlan {
            cube_count,
            cube_dim,
            cluster_dim,
            plane_dim: self.properties.hardware.plane_size,
            max_concurrent_cubes: self.config.launch.max_concurrent_cubes(),
            copy_workers: self.config.launch.copy_workers,
        };
        let level = self.logger.lock().log_level_launch();

        if !matches!(level, LaunchLogLevel::Disabled) {
            self.logger.lock().log_launch(&format!(
                "Launching {} cube_count {cube_count:?} cube_dim {cube_dim:?} cluster_dim {cluster_dim:?}",
                kernel.name(),
            ));
        }

        if cube_count.num_cubes() == 0 {
            return Ok(());
        }

        let launch = Arc::new(LaunchState::new(
            self.mode,
            self.properties.hardware.max_shared_memory_size,
        ));
        let start = Instant::now();
        let waves = scheduler::execute(kernel, &plan, &launch);
        let duration = start.elapsed();
        let result = launch.finish();

        log::debug!(
            "{} ran in {waves} waves of {} planes per cube in {duration:?}",
            kernel.name(),
            plan.planes_per_cube()
        );

        if let LaunchLogLevel::Full = level {
            self.logger.lock().log_launch(&format!(
                "{} completed in {duration:?}: {waves} waves of at most {} cubes, {} bytes of shared memory per cube, {result:?}",
                kernel.name(),
                plan.max_concurrent_cubes.max(plan.cluster_size()),
                launch.shared_memory_peak(),
            ));
        } else if result.is_err() && !matches!(level, LaunchLogLevel::Disabled) {
            self.logger
                .lock()
                .log_launch(&format!("{} failed: {result:?}", kernel.name()));
        }

        result
    }

    fn validate(
        &self,
        cube_count: &CubeCount,
        cube_dim: &CubeDim,
        cluster_dim: Option<&CubeDim>,
    ) -> Result<(), LaunchError> {
        let hw = &self.properties.hardware;
        let units = cube_dim.num_elems();

        if units > hw.max_units_per_cube {
            return Err(LaunchError::CubeDimTooBig(*cube_dim));
        }
        if units == 0 || units % hw.plane_size != 0 {
            return Err(LaunchError::CubeDimNotPlaneAligned {
                cube_dim: *cube_dim,
                plane_dim: hw.plane_size,
            });
        }

        let (x, y, z) = cube_count.dims();
        let (max_x, max_y, max_z) = hw.max_cube_count;
        if x > max_x || y > max_y || z > max_z {
            return Err(LaunchError::CubeCountTooBig(*cube_count));
        }

        if let Some(cluster_dim) = cluster_dim {
            if !self.properties.feature_enabled(Feature::Cluster) {
                return Err(LaunchError::ClusterUnavailable);
            }

            let size = cluster_dim.num_elems();
            if size == 0
                || size > hw.max_cluster_size
                || x % cluster_dim.x != 0
                || y % cluster_dim.y != 0
                || z % cluster_dim.z != 0
            {
                return Err(LaunchError::InvalidCluster {
                    cluster_dim: *cluster_dim,
                    cube_count: *cube_count,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelContext;
    use crate::memory::{Readable, Writable};
    use crate::properties::Arch;

    fn client() -> ComputeClient {
        ComputeClient::with_config(
            DeviceProperties::preset(Arch::Hopper),
            Arc::new(GlobalConfig::default()),
        )
    }

    #[test]
    fn every_unit_writes_its_element() {
        let client = client();
        let out = client.empty::<f32>(2, 64);

        let kernel = |ctx: &mut KernelContext<'_>| {
            for lane in ctx.lanes() {
                let col = ctx.unit_index(lane) as usize;
                let row = ctx.cube_pos().x as usize;
                ctx.write_global(&out, row, col, (row * 100 + col) as f32);
            }
        };
        client
            .launch(&kernel, CubeCount::new_1d(2), CubeDim::new_2d(32, 2))
            .unwrap();

        let data = client.read(&out);
        assert_eq!(data[63], 63.0);
        assert_eq!(data[64], 100.0);
        assert!(out.write_counts().iter().all(|count| *count == 1));
    }

    #[test]
    fn shared_memory_is_visible_after_sync_cube() {
        let client = client();
        let out = client.empty::<f32>(1, 4);

        let kernel = |ctx: &mut KernelContext<'_>| {
            let smem = ctx.shared::<f32>(0, 4);
            if ctx.plane_index() == 0 {
                for i in 0..4 {
                    smem.write(i, i as f32 + 1.0);
                }
            }
            ctx.sync_cube();
            if ctx.plane_index() == 3 {
                for i in 0..4 {
                    ctx.write_global(&out, 0, i, smem.read(3 - i));
                }
            }
        };
        client
            .launch(&kernel, CubeCount::new_single(), CubeDim::new_2d(32, 4))
            .unwrap();

        assert_eq!(client.read(&out), vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn unguarded_writes_fail_in_checked_mode() {
        let client = client();
        let out = client.empty::<f32>(1, 8);

        let kernel = |ctx: &mut KernelContext<'_>| {
            for lane in ctx.lanes() {
                ctx.write_global(&out, 0, lane as usize, 1.0);
            }
        };
        let result = client.launch(&kernel, CubeCount::new_single(), CubeDim::new_1d(32));

        assert!(matches!(
            result,
            Err(LaunchError::OutOfBounds { accesses: 24 })
        ));
        assert_eq!(client.read(&out), vec![1.0; 8]);
    }

    #[test]
    fn shared_memory_overuse_is_reported() {
        let client = client();
        let available = client.properties().hardware.max_shared_memory_size;

        let kernel = |ctx: &mut KernelContext<'_>| {
            let _smem = ctx.shared::<f32>(0, available / 4 + 1);
        };
        let result = client.launch(&kernel, CubeCount::new_single(), CubeDim::new_1d(32));

        assert!(matches!(
            result,
            Err(LaunchError::SharedMemoryExceeded { requested, .. }) if requested == available + 4
        ));
    }

    #[test]
    fn invalid_launches_are_rejected() {
        let client = client();
        let kernel = |_ctx: &mut KernelContext<'_>| {};

        assert!(matches!(
            client.launch(&kernel, CubeCount::new_single(), CubeDim::new_1d(48)),
            Err(LaunchError::CubeDimNotPlaneAligned { .. })
        ));
        assert!(matches!(
            client.launch(&kernel, CubeCount::new_single(), CubeDim::new_1d(2048)),
            Err(LaunchError::CubeDimTooBig(_))
        ));
        assert!(matches!(
            client.launch(&kernel, CubeCount::new_3d(1, 1 << 17, 1), CubeDim::new_1d(32)),
            Err(LaunchError::CubeCountTooBig(_))
        ));
        assert!(matches!(
            client.launch_with_cluster(
                &kernel,
                CubeCount::new_1d(6),
                CubeDim::new_1d(32),
                CubeDim::new_1d(4)
            ),
            Err(LaunchError::InvalidCluster { .. })
        ));

        let ampere = ComputeClient::with_config(
            DeviceProperties::preset(Arch::Ampere),
            Arc::new(GlobalConfig::default()),
        );
        assert!(matches!(
            ampere.launch_with_cluster(
                &kernel,
                CubeCount::new_1d(4),
                CubeDim::new_1d(32),
                CubeDim::new_1d(2)
            ),
            Err(LaunchError::ClusterUnavailable)
        ));
    }

    #[test]
    fn clusters_exchange_results_after_wait() {
        let mut config = GlobalConfig::default();
        // Smaller than a cluster, the wave is widened to hold one.
        config.launch.max_concurrent_cubes = Some(1);
        let client = ComputeClient::with_config(DeviceProperties::default(), Arc::new(config));
        let scratch = client.empty::<f32>(1, 8);
        let out = client.empty::<f32>(1, 8);

        let kernel = |ctx: &mut KernelContext<'_>| {
            let cube = ctx.cube_index() as usize;
            if ctx.plane_index() == 0 {
                ctx.write_global(&scratch, 0, cube, cube as f32 + 1.0);
            }

            let Some(cluster) = ctx.cluster() else {
                return;
            };
            cluster.arrive_and_wait();

            if ctx.plane_index() == 0 {
                let base = cube - ctx.cluster_rank() as usize;
                let mut sum = 0.0;
                for i in 0..4 {
                    sum += ctx.read_global(&scratch, 0, base + i);
                }
                ctx.write_global(&out, 0, cube, sum);
            }
        };
        client
            .launch_with_cluster(
                &kernel,
                CubeCount::new_1d(8),
                CubeDim::new_2d(32, 2),
                CubeDim::new_1d(4),
            )
            .unwrap();

        assert_eq!(
            client.read(&out),
            vec![10.0, 10.0, 10.0, 10.0, 26.0, 26.0, 26.0, 26.0]
        );
    }

    #[test]
    fn async_copies_complete_after_wait() {
        let client = client();
        let input = client.create(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        let out = client.empty::<f32>(2, 4);

        let kernel = |ctx: &mut KernelContext<'_>| {
            let smem = ctx.shared::<f32>(0, 8);
            let row = ctx.plane_index() as usize;
            let source = crate::pipeline::GlobalSlice::new(&input, row, 0, 3);
            ctx.pipeline().memcpy_async(source, smem.slice(row * 4, 4));
            ctx.pipeline().wait();
            ctx.sync_cube();

            if row == 0 {
                for i in 0..8 {
                    ctx.write_global(&out, i / 4, i % 4, smem.read(i));
                }
            }
        };
        client
            .launch(&kernel, CubeCount::new_single(), CubeDim::new_2d(32, 2))
            .unwrap();

        assert_eq!(
            client.read(&out),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]
        );
    }
}
