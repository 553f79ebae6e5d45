use crate::{
    CubeCount, CubeDim, CubePos,
    kernel::{CubeState, Kernel, KernelContext, LaunchState},
    pipeline::{CopyEngine, Pipeline},
    sync::ClusterBarrier,
};
use std::sync::Arc;
use std::thread;

/// How the cubes of a launch are mapped onto threads.
#[derive(Debug, Clone)]
pub(crate) struct LaunchPlan {
    pub cube_count: CubeCount,
    pub cube_dim: CubeDim,
    pub cluster_dim: Option<CubeDim>,
    pub plane_dim: u32,
    pub max_concurrent_cubes: u32,
    pub copy_workers: u32,
}

impl LaunchPlan {
    pub fn planes_per_cube(&self) -> u32 {
        self.cube_dim.num_elems() / self.plane_dim
    }

    pub fn cluster_size(&self) -> u32 {
        self.cluster_dim.map(|dim| dim.num_elems()).unwrap_or(1)
    }

    /// Splits the grid in waves of whole clusters.
    ///
    /// Cubes of a cluster are contiguous and ordered by rank. A wave holds at least one
    /// cluster, even when the cluster is larger than the concurrency limit.
    pub fn waves(&self) -> Vec<Vec<CubePos>> {
        let (cx, cy, cz) = self.cube_count.dims();
        let cluster = self.cluster_dim.unwrap_or(CubeDim::new_single());
        let mut cubes = Vec::with_capacity(self.cube_count.num_cubes() as usize);

        for kz in 0..cz / cluster.z {
            for ky in 0..cy / cluster.y {
                for kx in 0..cx / cluster.x {
                    for rz in 0..cluster.z {
                        for ry in 0..cluster.y {
                            for rx in 0..cluster.x {
                                cubes.push(CubePos::new(
                                    kx * cluster.x + rx,
                                    ky * cluster.y + ry,
                                    kz * cluster.z + rz,
                                ));
                            }
                        }
                    }
                }
            }
        }

        let cluster_size = self.cluster_size();
        let clusters_per_wave = (self.max_concurrent_cubes / cluster_size).max(1);
        cubes
            .chunks((clusters_per_wave * cluster_size) as usize)
            .map(<[CubePos]>::to_vec)
            .collect()
    }
}

/// Runs every plane of every cube, one thread per plane, wave after wave.
///
/// Returns the number of waves.
pub(crate) fn execute<K: Kernel + ?Sized>(
    kernel: &K,
    plan: &LaunchPlan,
    launch: &Arc<LaunchState>,
) -> usize {
    let waves = plan.waves();
    let planes_per_cube = plan.planes_per_cube();
    let cluster_size = plan.cluster_size() as usize;

    thread::scope(|scope| {
        let engine = CopyEngine::start(scope, plan.copy_workers);

        for (wave_index, wave) in waves.iter().enumerate() {
            log::trace!("Wave {wave_index}: {} cubes", wave.len());

            let cubes: Vec<CubeState> = wave
                .iter()
                .map(|_| CubeState::new(planes_per_cube))
                .collect();
            let clusters: Vec<ClusterBarrier> = match plan.cluster_dim {
                Some(_) => (0..wave.len() / cluster_size)
                    .map(|_| ClusterBarrier::new(cluster_size as u32 * planes_per_cube))
                    .collect(),
                None => Vec::new(),
            };

            thread::scope(|wave_scope| {
                for (index, (cube_pos, cube)) in wave.iter().zip(cubes.iter()).enumerate() {
                    let cluster = clusters.get(index / cluster_size);

                    for plane_index in 0..planes_per_cube {
                        let launch = launch.clone();
                        let engine = &engine;
                        let cube_pos = *cube_pos;

                        wave_scope.spawn(move || {
                            let mut ctx = KernelContext {
                                cube_pos,
                                cube_count: plan.cube_count,
                                cube_dim: plan.cube_dim,
                                cluster_dim: plan.cluster_dim,
                                plane_dim: plan.plane_dim,
                                plane_index,
                                cube,
                                cluster,
                                pipeline: Pipeline::new(engine, launch.clone()),
                                launch,
                            };
                            kernel.execute(&mut ctx);
                        });
                    }
                }
            });
        }

        drop(engine);
    });

    waves.len()
}
