//! Cross-cube reduction through a cluster rendezvous.
//!
//! Every cube sums its slice of the input into a scratch slot, arrives at the cluster
//! barrier and waits for the other cubes of its cluster. Once released, the first cube of
//! the cluster reads every slot of the cluster and writes the cluster total.

use cubesim_runtime::{
    CubeCount, CubeDim, LaunchError,
    client::ComputeClient,
    kernel::{Kernel, KernelContext},
    memory::{Readable, TensorHandle, Writable},
};

const PLANES_PER_CUBE: u32 = 2;

/// Result of a cluster sum.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSums {
    /// Scaled sum of the slice of every cube.
    pub partials: Vec<f32>,
    /// Sum of the partials of every cluster.
    pub totals: Vec<f32>,
}

struct ClusterSumKernel {
    input: TensorHandle<f32>,
    partials: TensorHandle<f32>,
    totals: TensorHandle<f32>,
    slice_len: usize,
}

impl Kernel for ClusterSumKernel {
    fn name(&self) -> &str {
        "cluster_sum"
    }

    fn execute(&self, ctx: &mut KernelContext<'_>) {
        let cube = ctx.cube_index() as usize;
        let start = cube * self.slice_len;
        let scale = (cube + 1) as f32;
        let scratch = ctx.shared::<f32>(0, ctx.num_planes() as usize);

        let mut sum = 0.0;
        for lane in ctx.lanes() {
            let unit = ctx.unit_index(lane) as usize;
            for i in (unit..self.slice_len).step_by(ctx.num_units() as usize) {
                if self.input.in_bounds(0, start + i) {
                    sum += ctx.read_global(&self.input, 0, start + i) * scale;
                }
            }
        }
        scratch.write(ctx.plane_index() as usize, sum);
        ctx.sync_cube();

        if ctx.plane_index() == 0 {
            let total: f32 = (0..ctx.num_planes() as usize).map(|p| scratch.read(p)).sum();
            ctx.write_global(&self.partials, 0, cube, total);
        }

        let Some(cluster) = ctx.cluster() else {
            return;
        };
        let token = cluster.arrive();
        cluster.wait(token);

        if ctx.cluster_rank() == 0 && ctx.plane_index() == 0 {
            let cluster_size = ctx.cluster_dim().map(|dim| dim.num_elems()).unwrap_or(1) as usize;
            let total: f32 = (cube..cube + cluster_size)
                .map(|other| ctx.read_global(&self.partials, 0, other))
                .sum();
            ctx.write_global(&self.totals, 0, cube / cluster_size, total);
        }
    }
}

/// Sums `input`, a row vector, split in `num_cubes` slices, slice `i` scaled by `i + 1`.
///
/// Cubes are grouped in clusters of `cluster_size` along `x`.
pub fn launch_cluster_sum(
    client: &ComputeClient,
    input: &TensorHandle<f32>,
    num_cubes: u32,
    cluster_size: u32,
) -> Result<ClusterSums, LaunchError> {
    let partials = client.empty::<f32>(1, num_cubes as usize);
    let totals = client.empty::<f32>(1, (num_cubes / cluster_size.max(1)) as usize);

    let kernel = ClusterSumKernel {
        input: input.clone(),
        partials: partials.clone(),
        totals: totals.clone(),
        slice_len: input.cols().div_ceil(num_cubes.max(1) as usize),
    };

    client.launch_with_cluster(
        &kernel,
        CubeCount::new_1d(num_cubes),
        CubeDim::new_2d(client.properties().hardware.plane_size, PLANES_PER_CUBE),
        CubeDim::new_1d(cluster_size),
    )?;

    Ok(ClusterSums {
        partials: client.read(&partials),
        totals: client.read(&totals),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesim_runtime::properties::{Arch, DeviceProperties};
    use std::sync::{
        Arc, mpsc,
        atomic::{AtomicU32, Ordering},
    };
    use std::time::Duration;

    /// Every cube meets at the cluster barrier, except `absent` which leaves before arriving.
    struct Rendezvous {
        absent: Option<u32>,
        released: Arc<AtomicU32>,
    }

    impl Kernel for Rendezvous {
        fn execute(&self, ctx: &mut KernelContext<'_>) {
            let Some(cluster) = ctx.cluster() else {
                return;
            };
            if self.absent == Some(ctx.cube_index()) {
                return;
            }

            let token = cluster.arrive();
            cluster.wait(token);
            self.released.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Launches the rendezvous on its own thread, reporting the outcome on the returned channel.
    fn launch_rendezvous(
        absent: Option<u32>,
        released: Arc<AtomicU32>,
    ) -> mpsc::Receiver<Result<(), LaunchError>> {
        let client = ComputeClient::new(DeviceProperties::preset(Arch::Hopper));
        let (sender, receiver) = mpsc::channel();

        std::thread::spawn(move || {
            let kernel = Rendezvous { absent, released };
            let result = client.launch_with_cluster(
                &kernel,
                CubeCount::new_1d(2),
                CubeDim::new_2d(client.properties().hardware.plane_size, 1),
                CubeDim::new_1d(2),
            );
            sender.send(result).ok();
        });

        receiver
    }

    #[test]
    fn full_clusters_release_every_cube() {
        let released = Arc::new(AtomicU32::new(0));
        let receiver = launch_rendezvous(None, released.clone());

        let result = receiver.recv_timeout(Duration::from_secs(10));
        assert!(matches!(result, Ok(Ok(()))), "{result:?}");
        assert_eq!(released.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn a_cube_skipping_its_arrival_hangs_the_launch() {
        let released = Arc::new(AtomicU32::new(0));
        let receiver = launch_rendezvous(Some(1), released.clone());

        // The launch never returns, its thread is left spinning.
        assert!(matches!(
            receiver.recv_timeout(Duration::from_millis(500)),
            Err(mpsc::RecvTimeoutError::Timeout)
        ));
        assert_eq!(released.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn cube_sums_increase_and_add_up() {
        let client = ComputeClient::new(DeviceProperties::preset(Arch::Hopper));
        let ramp: Vec<f32> = (0..1024).map(|v| v as f32).collect();
        let input = client.create(&ramp, 1, 1024);

        let sums = launch_cluster_sum(&client, &input, 4, 4).unwrap();

        let expected: Vec<f32> = (0..4)
            .map(|cube| {
                let slice: f32 = ramp[cube * 256..(cube + 1) * 256].iter().sum();
                slice * (cube + 1) as f32
            })
            .collect();
        assert_eq!(sums.partials, expected);
        assert!(sums.partials.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(sums.totals, vec![expected.iter().sum::<f32>()]);
    }

    #[test]
    fn several_clusters_reduce_independently() {
        let client = ComputeClient::new(DeviceProperties::preset(Arch::Hopper));
        let input = client.create(&[1.0f32; 64], 1, 64);

        let sums = launch_cluster_sum(&client, &input, 8, 2).unwrap();

        assert_eq!(sums.partials, vec![8.0, 16.0, 24.0, 32.0, 40.0, 48.0, 56.0, 64.0]);
        assert_eq!(sums.totals, vec![24.0, 56.0, 88.0, 120.0]);
    }

    #[test]
    fn clusters_need_device_support() {
        let client = ComputeClient::new(DeviceProperties::preset(Arch::Ampere));
        let input = client.create(&[1.0f32; 8], 1, 8);

        assert!(matches!(
            launch_cluster_sum(&client, &input, 4, 4),
            Err(LaunchError::ClusterUnavailable)
        ));
    }
}
