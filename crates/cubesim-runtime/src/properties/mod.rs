mod arch;
mod occupancy;

pub use arch::*;
pub use occupancy::*;

use crate::Elem;
use core::fmt::Display;
use hashbrown::HashSet;

/// Optional capabilities of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Plane level operations.
    Plane,
    /// Cubes can be grouped in clusters that rendezvous through an arrive/wait barrier.
    Cluster,
    /// A matrix multiply-accumulate fragment shape and its element types.
    Cmma {
        /// Element of the A fragment.
        a: Elem,
        /// Element of the B fragment.
        b: Elem,
        /// Element of the accumulator.
        c: Elem,
        /// Rows of A and of the accumulator.
        m: u8,
        /// Columns of A and rows of B.
        k: u8,
        /// Columns of B and of the accumulator.
        n: u8,
    },
}

/// Limits of the hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProperties {
    /// Number of units in a plane.
    pub plane_size: u32,
    /// Number of streaming multiprocessors.
    pub num_streaming_multiprocessors: u32,
    /// 32-bit registers per streaming multiprocessor.
    pub registers_per_sm: u32,
    /// Shared memory per streaming multiprocessor, in bytes.
    pub max_shared_memory_per_sm: usize,
    /// Shared memory a single cube can allocate, in bytes.
    pub max_shared_memory_size: usize,
    /// Resident units per streaming multiprocessor.
    pub max_threads_per_sm: u32,
    /// Resident cubes per streaming multiprocessor.
    pub max_cubes_per_sm: u32,
    /// Units in a single cube.
    pub max_units_per_cube: u32,
    /// Cubes along each axis of a launch grid.
    pub max_cube_count: (u32, u32, u32),
    /// Cubes in a cluster, 0 when clusters are unsupported.
    pub max_cluster_size: u32,
}

/// Properties of a simulated device.
#[derive(Debug, Clone)]
pub struct DeviceProperties {
    /// Device name.
    pub name: String,
    /// Architecture family.
    pub arch: Arch,
    /// Hardware limits.
    pub hardware: HardwareProperties,
    features: HashSet<Feature>,
}

const KB: usize = 1024;
const MAX_CUBE_COUNT: (u32, u32, u32) = (i32::MAX as u32, u16::MAX as u32, u16::MAX as u32);

impl DeviceProperties {
    /// Create device properties with the given features.
    pub fn new(name: &str, arch: Arch, hardware: HardwareProperties, features: &[Feature]) -> Self {
        Self {
            name: name.to_string(),
            arch,
            hardware,
            features: features.iter().copied().collect(),
        }
    }

    /// Properties of a representative device of the given architecture.
    pub fn preset(arch: Arch) -> Self {
        let (name, sms, threads, per_cube_kb) = match arch {
            Arch::Maxwell => ("GeForce GTX 980 Ti", 22, 2048, 48),
            Arch::Pascal => ("GeForce GTX 1080 Ti", 28, 2048, 48),
            Arch::Volta => ("Tesla V100", 80, 2048, 80),
            Arch::Turing => ("GeForce RTX 2080 Ti", 68, 1024, 64),
            Arch::Ampere => ("A100", 108, 2048, 163),
            Arch::Ada => ("GeForce RTX 4090", 128, 1536, 99),
            Arch::Hopper => ("H100", 132, 2048, 227),
            Arch::Cdna => ("Instinct MI250X", 110, 2048, 64),
        };

        let (smem_per_sm_kb, max_cubes) = match arch.compute_capability() {
            Some((major, minor)) => (
                architectural_shared_memory_kb(major, minor),
                max_cubes_per_sm(major),
            ),
            None => (64, 32),
        };

        let hardware = HardwareProperties {
            plane_size: arch.plane_size(),
            num_streaming_multiprocessors: sms,
            registers_per_sm: 65536,
            max_shared_memory_per_sm: smem_per_sm_kb as usize * KB,
            max_shared_memory_size: per_cube_kb * KB,
            max_threads_per_sm: threads,
            max_cubes_per_sm: max_cubes,
            max_units_per_cube: 1024,
            max_cube_count: MAX_CUBE_COUNT,
            max_cluster_size: match arch {
                Arch::Hopper => 8,
                _ => 0,
            },
        };

        let mut properties = Self::new(name, arch, hardware, &[Feature::Plane]);
        if properties.hardware.max_cluster_size > 0 {
            properties.register_feature(Feature::Cluster);
        }
        register_mma_features(&mut properties);
        properties
    }

    /// Check if the provided [feature](Feature) is supported by the device.
    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Register a [feature](Feature) supported by the device.
    pub fn register_feature(&mut self, feature: Feature) -> bool {
        self.features.insert(feature)
    }

    /// Supported fragment configurations, as `(a, b, c, m, n, k)`.
    ///
    /// Largest shapes come first. Among shapes of the same size, square ones come first,
    /// then the smaller `m`.
    pub fn mma_configs(&self) -> Vec<(Elem, Elem, Elem, u8, u8, u8)> {
        let mut configs: Vec<_> = self
            .features
            .iter()
            .filter_map(|feature| match *feature {
                Feature::Cmma { a, b, c, m, k, n } => Some((a, b, c, m, n, k)),
                _ => None,
            })
            .collect();
        configs.sort_by_key(|(a, b, c, m, n, k)| {
            (
                core::cmp::Reverse(*m as u32 * *n as u32 * *k as u32),
                m.abs_diff(*n),
                *m,
                *n,
                *k,
                a.size(),
                b.size(),
                c.size(),
            )
        });
        configs
    }
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self::preset(Arch::Hopper)
    }
}

fn register_mma_features(properties: &mut DeviceProperties) {
    let shapes: &[(u8, u8, u8)] = match properties.arch {
        Arch::Maxwell | Arch::Pascal => &[],
        Arch::Cdna => &[(16, 16, 16), (32, 32, 8)],
        _ => &[(16, 16, 16), (32, 8, 16), (8, 32, 16)],
    };
    let mut types = vec![(Elem::F16, Elem::F32)];
    match properties.arch {
        Arch::Volta | Arch::Turing => types.push((Elem::F16, Elem::F16)),
        Arch::Ampere | Arch::Ada | Arch::Hopper => {
            types.push((Elem::F16, Elem::F16));
            types.push((Elem::BF16, Elem::F32));
        }
        Arch::Cdna => types.push((Elem::BF16, Elem::F32)),
        Arch::Maxwell | Arch::Pascal => {}
    }

    for (m, n, k) in shapes.iter().copied() {
        for (input, output) in types.iter().copied() {
            properties.register_feature(Feature::Cmma {
                a: input,
                b: input,
                c: output,
                m,
                k,
                n,
            });
        }
    }
}

struct Thousands(u64);

impl Display for Thousands {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let digits = self.0.to_string();
        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                f.write_str(",")?;
            }
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl Display for DeviceProperties {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let hw = &self.hardware;
        writeln!(f, "Device: {}", self.name)?;
        writeln!(f, "Architecture: {}", self.arch)?;
        match self.arch.compute_capability() {
            Some((major, minor)) => writeln!(f, "Compute Cap: {major}.{minor}")?,
            None => writeln!(f, "Compute Cap: n/a")?,
        }
        writeln!(f, "Plane Size: {}", hw.plane_size)?;
        writeln!(f, "SM Count: {}", hw.num_streaming_multiprocessors)?;
        writeln!(f, "Registers/SM: {}", Thousands(hw.registers_per_sm as u64))?;
        writeln!(
            f,
            "Shared Mem/SM: {}KB (architectural max)",
            hw.max_shared_memory_per_sm / KB
        )?;
        writeln!(f, "Shared Mem/Block: {}KB", hw.max_shared_memory_size / KB)?;
        writeln!(f, "Max Threads/SM: {}", Thousands(hw.max_threads_per_sm as u64))?;
        write!(f, "Max Blocks/SM: {}", hw.max_cubes_per_sm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hopper_supports_clusters_and_bf16() {
        let props = DeviceProperties::preset(Arch::Hopper);

        assert!(props.feature_enabled(Feature::Cluster));
        assert_eq!(props.hardware.max_shared_memory_per_sm, 228 * 1024);
        assert!(props.feature_enabled(Feature::Cmma {
            a: Elem::BF16,
            b: Elem::BF16,
            c: Elem::F32,
            m: 16,
            k: 16,
            n: 16,
        }));
        assert!(!props.feature_enabled(Feature::Cmma {
            a: Elem::F32,
            b: Elem::F32,
            c: Elem::F32,
            m: 16,
            k: 16,
            n: 16,
        }));
    }

    #[test]
    fn older_architectures_have_no_fragments() {
        let props = DeviceProperties::preset(Arch::Pascal);

        assert!(props.mma_configs().is_empty());
        assert!(!props.feature_enabled(Feature::Cluster));
        assert_eq!(DeviceProperties::preset(Arch::Maxwell).hardware.max_cubes_per_sm, 16);
    }

    #[test]
    fn square_fragments_win_ties() {
        let props = DeviceProperties::preset(Arch::Hopper);
        let shapes: Vec<_> = props
            .mma_configs()
            .into_iter()
            .filter(|(a, _, c, ..)| *a == Elem::F16 && *c == Elem::F32)
            .map(|(_, _, _, m, n, k)| (m, n, k))
            .collect();

        assert_eq!(shapes, vec![(16, 16, 16), (8, 32, 16), (32, 8, 16)]);
    }

    #[test]
    fn cdna_planes_are_64_wide() {
        let props = DeviceProperties::preset(Arch::Cdna);

        assert_eq!(props.hardware.plane_size, 64);
        assert!(
            props
                .mma_configs()
                .iter()
                .any(|(_, _, _, m, n, k)| (*m, *n, *k) == (32, 32, 8))
        );
    }

    #[test]
    fn summary_uses_separators() {
        let summary = DeviceProperties::preset(Arch::Ampere).to_string();

        assert!(summary.contains("Architecture: Ampere"));
        assert!(summary.contains("Registers/SM: 65,536"));
        assert!(summary.contains("Shared Mem/SM: 164KB (architectural max)"));
        assert!(summary.contains("Max Threads/SM: 2,048"));
    }
}
