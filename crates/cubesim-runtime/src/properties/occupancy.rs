use super::DeviceProperties;
use core::fmt::Display;

/// Resources used by one cube of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct KernelResources {
    /// Units per cube.
    pub units_per_cube: u32,
    /// 32-bit registers per unit.
    pub registers_per_unit: u32,
    /// Shared memory per cube, in bytes.
    pub shared_memory_per_cube: usize,
}

/// The resource bounding the number of resident cubes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyLimit {
    /// Resident units per SM.
    Units,
    /// Registers per SM.
    Registers,
    /// Shared memory per SM.
    SharedMemory,
    /// Resident cubes per SM.
    Cubes,
    /// The cube doesn't fit on the device at all.
    Unlaunchable,
}

/// Occupancy of a kernel on one SM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    /// Resident cubes per SM.
    pub cubes_per_sm: u32,
    /// Resident planes per SM.
    pub active_planes: u32,
    /// Maximum resident planes per SM.
    pub max_planes: u32,
    /// What bounds `cubes_per_sm`.
    pub limited_by: OccupancyLimit,
}

impl Occupancy {
    /// Resident planes over the hardware maximum.
    pub fn ratio(&self) -> f32 {
        if self.max_planes == 0 {
            return 0.0;
        }
        self.active_planes as f32 / self.max_planes as f32
    }
}

impl Display for Occupancy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} cubes/SM, {}/{} planes ({:.1}%), limited by {:?}",
            self.cubes_per_sm,
            self.active_planes,
            self.max_planes,
            self.ratio() * 100.0,
            self.limited_by
        )
    }
}

impl DeviceProperties {
    /// Computes how many cubes of a kernel can be resident on one SM.
    pub fn occupancy(&self, resources: &KernelResources) -> Occupancy {
        let hw = &self.hardware;
        let planes_per_cube = resources.units_per_cube.div_ceil(hw.plane_size);
        let units_per_cube = planes_per_cube * hw.plane_size;
        let max_planes = hw.max_threads_per_sm / hw.plane_size;

        if units_per_cube == 0
            || units_per_cube > hw.max_units_per_cube
            || resources.shared_memory_per_cube > hw.max_shared_memory_size
        {
            return Occupancy {
                cubes_per_sm: 0,
                active_planes: 0,
                max_planes,
                limited_by: OccupancyLimit::Unlaunchable,
            };
        }

        let registers_per_cube = resources.registers_per_unit * units_per_cube;
        let limits = [
            (OccupancyLimit::Cubes, hw.max_cubes_per_sm),
            (OccupancyLimit::Units, hw.max_threads_per_sm / units_per_cube),
            (
                OccupancyLimit::Registers,
                match registers_per_cube {
                    0 => u32::MAX,
                    registers => hw.registers_per_sm / registers,
                },
            ),
            (
                OccupancyLimit::SharedMemory,
                match resources.shared_memory_per_cube {
                    0 => u32::MAX,
                    bytes => (hw.max_shared_memory_per_sm / bytes) as u32,
                },
            ),
        ];

        let (limited_by, cubes_per_sm) = limits
            .into_iter()
            .min_by_key(|(_, cubes)| *cubes)
            .unwrap_or((OccupancyLimit::Cubes, hw.max_cubes_per_sm));

        Occupancy {
            cubes_per_sm,
            active_planes: cubes_per_sm * planes_per_cube,
            max_planes,
            limited_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Arch;

    #[test]
    fn small_cubes_are_bounded_by_cube_slots() {
        let props = DeviceProperties::preset(Arch::Hopper);
        let occupancy = props.occupancy(&KernelResources::new(32, 16, 0));

        assert_eq!(occupancy.limited_by, OccupancyLimit::Cubes);
        assert_eq!(occupancy.cubes_per_sm, 32);
        assert_eq!(occupancy.active_planes, 32);
        assert_eq!(occupancy.max_planes, 64);
        assert_eq!(occupancy.ratio(), 0.5);
    }

    #[test]
    fn registers_and_shared_memory_limit_residency() {
        let props = DeviceProperties::preset(Arch::Ampere);

        // 256 units * 128 registers = 32768 registers per cube.
        let occupancy = props.occupancy(&KernelResources::new(256, 128, 0));
        assert_eq!(occupancy.limited_by, OccupancyLimit::Registers);
        assert_eq!(occupancy.cubes_per_sm, 2);

        // 164KB per SM holds three 48KB cubes.
        let occupancy = props.occupancy(&KernelResources::new(128, 32, 48 * 1024));
        assert_eq!(occupancy.limited_by, OccupancyLimit::SharedMemory);
        assert_eq!(occupancy.cubes_per_sm, 3);
    }

    #[test]
    fn oversized_cubes_are_unlaunchable() {
        let props = DeviceProperties::preset(Arch::Turing);
        let occupancy = props.occupancy(&KernelResources::new(2048, 32, 0));

        assert_eq!(occupancy.limited_by, OccupancyLimit::Unlaunchable);
        assert_eq!(occupancy.ratio(), 0.0);
    }
}
