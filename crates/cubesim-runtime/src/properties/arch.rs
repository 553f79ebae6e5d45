use core::fmt::Display;

/// GPU architecture families the simulated device can be configured as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Arch {
    /// Compute capability 5.x.
    Maxwell,
    /// Compute capability 6.x.
    Pascal,
    /// Compute capability 7.0 and 7.2.
    Volta,
    /// Compute capability 7.5.
    Turing,
    /// Compute capability 8.0, 8.6 and 8.7.
    Ampere,
    /// Compute capability 8.9.
    Ada,
    /// Compute capability 9.0.
    Hopper,
    /// 64 wide data center architecture without a compute capability.
    Cdna,
}

impl Arch {
    /// Maps a compute capability to its architecture.
    pub fn from_compute_capability(major: u32, minor: u32) -> Option<Self> {
        match (major, minor) {
            (5, 0) | (5, 2) | (5, 3) => Some(Arch::Maxwell),
            (6, 0) | (6, 1) | (6, 2) => Some(Arch::Pascal),
            (7, 0) | (7, 2) => Some(Arch::Volta),
            (7, 5) => Some(Arch::Turing),
            (8, 0) | (8, 6) | (8, 7) => Some(Arch::Ampere),
            (8, 9) => Some(Arch::Ada),
            (9, 0) => Some(Arch::Hopper),
            _ => None,
        }
    }

    /// Name of a compute capability, `Compute X.Y` when the architecture is unknown.
    pub fn name_of(major: u32, minor: u32) -> String {
        match Self::from_compute_capability(major, minor) {
            Some(arch) => arch.to_string(),
            None => format!("Compute {major}.{minor}"),
        }
    }

    /// The compute capability used by the preset of this architecture.
    pub fn compute_capability(&self) -> Option<(u32, u32)> {
        match self {
            Arch::Maxwell => Some((5, 2)),
            Arch::Pascal => Some((6, 1)),
            Arch::Volta => Some((7, 0)),
            Arch::Turing => Some((7, 5)),
            Arch::Ampere => Some((8, 0)),
            Arch::Ada => Some((8, 9)),
            Arch::Hopper => Some((9, 0)),
            Arch::Cdna => None,
        }
    }

    /// Number of units in a plane.
    pub fn plane_size(&self) -> u32 {
        match self {
            Arch::Cdna => 64,
            _ => 32,
        }
    }
}

impl Display for Arch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Arch::Maxwell => "Maxwell",
            Arch::Pascal => "Pascal",
            Arch::Volta => "Volta",
            Arch::Turing => "Turing",
            Arch::Ampere => "Ampere",
            Arch::Ada => "Ada",
            Arch::Hopper => "Hopper",
            Arch::Cdna => "CDNA",
        };
        f.write_str(name)
    }
}

/// Architectural maximum of shared memory per SM, in KB.
///
/// Runtimes usually report a smaller operational limit; occupancy is computed against
/// this maximum.
pub fn architectural_shared_memory_kb(major: u32, minor: u32) -> u32 {
    match major {
        9.. => 228,
        8 if minor == 9 => 128,
        8 => 164,
        7 if minor >= 5 => 96,
        7 => 80,
        6 => 96,
        _ => 64,
    }
}

/// Maximum number of resident cubes per SM.
pub fn max_cubes_per_sm(major: u32) -> u32 {
    if major >= 6 { 32 } else { 16 }
}
