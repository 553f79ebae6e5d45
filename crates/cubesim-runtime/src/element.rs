use core::fmt::{Debug, Display};
use core::ops::{Add, AddAssign, Mul, Sub};
use half::{bf16, f16};
use num_traits::{One, Zero};

/// Element kinds understood by the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Elem {
    /// IEEE half precision.
    F16,
    /// Brain floating point.
    BF16,
    /// IEEE single precision.
    F32,
}

impl Elem {
    /// Size of one element in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Elem::F16 | Elem::BF16 => 2,
            Elem::F32 => 4,
        }
    }
}

impl Display for Elem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Elem::F16 => f.write_str("f16"),
            Elem::BF16 => f.write_str("bf16"),
            Elem::F32 => f.write_str("f32"),
        }
    }
}

/// Numeric element that can live in device memory.
///
/// Device memory is word addressed: every element is stored in the low bits of a 32-bit
/// word, which is what [to_bits](Numeric::to_bits) and [from_bits](Numeric::from_bits)
/// convert to and from.
pub trait Numeric:
    Copy
    + Send
    + Sync
    + 'static
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + AddAssign
{
    /// The element kind.
    fn elem() -> Elem;

    /// Convert from `f32`, rounding to nearest.
    fn from_f32(value: f32) -> Self;

    /// Convert to `f32`. Lossless for every supported kind.
    fn to_f32(self) -> f32;

    /// Raw bits stored in a device word.
    fn to_bits(self) -> u32;

    /// Rebuild an element from a device word.
    fn from_bits(bits: u32) -> Self;

    /// Cast from another numeric kind.
    fn cast_from<E: Numeric>(value: E) -> Self {
        Self::from_f32(value.to_f32())
    }

    /// Create an element from an integer.
    fn from_int(value: i64) -> Self {
        Self::from_f32(value as f32)
    }
}

impl Numeric for f32 {
    fn elem() -> Elem {
        Elem::F32
    }

    fn from_f32(value: f32) -> Self {
        value
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn to_bits(self) -> u32 {
        bytemuck::cast(self)
    }

    fn from_bits(bits: u32) -> Self {
        bytemuck::cast(bits)
    }

    fn cast_from<E: Numeric>(value: E) -> Self {
        value.to_f32()
    }
}

macro_rules! impl_numeric_half {
    ($ty:ty, $elem:ident) => {
        impl Numeric for $ty {
            fn elem() -> Elem {
                Elem::$elem
            }

            fn from_f32(value: f32) -> Self {
                <$ty>::from_f32(value)
            }

            fn to_f32(self) -> f32 {
                <$ty>::to_f32(self)
            }

            fn to_bits(self) -> u32 {
                bytemuck::cast::<$ty, u16>(self) as u32
            }

            fn from_bits(bits: u32) -> Self {
                bytemuck::cast::<u16, $ty>(bits as u16)
            }
        }
    };
}

impl_numeric_half!(f16, F16);
impl_numeric_half!(bf16, BF16);
