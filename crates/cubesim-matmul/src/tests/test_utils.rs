use cubesim_runtime::Numeric;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Accepted deviation between a kernel output and the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub atol: f32,
    pub rtol: f32,
}

impl Tolerance {
    /// Paths going through reduced precision fragments or outputs.
    pub const HARDWARE: Tolerance = Tolerance {
        atol: 1e-3,
        rtol: 2e-2,
    };

    /// Full f32 paths, absolute only.
    pub const TILED: Tolerance = Tolerance {
        atol: 1e-5,
        rtol: 0.0,
    };

    /// The tolerance matching every element type of the precision.
    pub fn for_elems<L: Numeric, R: Numeric, A: Numeric, O: Numeric>() -> Self {
        let f32 = <f32 as Numeric>::elem();

        if [L::elem(), R::elem(), A::elem(), O::elem()] == [f32; 4] {
            Self::TILED
        } else {
            Self::HARDWARE
        }
    }
}

/// Compares `actual` to `expected` element-wise.
///
/// An element fails when it differs by more than `atol + rtol * |expected|`.
pub fn assert_equals_approx<E: Numeric>(
    actual: &[E],
    expected: &[f32],
    tolerance: Tolerance,
) -> Result<(), String> {
    if actual.len() != expected.len() {
        return Err(format!(
            "Lengths differ: actual={}, expected={}",
            actual.len(),
            expected.len()
        ));
    }

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let a = a.to_f32();
        let difference = (a - e).abs();
        let epsilon = tolerance.atol + tolerance.rtol * e.abs();

        // NaN never compares, check it explicitly.
        if difference.is_nan() || difference > epsilon {
            return Err(format!(
                "Values differ more than epsilon: index={i} actual={a}, expected={e}, difference={difference}, epsilon={epsilon}"
            ));
        }
    }

    Ok(())
}

/// Generates `len` values in `[-1, 1)` with a fixed seed.
pub fn sample<E: Numeric>(len: usize, seed: u64) -> Vec<E> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..len)
        .map(|_| E::from_f32(rng.random_range(-1.0..1.0)))
        .collect()
}

/// Values `start, start + 1, ...` converted to `E`.
pub fn range<E: Numeric>(start: i64, len: usize) -> Vec<E> {
    (0..len as i64).map(|i| E::from_int(start + i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn reports_the_first_failing_element() {
        let actual = [1.0f32, 2.5, 3.0];
        let err = assert_equals_approx(&actual, &[1.0, 2.0, 3.0], Tolerance::TILED).unwrap_err();

        assert!(err.contains("index=1"), "{err}");
        assert!(err.contains("difference=0.5"), "{err}");
    }

    #[test]
    fn relative_tolerance_grows_with_the_value() {
        let actual = [f16::from_f32(1000.0)];
        assert!(assert_equals_approx(&actual, &[1010.0], Tolerance::HARDWARE).is_ok());
        assert!(assert_equals_approx(&actual, &[1030.0], Tolerance::HARDWARE).is_err());
    }

    #[test]
    fn nan_is_never_equal() {
        assert!(assert_equals_approx(&[f32::NAN], &[0.0], Tolerance::HARDWARE).is_err());
    }

    #[test]
    fn samples_are_seeded() {
        let a = sample::<f32>(16, 42);
        assert_eq!(a, sample::<f32>(16, 42));
        assert_ne!(a, sample::<f32>(16, 43));
        assert!(a.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn tiled_tolerance_doesnt_scale_with_magnitude() {
        let expected = [1000.0f32];
        let actual = [1000.0001f32];

        assert!(assert_equals_approx(&actual, &expected, Tolerance::TILED).is_err());
        assert!(assert_equals_approx(&actual, &expected, Tolerance::HARDWARE).is_ok());
    }

    #[test]
    fn tolerance_follows_precision() {
        assert_eq!(Tolerance::for_elems::<f32, f32, f32, f32>(), Tolerance::TILED);
        assert_eq!(Tolerance::for_elems::<f16, f16, f32, f16>(), Tolerance::HARDWARE);
    }
}
