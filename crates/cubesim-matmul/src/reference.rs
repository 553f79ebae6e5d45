//! Scalar matmul on the host, used as the correctness oracle.

use cubesim_runtime::Numeric;

/// Computes `lhs · rhs` for row-major `m x k` and `k x n` matrices.
///
/// Every product is accumulated in `f32` in ascending `k`, which is the order of the tiled
/// kernels as well.
///
/// # Panics
///
/// When the slices don't hold `m * k` and `k * n` elements.
pub fn matmul_cpu<L: Numeric, R: Numeric>(
    lhs: &[L],
    rhs: &[R],
    m: usize,
    n: usize,
    k: usize,
) -> Vec<f32> {
    assert_eq!(lhs.len(), m * k, "lhs doesn't hold {m}x{k} elements");
    assert_eq!(rhs.len(), k * n, "rhs doesn't hold {k}x{n} elements");

    let mut out = vec![0.0; m * n];

    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0f32;
            for k_ in 0..k {
                sum += lhs[i * k + k_].to_f32() * rhs[k_ * n + j].to_f32();
            }
            out[i * n + j] = sum;
        }
    }

    out
}
