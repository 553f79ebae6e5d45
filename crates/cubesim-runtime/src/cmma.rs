//! Cooperative matrix multiply-accumulate on fixed-shape fragments.
//!
//! A fragment is owned by one plane. Its content can only be set through [fill], [load]
//! or [execute], and only read back through [store].
//!
//! # Example
//!
//! A 16x16x16 multiplication of shared memory tiles.
//!
//! ```rust, ignore
//! let mut a = cmma::Matrix::<f16>::new(MatrixIdent::A, 16, 16, 16, MatrixLayout::RowMajor);
//! let mut b = cmma::Matrix::<f16>::new(MatrixIdent::B, 16, 16, 16, MatrixLayout::RowMajor);
//! let mut c = cmma::Matrix::<f32>::new(MatrixIdent::Accumulator, 16, 16, 16, MatrixLayout::Undefined);
//!
//! cmma::fill(&mut c, 0.0);
//! cmma::load(&mut a, &lhs_smem, 0, 16);
//! cmma::load(&mut b, &rhs_smem, 0, 16);
//! cmma::execute(&a, &b, &mut c);
//! cmma::store(&out_smem, &c, 0, 16, MatrixLayout::RowMajor);
//! ```

use crate::Numeric;
use crate::memory::{Readable, Writable};

/// Role of a fragment in a multiply-accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixIdent {
    /// Left operand, `m x k`.
    A,
    /// Right operand, `k x n`.
    B,
    /// Accumulator, `m x n`.
    Accumulator,
}

/// Memory layout of a fragment source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixLayout {
    /// Rows are contiguous.
    RowMajor,
    /// Columns are contiguous.
    ColMajor,
    /// Decided when loading or storing. Behaves as row major.
    Undefined,
}

/// A fragment of a multiply-accumulate.
#[derive(Debug, Clone)]
pub struct Matrix<E: Numeric> {
    ident: MatrixIdent,
    m: usize,
    n: usize,
    k: usize,
    layout: MatrixLayout,
    values: Vec<E>,
}

impl<E: Numeric> Matrix<E> {
    /// Creates a zeroed fragment of shape `m x n x k`.
    pub fn new(ident: MatrixIdent, m: usize, n: usize, k: usize, layout: MatrixLayout) -> Self {
        let (rows, cols) = shape(ident, m, n, k);
        Self {
            ident,
            m,
            n,
            k,
            layout,
            values: vec![E::zero(); rows * cols],
        }
    }

    /// Creates a fragment filled with `value`.
    pub fn from_value(
        ident: MatrixIdent,
        m: usize,
        n: usize,
        k: usize,
        layout: MatrixLayout,
        value: E,
    ) -> Self {
        let mut matrix = Self::new(ident, m, n, k, layout);
        fill(&mut matrix, value);
        matrix
    }

    /// Role of the fragment.
    pub fn ident(&self) -> MatrixIdent {
        self.ident
    }

    /// `(m, n, k)`.
    pub fn size(&self) -> (usize, usize, usize) {
        (self.m, self.n, self.k)
    }

    /// `(rows, cols)` of the fragment, depending on its role.
    pub fn shape(&self) -> (usize, usize) {
        shape(self.ident, self.m, self.n, self.k)
    }

    fn position(&self, row: usize, col: usize, stride: usize, layout: MatrixLayout) -> usize {
        match layout {
            MatrixLayout::ColMajor => col * stride + row,
            MatrixLayout::RowMajor | MatrixLayout::Undefined => row * stride + col,
        }
    }
}

fn shape(ident: MatrixIdent, m: usize, n: usize, k: usize) -> (usize, usize) {
    match ident {
        MatrixIdent::A => (m, k),
        MatrixIdent::B => (k, n),
        MatrixIdent::Accumulator => (m, n),
    }
}

/// Fills the fragment with `value`.
pub fn fill<E: Numeric>(mat: &mut Matrix<E>, value: E) {
    mat.values.fill(value);
}

/// Loads the fragment from `source`, using the layout the fragment was created with.
///
/// `stride` is the distance between two rows (or columns when col major) of the source.
pub fn load<E: Numeric, R: Readable<E> + ?Sized>(
    mat: &mut Matrix<E>,
    source: &R,
    offset: usize,
    stride: usize,
) {
    let layout = mat.layout;
    let (rows, cols) = mat.shape();
    for row in 0..rows {
        for col in 0..cols {
            let position = mat.position(row, col, stride, layout);
            mat.values[row * cols + col] = source.read(offset + position);
        }
    }
}

/// Multiply-accumulate `c += a * b`, computed in the precision of the accumulator.
///
/// # Panics
///
/// When the fragments don't share the same `m x n x k` shape.
pub fn execute<A: Numeric, B: Numeric, C: Numeric>(
    a: &Matrix<A>,
    b: &Matrix<B>,
    c: &mut Matrix<C>,
) {
    assert!(
        a.ident == MatrixIdent::A
            && b.ident == MatrixIdent::B
            && c.ident == MatrixIdent::Accumulator,
        "Fragments used with the wrong roles"
    );
    assert!(
        a.size() == c.size() && b.size() == c.size(),
        "Fragments of different shapes: {:?}, {:?}, {:?}",
        a.size(),
        b.size(),
        c.size()
    );

    let (m, n, k) = c.size();
    for row in 0..m {
        for col in 0..n {
            let mut acc = c.values[row * n + col];
            for i in 0..k {
                let lhs = C::cast_from(a.values[row * k + i]);
                let rhs = C::cast_from(b.values[i * n + col]);
                acc += lhs * rhs;
            }
            c.values[row * n + col] = acc;
        }
    }
}

/// Stores the fragment into `output`.
pub fn store<E: Numeric, W: Writable<E> + ?Sized>(
    output: &W,
    mat: &Matrix<E>,
    offset: usize,
    stride: usize,
    layout: MatrixLayout,
) {
    let (rows, cols) = mat.shape();
    for row in 0..rows {
        for col in 0..cols {
            let position = mat.position(row, col, stride, layout);
            output.write(offset + position, mat.values[row * cols + col]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SharedMemory;
    use half::f16;

    #[test]
    fn fragments_multiply_and_accumulate() {
        let lhs: Vec<f16> = (0..4).map(|v| f16::from_f32(v as f32 + 1.0)).collect();
        let rhs: Vec<f16> = (5..9).map(|v| f16::from_f32(v as f32)).collect();
        let mut a = Matrix::<f16>::new(MatrixIdent::A, 2, 2, 2, MatrixLayout::RowMajor);
        let mut b = Matrix::<f16>::new(MatrixIdent::B, 2, 2, 2, MatrixLayout::RowMajor);
        let mut c = Matrix::<f32>::from_value(
            MatrixIdent::Accumulator,
            2,
            2,
            2,
            MatrixLayout::Undefined,
            1.0,
        );

        load(&mut a, &lhs, 0, 2);
        load(&mut b, &rhs, 0, 2);
        execute(&a, &b, &mut c);

        let out = SharedMemory::<f32>::new(4);
        store(&out, &c, 0, 2, MatrixLayout::RowMajor);
        assert_eq!(out.to_vec(), vec![20.0, 23.0, 44.0, 51.0]);
    }

    #[test]
    fn col_major_sources_are_transposed() {
        let source = vec![1.0f32, 3.0, 2.0, 4.0];
        let mut b = Matrix::<f32>::new(MatrixIdent::B, 2, 2, 2, MatrixLayout::ColMajor);
        load(&mut b, &source, 0, 2);

        let out = SharedMemory::<f32>::new(4);
        store(&out, &b, 0, 2, MatrixLayout::RowMajor);
        assert_eq!(out.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    #[should_panic]
    fn mismatched_shapes_panic() {
        let a = Matrix::<f32>::new(MatrixIdent::A, 16, 16, 16, MatrixLayout::RowMajor);
        let b = Matrix::<f32>::new(MatrixIdent::B, 16, 16, 8, MatrixLayout::RowMajor);
        let mut c = Matrix::<f32>::new(MatrixIdent::Accumulator, 16, 16, 16, MatrixLayout::Undefined);
        execute(&a, &b, &mut c);
    }
}
