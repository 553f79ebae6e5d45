use crate::Numeric;
use core::marker::PhantomData;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

/// A row-major matrix in global memory.
///
/// Handles are cheap to clone and share the same buffer. The buffer holds `rows * stride`
/// elements; columns past `cols` are padding and never part of the logical matrix.
#[derive(Debug)]
pub struct TensorHandle<E: Numeric> {
    data: Arc<[AtomicU32]>,
    writes: Arc<[AtomicU32]>,
    rows: usize,
    cols: usize,
    stride: usize,
    _elem: PhantomData<E>,
}

impl<E: Numeric> Clone for TensorHandle<E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            writes: self.writes.clone(),
            rows: self.rows,
            cols: self.cols,
            stride: self.stride,
            _elem: PhantomData,
        }
    }
}

impl<E: Numeric> TensorHandle<E> {
    pub(crate) fn new(rows: usize, cols: usize, stride: usize) -> Self {
        let len = rows * stride;
        let zero = E::zero().to_bits();
        Self {
            data: (0..len).map(|_| AtomicU32::new(zero)).collect(),
            writes: (0..len).map(|_| AtomicU32::new(0)).collect(),
            rows,
            cols,
            stride,
            _elem: PhantomData,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance between two rows, in elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of elements in the underlying buffer, padding included.
    pub fn buffer_len(&self) -> usize {
        self.data.len()
    }

    /// Whether `(row, col)` lies in the logical matrix.
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Whether both handles point to the same buffer.
    pub fn same_buffer<O: Numeric>(&self, other: &TensorHandle<O>) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.data), Arc::as_ptr(&other.data))
    }

    /// The same buffer viewed with another element type of the same kind.
    ///
    /// Returns `None` when `O` is not the element kind of this tensor.
    pub fn reinterpret<O: Numeric>(&self) -> Option<TensorHandle<O>> {
        if O::elem() != E::elem() {
            return None;
        }

        Some(TensorHandle {
            data: self.data.clone(),
            writes: self.writes.clone(),
            rows: self.rows,
            cols: self.cols,
            stride: self.stride,
            _elem: PhantomData,
        })
    }

    /// Reads the element at a buffer position, `None` past the buffer.
    pub(crate) fn load(&self, index: usize) -> Option<E> {
        self.data
            .get(index)
            .map(|word| E::from_bits(word.load(Ordering::Relaxed)))
    }

    /// Writes the element at a buffer position. Returns false past the buffer.
    pub(crate) fn store(&self, index: usize, value: E) -> bool {
        match self.data.get(index) {
            Some(word) => {
                word.store(value.to_bits(), Ordering::Relaxed);
                self.writes[index].fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Host side initialization of the logical matrix.
    pub(crate) fn fill_from(&self, data: &[E]) {
        for (row, values) in data.chunks(self.cols.max(1)).take(self.rows).enumerate() {
            for (col, value) in values.iter().enumerate() {
                self.data[row * self.stride + col].store(value.to_bits(), Ordering::Relaxed);
            }
        }
    }

    /// Copies the logical matrix into a compact row-major vector.
    pub fn to_vec(&self) -> Vec<E> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let word = self.data[row * self.stride + col].load(Ordering::Relaxed);
                out.push(E::from_bits(word));
            }
        }
        out
    }

    /// Number of kernel writes of every logical element, row-major.
    pub fn write_counts(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                out.push(self.writes[row * self.stride + col].load(Ordering::Relaxed));
            }
        }
        out
    }

    /// Clears the write counters, for reusing an output between launches.
    pub fn reset_write_counts(&self) {
        for count in self.writes.iter() {
            count.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_rows_keep_padding_untouched() {
        let handle = TensorHandle::<f32>::new(2, 2, 3);
        handle.fill_from(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(handle.buffer_len(), 6);
        assert_eq!(handle.load(2), Some(0.0));
        assert_eq!(handle.load(3), Some(3.0));
        assert_eq!(handle.load(6), None);
        assert_eq!(handle.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn writes_are_counted_per_element() {
        let handle = TensorHandle::<f32>::new(1, 2, 2);
        assert!(handle.store(1, 5.0));
        assert!(handle.store(1, 6.0));
        assert!(!handle.store(2, 7.0));

        assert_eq!(handle.write_counts(), vec![0, 2]);
        handle.reset_write_counts();
        assert_eq!(handle.write_counts(), vec![0, 0]);
        assert!(handle.same_buffer(&handle.clone()));
    }

    #[test]
    fn reinterpret_requires_the_same_kind() {
        let handle = TensorHandle::<f32>::new(1, 2, 2);
        handle.fill_from(&[1.5, 2.5]);

        let same = handle.reinterpret::<f32>();
        assert_eq!(same.map(|h| h.to_vec()), Some(vec![1.5, 2.5]));
        assert!(handle.reinterpret::<half::f16>().is_none());
    }
}
