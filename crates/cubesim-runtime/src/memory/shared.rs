use crate::Numeric;
use core::marker::PhantomData;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

/// Memory that elements can be read from, used as the source of fragment loads.
pub trait Readable<E: Numeric> {
    /// Reads the element at `index`.
    fn read(&self, index: usize) -> E;
}

/// Memory that elements can be written to, used as the target of fragment stores.
pub trait Writable<E: Numeric>: Readable<E> {
    /// Writes the element at `index`.
    fn write(&self, index: usize, value: E);
}

/// Memory shared by all the planes of a cube.
///
/// Accesses are relaxed: ordering between planes comes from the cube barrier. Indexing past
/// the allocation is a kernel bug and panics.
#[derive(Debug)]
pub struct SharedMemory<E: Numeric> {
    words: Arc<[AtomicU32]>,
    _elem: PhantomData<E>,
}

impl<E: Numeric> Clone for SharedMemory<E> {
    fn clone(&self) -> Self {
        Self {
            words: self.words.clone(),
            _elem: PhantomData,
        }
    }
}

impl<E: Numeric> SharedMemory<E> {
    /// A zeroed allocation of `len` elements.
    pub(crate) fn new(len: usize) -> Self {
        let zero = E::zero().to_bits();
        Self::from_words((0..len).map(|_| AtomicU32::new(zero)).collect())
    }

    /// The underlying words, shared with every view of this allocation.
    pub(crate) fn words(&self) -> Arc<[AtomicU32]> {
        self.words.clone()
    }

    pub(crate) fn from_words(words: Arc<[AtomicU32]>) -> Self {
        Self {
            words,
            _elem: PhantomData,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the allocation is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Sub-range of this allocation, used as the destination of asynchronous copies.
    pub fn slice(&self, offset: usize, len: usize) -> SharedSlice<E> {
        SharedSlice {
            memory: self.clone(),
            offset,
            len,
        }
    }

    /// Copies the whole allocation.
    pub fn to_vec(&self) -> Vec<E> {
        self.words
            .iter()
            .map(|word| E::from_bits(word.load(Ordering::Relaxed)))
            .collect()
    }
}

impl<E: Numeric> Readable<E> for SharedMemory<E> {
    fn read(&self, index: usize) -> E {
        E::from_bits(self.words[index].load(Ordering::Relaxed))
    }
}

impl<E: Numeric> Writable<E> for SharedMemory<E> {
    fn write(&self, index: usize, value: E) {
        self.words[index].store(value.to_bits(), Ordering::Relaxed);
    }
}

impl<E: Numeric> Readable<E> for [E] {
    fn read(&self, index: usize) -> E {
        self[index]
    }
}

impl<E: Numeric> Readable<E> for Vec<E> {
    fn read(&self, index: usize) -> E {
        self[index]
    }
}

/// A contiguous range of shared memory.
#[derive(Debug, Clone)]
pub struct SharedSlice<E: Numeric> {
    memory: SharedMemory<E>,
    offset: usize,
    len: usize,
}

impl<E: Numeric> SharedSlice<E> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First element in the allocation.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<E: Numeric> Readable<E> for SharedSlice<E> {
    fn read(&self, index: usize) -> E {
        assert!(index < self.len, "Index {index} out of slice of {}", self.len);
        self.memory.read(self.offset + index)
    }
}

impl<E: Numeric> Writable<E> for SharedSlice<E> {
    fn write(&self, index: usize, value: E) {
        assert!(index < self.len, "Index {index} out of slice of {}", self.len);
        self.memory.write(self.offset + index, value)
    }
}
