use cubesim_runtime::{
    Numeric,
    kernel::KernelContext,
    memory::{BANK_WIDTH, Readable, SharedMemory, SharedSlice, Writable, bank_conflict_degree},
};

/// Shape of a stage in shared memory.
///
/// Rows are `cols + padding` elements apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new)]
pub struct StageLayout {
    pub rows: u32,
    pub cols: u32,
    pub padding: u32,
}

/// How the lanes of a plane walk a stage in one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    /// Lane `i` reads element `i` of a row.
    Row(u32),
    /// Lane `i` reads row `i` of a column.
    Column(u32),
}

impl StageLayout {
    /// Padding of one bank for elements of `elem_size` bytes.
    pub fn bank_padding(elem_size: usize) -> u32 {
        (BANK_WIDTH / elem_size).max(1) as u32
    }

    pub fn stride(&self) -> u32 {
        self.cols + self.padding
    }

    /// Elements allocated, padding included.
    pub fn len(&self) -> usize {
        (self.rows * self.stride()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self, elem_size: usize) -> usize {
        self.len() * elem_size
    }

    /// Position of `(row, col)` in the allocation.
    pub fn index(&self, row: u32, col: u32) -> usize {
        (row * self.stride() + col) as usize
    }

    /// Number of serialized shared memory transactions of one access of `lanes` lanes.
    pub fn bank_conflicts(&self, pattern: AccessPattern, lanes: u32, elem_size: usize) -> usize {
        let addresses: Vec<usize> = match pattern {
            AccessPattern::Row(row) => (0..lanes.min(self.cols))
                .map(|lane| self.index(row, lane) * elem_size)
                .collect(),
            AccessPattern::Column(col) => (0..lanes.min(self.rows))
                .map(|lane| self.index(lane, col) * elem_size)
                .collect(),
        };

        bank_conflict_degree(&addresses)
    }
}

/// One operand slice, or the output block, of a cube in shared memory.
#[derive(Debug, Clone)]
pub struct StageMemory<E: Numeric> {
    memory: SharedMemory<E>,
    layout: StageLayout,
}

impl<E: Numeric> StageMemory<E> {
    /// Shared memory allocation `id` of the cube, viewed as a stage.
    pub fn new(ctx: &KernelContext<'_>, id: u32, layout: StageLayout) -> Self {
        Self {
            memory: ctx.shared::<E>(id, layout.len()),
            layout,
        }
    }

    pub fn layout(&self) -> StageLayout {
        self.layout
    }

    pub fn read(&self, row: u32, col: u32) -> E {
        self.memory.read(self.layout.index(row, col))
    }

    pub fn write(&self, row: u32, col: u32, value: E) {
        self.memory.write(self.layout.index(row, col), value)
    }

    /// `len` elements of a row starting at `(row, col)`.
    pub fn slice(&self, row: u32, col: u32, len: u32) -> SharedSlice<E> {
        self.memory
            .slice(self.layout.index(row, col), len as usize)
    }

    /// The fragment-shaped tile at `(row, col)` in the grid of `rows x cols` tiles.
    pub fn tile(&self, row: u32, col: u32, rows: u32, cols: u32) -> StageTile<'_, E> {
        StageTile {
            memory: &self.memory,
            offset: self.layout.index(row * rows, col * cols),
            stride: self.layout.stride() as usize,
            rows,
            cols,
        }
    }

    /// Copies the logical content, padding excluded.
    pub fn to_vec(&self) -> Vec<E> {
        let mut out = Vec::with_capacity((self.layout.rows * self.layout.cols) as usize);
        for row in 0..self.layout.rows {
            for col in 0..self.layout.cols {
                out.push(self.read(row, col));
            }
        }
        out
    }
}

/// Sub-view of a stage holding one fragment.
#[derive(Debug)]
pub struct StageTile<'a, E: Numeric> {
    memory: &'a SharedMemory<E>,
    offset: usize,
    stride: usize,
    rows: u32,
    cols: u32,
}

impl<E: Numeric> StageTile<'_, E> {
    pub fn memory(&self) -> &SharedMemory<E> {
        self.memory
    }

    /// Position of the first element in the stage allocation.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn shape(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    pub fn read(&self, row: u32, col: u32) -> E {
        self.memory
            .read(self.offset + row as usize * self.stride + col as usize)
    }

    pub fn write(&self, row: u32, col: u32, value: E) {
        self.memory
            .write(self.offset + row as usize * self.stride + col as usize, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_removes_column_conflicts() {
        let unpadded = StageLayout::new(32, 32, 0);
        let padded = StageLayout::new(32, 32, StageLayout::bank_padding(4));

        assert_eq!(unpadded.bank_conflicts(AccessPattern::Column(3), 32, 4), 32);
        assert_eq!(padded.bank_conflicts(AccessPattern::Column(3), 32, 4), 1);
        assert_eq!(padded.bank_conflicts(AccessPattern::Row(5), 32, 4), 1);
    }

    #[test]
    fn half_precision_is_padded_by_two_elements() {
        assert_eq!(StageLayout::bank_padding(2), 2);

        let unpadded = StageLayout::new(32, 64, 0);
        let padded = StageLayout::new(32, 64, StageLayout::bank_padding(2));

        assert_eq!(unpadded.bank_conflicts(AccessPattern::Column(0), 32, 2), 32);
        assert_eq!(padded.bank_conflicts(AccessPattern::Column(0), 32, 2), 1);
    }

    #[test]
    fn layout_counts_padding() {
        let layout = StageLayout::new(4, 8, 1);

        assert_eq!(layout.stride(), 9);
        assert_eq!(layout.len(), 36);
        assert_eq!(layout.index(2, 3), 21);
        assert_eq!(layout.bytes(2), 72);
    }
}
