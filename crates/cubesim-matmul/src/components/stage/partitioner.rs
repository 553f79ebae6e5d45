use crate::components::TilingScheme;

/// The partition of the stage assigned to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanePartition {
    /// Partition row in the stage.
    pub row: u32,
    /// Partition column in the stage.
    pub col: u32,
    /// Inactive planes join every barrier but do no fragment work and no writes.
    pub active: bool,
}

/// Assigns stage partitions to planes, row by row.
#[derive(Debug, Clone, Copy, new)]
pub struct PlanePartitioner {
    partitions_m: u32,
    partitions_n: u32,
}

impl PlanePartitioner {
    pub fn from_tiling_scheme(tiling_scheme: &TilingScheme) -> Self {
        Self::new(
            tiling_scheme.partitions_in_stage_m(),
            tiling_scheme.partitions_in_stage_n(),
        )
    }

    pub fn assign(&self, plane_index: u32) -> PlanePartition {
        let row = plane_index / self.partitions_n;
        let col = plane_index % self.partitions_n;

        PlanePartition {
            row,
            col,
            active: row < self.partitions_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes_fill_the_stage_row_by_row() {
        let partitioner = PlanePartitioner::new(2, 3);

        let assigned: Vec<(u32, u32)> = (0..6)
            .map(|plane| partitioner.assign(plane))
            .map(|partition| (partition.row, partition.col))
            .collect();

        assert_eq!(assigned, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn extra_planes_are_inactive() {
        let partitioner = PlanePartitioner::new(2, 2);

        assert!((0..4).all(|plane| partitioner.assign(plane).active));
        let extra = partitioner.assign(5);
        assert_eq!((extra.row, extra.col, extra.active), (2, 1, false));
    }
}
