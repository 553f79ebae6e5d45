use serde::{Deserialize, Serialize};

use crate::components::{FormattedConfigError, InvalidConfigError, MatmulIdent};

/// The three nested tilings of a matmul.
///
/// A tile is the shape of one fragment multiply-accumulate, in elements. A partition is the
/// part of the stage computed by one plane, in tiles; its `k` is the number of tiles along
/// `k` in a stage. A stage is the block of the output computed by one cube, in partitions;
/// its `k` is always 1.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilingScheme {
    pub tile_size: TileSize,
    pub partition_size: PartitionSize,
    pub stage_size: StageSize,
}

impl TilingScheme {
    pub fn builder() -> TilingSchemeBuilder {
        TilingSchemeBuilder::default()
    }

    /// Builds the scheme from sizes in elements: the fragment `(m, n, k)`, the plane
    /// partition `(m, n)` and the cube stage `(m, n, k)`.
    ///
    /// Every level must divide the one above it.
    pub fn from_element_sizes(
        tile: (u32, u32, u32),
        partition: (u32, u32),
        stage: (u32, u32, u32),
    ) -> Result<TilingScheme, InvalidConfigError> {
        let (tile_m, tile_n, tile_k) = tile;
        let (partition_m, partition_n) = partition;
        let (stage_m, stage_n, stage_k) = stage;

        let sizes = [tile_m, tile_n, tile_k, partition_m, partition_n, stage_m, stage_n, stage_k];
        if sizes.contains(&0) {
            return Err(FormattedConfigError::new(move || {
                format!("Tiling sizes must not be zero, got {sizes:?}")
            }));
        }

        for (name, outer, inner) in [
            ("stage m", stage_m, partition_m),
            ("stage n", stage_n, partition_n),
            ("partition m", partition_m, tile_m),
            ("partition n", partition_n, tile_n),
            ("stage k", stage_k, tile_k),
        ] {
            if outer % inner != 0 {
                return Err(FormattedConfigError::new(move || {
                    format!("The {name} size {outer} is not a multiple of {inner}")
                }));
            }
        }

        let scheme = TilingScheme::builder()
            .with_tile_size(TileSize::new(tile_m, tile_n, tile_k))
            .with_partition_size(PartitionSize::new(
                partition_m / tile_m,
                partition_n / tile_n,
                stage_k / tile_k,
            ))
            .with_stage_size(StageSize::new(stage_m / partition_m, stage_n / partition_n, 1))
            .build();

        scheme.map_err(|err| Box::new(err) as InvalidConfigError)
    }

    /// Rejects empty tiles, partitions or stages, and stages spanning more than one
    /// partition along `k`.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let scheme = *self;

        let sizes = [
            self.tile_size.m,
            self.tile_size.n,
            self.tile_size.k,
            self.partition_size.m,
            self.partition_size.n,
            self.partition_size.k,
            self.stage_size.m,
            self.stage_size.n,
        ];

        if sizes.contains(&0) {
            return Err(FormattedConfigError::new(move || {
                format!("Tiling sizes must not be zero, got {scheme:?}")
            }));
        }

        if self.stage_size.k != 1 {
            return Err(FormattedConfigError::new(move || {
                format!("Stage size k must be 1, got {}", scheme.stage_size.k)
            }));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TilingSchemeBuilder {
    tile_size: Option<TileSize>,
    partition_size: Option<PartitionSize>,
    stage_size: Option<StageSize>,
}

impl TilingSchemeBuilder {
    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn with_partition_size(mut self, partition_size: PartitionSize) -> Self {
        self.partition_size = Some(partition_size);
        self
    }

    pub fn with_stage_size(mut self, stage_size: StageSize) -> Self {
        assert!(stage_size.k == 1, "Stage size k > 1 is not supported");
        self.stage_size = Some(stage_size);
        self
    }

    pub fn build(self) -> Result<TilingScheme, &'static str> {
        Ok(TilingScheme {
            tile_size: self.tile_size.ok_or("Missing tile_size")?,
            partition_size: self.partition_size.ok_or("Missing partition_size")?,
            stage_size: self.stage_size.ok_or("Missing stage_size")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MatmulDim {
    M,
    N,
    K,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TilingLevel {
    Stage,
    Partition,
    Tile,
    Element,
}

impl TilingScheme {
    fn try_count_1d(
        &self,
        child_level: TilingLevel,
        parent_level: TilingLevel,
        dim: MatmulDim,
    ) -> Option<u32> {
        use TilingLevel::*;

        match (child_level, parent_level) {
            (child, parent) if child == parent => Some(1),
            (Partition, Stage) => Some(self.stage_size.get(dim)),
            (Tile, Partition) => Some(self.partition_size.get(dim)),
            (Element, Tile) => Some(self.tile_size.get(dim)),
            (Tile, Stage) => Some(
                self.try_count_1d(Partition, Stage, dim)?
                    * self.try_count_1d(Tile, Partition, dim)?,
            ),
            (Element, Stage) => {
                Some(self.try_count_1d(Tile, Stage, dim)? * self.try_count_1d(Element, Tile, dim)?)
            }
            (Element, Partition) => Some(
                self.try_count_1d(Tile, Partition, dim)? * self.try_count_1d(Element, Tile, dim)?,
            ),
            _ => None,
        }
    }

    fn count_1d(&self, child_level: TilingLevel, parent_level: TilingLevel, dim: MatmulDim) -> u32 {
        self.try_count_1d(child_level, parent_level, dim)
            .unwrap_or_else(|| {
                panic!("Invalid hierarchy: {parent_level:?} cannot contain {child_level:?}")
            })
    }

    fn count_1d_ident_row(
        &self,
        child_level: TilingLevel,
        parent_level: TilingLevel,
        ident: MatmulIdent,
    ) -> u32 {
        match ident {
            MatmulIdent::Lhs | MatmulIdent::Out => {
                self.count_1d(child_level, parent_level, MatmulDim::M)
            }
            MatmulIdent::Rhs => self.count_1d(child_level, parent_level, MatmulDim::K),
        }
    }

    fn count_1d_ident_col(
        &self,
        child_level: TilingLevel,
        parent_level: TilingLevel,
        ident: MatmulIdent,
    ) -> u32 {
        match ident {
            MatmulIdent::Lhs => self.count_1d(child_level, parent_level, MatmulDim::K),
            MatmulIdent::Rhs | MatmulIdent::Out => {
                self.count_1d(child_level, parent_level, MatmulDim::N)
            }
        }
    }
}

macro_rules! count_1d_method {
    ($name:ident, $child:ident, $parent:ident, $dim:ident) => {
        pub fn $name(&self) -> u32 {
            self.count_1d(TilingLevel::$child, TilingLevel::$parent, MatmulDim::$dim)
        }
    };
}

macro_rules! count_1d_ident_method {
    ($name:ident, $func:ident, $child:ident, $parent:ident) => {
        pub fn $name(&self, ident: MatmulIdent) -> u32 {
            self.$func(TilingLevel::$child, TilingLevel::$parent, ident)
        }
    };
}

impl TilingScheme {
    count_1d_method!(partitions_in_stage_m, Partition, Stage, M);
    count_1d_method!(partitions_in_stage_n, Partition, Stage, N);

    count_1d_method!(tiles_in_stage_m, Tile, Stage, M);
    count_1d_method!(tiles_in_stage_n, Tile, Stage, N);
    count_1d_method!(tiles_in_stage_k, Tile, Stage, K);

    count_1d_method!(elements_in_stage_m, Element, Stage, M);
    count_1d_method!(elements_in_stage_n, Element, Stage, N);
    count_1d_method!(elements_in_stage_k, Element, Stage, K);
    count_1d_ident_method!(elements_in_stage_row, count_1d_ident_row, Element, Stage);
    count_1d_ident_method!(elements_in_stage_col, count_1d_ident_col, Element, Stage);

    count_1d_method!(tiles_in_partition_m, Tile, Partition, M);
    count_1d_method!(tiles_in_partition_n, Tile, Partition, N);

    count_1d_method!(elements_in_partition_m, Element, Partition, M);
    count_1d_method!(elements_in_partition_n, Element, Partition, N);

    count_1d_method!(elements_in_tile_m, Element, Tile, M);
    count_1d_method!(elements_in_tile_n, Element, Tile, N);
    count_1d_method!(elements_in_tile_k, Element, Tile, K);

    /// Number of partitions in a stage, which is the number of planes doing fragment work.
    pub fn partitions_in_stage_mn(&self) -> u32 {
        self.partitions_in_stage_m() * self.partitions_in_stage_n()
    }
}

macro_rules! define_3d_size {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub m: u32,
            pub n: u32,
            pub k: u32,
        }

        impl $name {
            pub fn new(m: u32, n: u32, k: u32) -> Self {
                $name { m, n, k }
            }

            pub fn get(&self, dim: MatmulDim) -> u32 {
                match dim {
                    MatmulDim::M => self.m,
                    MatmulDim::N => self.n,
                    MatmulDim::K => self.k,
                }
            }

            pub fn m(&self) -> u32 {
                self.m
            }

            pub fn n(&self) -> u32 {
                self.n
            }

            pub fn k(&self) -> u32 {
                self.k
            }

            pub fn mnk(&self) -> u32 {
                self.m * self.n * self.k
            }
        }

        impl From<(u32, u32, u32)> for $name {
            fn from(value: (u32, u32, u32)) -> Self {
                Self::new(value.0, value.1, value.2)
            }
        }
    };
}

define_3d_size!(TileSize, "Number of elements in a tile.");
define_3d_size!(PartitionSize, "Number of tiles in a partition.");
define_3d_size!(StageSize, "Number of partitions in a stage.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes_are_split_per_level() {
        let scheme = TilingScheme::from_element_sizes((16, 16, 16), (32, 64), (64, 128, 32))
            .map_err(|err| err.to_string())
            .unwrap();

        assert_eq!(scheme.partition_size, PartitionSize::new(2, 4, 2));
        assert_eq!(scheme.stage_size, StageSize::new(2, 2, 1));
        assert_eq!(scheme.elements_in_stage_m(), 64);
        assert_eq!(scheme.elements_in_stage_n(), 128);
        assert_eq!(scheme.elements_in_stage_k(), 32);
        assert_eq!(scheme.elements_in_partition_n(), 64);
        assert_eq!(scheme.tiles_in_stage_k(), 2);
        assert_eq!(scheme.partitions_in_stage_mn(), 4);
        assert_eq!(scheme.elements_in_stage_row(MatmulIdent::Rhs), 32);
        assert_eq!(scheme.elements_in_stage_col(MatmulIdent::Lhs), 32);
    }

    #[test]
    fn indivisible_sizes_are_rejected() {
        let err = TilingScheme::from_element_sizes((16, 16, 16), (24, 16), (48, 16, 16))
            .err()
            .map(|err| err.to_string());
        assert_eq!(
            err.as_deref(),
            Some("The partition m size 24 is not a multiple of 16")
        );

        let err = TilingScheme::from_element_sizes((16, 16, 16), (16, 16), (32, 32, 8))
            .err()
            .map(|err| err.to_string());
        assert_eq!(err.as_deref(), Some("The stage k size 8 is not a multiple of 16"));

        assert!(TilingScheme::from_element_sizes((0, 16, 16), (16, 16), (16, 16, 16)).is_err());
    }

    #[test]
    fn empty_levels_fail_validation() {
        let scheme = TilingScheme {
            tile_size: TileSize::new(8, 8, 8),
            partition_size: PartitionSize::new(1, 1, 1),
            stage_size: StageSize::new(1, 1, 1),
        };
        assert!(scheme.validate().is_ok());

        let no_k = TilingScheme {
            partition_size: PartitionSize::new(1, 1, 0),
            ..scheme
        };
        let err = no_k.validate().err().map(|err| err.to_string());
        assert!(err.is_some_and(|err| err.starts_with("Tiling sizes must not be zero")));

        let flat_tile = TilingScheme {
            tile_size: TileSize::new(0, 8, 8),
            ..scheme
        };
        assert!(flat_tile.validate().is_err());

        let deep_stage = TilingScheme {
            stage_size: StageSize::new(1, 1, 2),
            ..scheme
        };
        let err = deep_stage.validate().err().map(|err| err.to_string());
        assert_eq!(err.as_deref(), Some("Stage size k must be 1, got 2"));
    }
}
