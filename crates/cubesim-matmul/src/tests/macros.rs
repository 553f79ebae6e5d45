#[macro_export]
macro_rules! testgen_matmul {
    () => {
        mod matmul {
            use super::*;
            use $crate::components::tile::TileKind;
            use $crate::{Selection, Strategy};

            mod simple_accelerated {
                use super::*;
                $crate::testgen_matmul_precision!(
                    Strategy::Simple(TileKind::Accelerated, Selection::Inferred),
                    sync
                );
            }

            mod simple_register {
                use super::*;
                $crate::testgen_matmul_precision!(
                    Strategy::Simple(TileKind::Register, Selection::Inferred),
                    sync
                );
            }

            mod simple_barrier_accelerated {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::SimpleBarrier(
                    TileKind::Accelerated,
                    Selection::Inferred
                ));
            }

            mod simple_barrier_register {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::SimpleBarrier(
                    TileKind::Register,
                    Selection::Inferred
                ));
            }

            #[cfg(feature = "matmul_tests_double")]
            mod double_buffering_accelerated {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::DoubleBuffering(
                    TileKind::Accelerated,
                    Selection::Inferred
                ));
            }

            #[cfg(feature = "matmul_tests_double")]
            mod double_buffering_register {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::DoubleBuffering(
                    TileKind::Register,
                    Selection::Inferred
                ));
            }

            mod naive {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::Naive, sync);
            }

            mod auto {
                use super::*;
                $crate::testgen_matmul_precision!(Strategy::Auto, sync);
            }
        }
    };
}

/// Precisions whose global and stage types match, usable with every loading strategy.
///
/// The `sync` form adds precisions that cast while staging.
#[macro_export]
macro_rules! testgen_matmul_precision {
    ($strategy: expr) => {
        mod f32_ty {
            use super::*;
            $crate::testgen_matmul_problem_size!($strategy, f32);
        }

        #[cfg(feature = "matmul_tests_f16")]
        mod f16_ty {
            use super::*;
            $crate::testgen_matmul_problem_size!($strategy, $crate::tests::f16);
        }

        #[cfg(feature = "matmul_tests_f16")]
        mod bf16_ty {
            use super::*;
            $crate::testgen_matmul_problem_size!($strategy, $crate::tests::bf16);
        }
    };
    ($strategy: expr, sync) => {
        $crate::testgen_matmul_precision!($strategy);

        mod flex32 {
            use super::*;
            $crate::testgen_matmul_problem_size!($strategy, $crate::components::Flex32);
        }
    };
}

#[macro_export]
macro_rules! testgen_matmul_problem_size {
    ($strategy: expr, $precision: ty) => {
        mod g64x64x64 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 64, 64, 64);
        }

        // Nothing is a multiple of the tile sizes
        mod g47x33x29 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 47, 33, 29);
        }

        #[cfg(feature = "matmul_tests_alt_shapes")]
        mod g100x99x101 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 100, 99, 101);
        }

        #[cfg(feature = "matmul_tests_alt_shapes")]
        mod g1x128x256 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 1, 128, 256);
        }

        #[cfg(feature = "matmul_tests_alt_shapes")]
        mod g128x1x256 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 128, 1, 256);
        }

        #[cfg(feature = "matmul_tests_alt_shapes")]
        mod g256x256x16 {
            use super::*;
            $crate::testgen_matmul_launch!($strategy, $precision, 256, 256, 16);
        }
    };
}

#[macro_export]
macro_rules! testgen_matmul_launch {
    ($strategy: expr, $precision: ty, $m: expr, $n: expr, $k: expr) => {
        #[test]
        pub fn test() {
            let client = $crate::tests::test_client();
            $crate::tests::test_matmul_strategy::<$precision>(
                &client,
                $crate::components::MatmulProblem::new($m, $n, $k),
                &$strategy,
            );
        }
    };
}
