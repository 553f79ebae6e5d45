use serde::{Deserialize, Serialize};

use crate::components::{FormattedConfigError, InvalidConfigError, MatmulIdent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Description of a matmul problem to solve, regardless of actual data
pub struct MatmulProblem {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl MatmulProblem {
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        Self { m, n, k }
    }

    /// Infers the problem from the `(rows, cols)` of the three matrices.
    ///
    /// Fails when the shapes don't chain: `K(lhs) = K(rhs)`, `M(lhs) = M(out)` and
    /// `N(rhs) = N(out)`.
    pub fn from_shapes(
        lhs: (usize, usize),
        rhs: (usize, usize),
        out: (usize, usize),
    ) -> Result<Self, InvalidConfigError> {
        let problem = Self::new(lhs.0, rhs.1, lhs.1);

        for ident in [MatmulIdent::Lhs, MatmulIdent::Rhs, MatmulIdent::Out] {
            let actual = match ident {
                MatmulIdent::Lhs => lhs,
                MatmulIdent::Rhs => rhs,
                MatmulIdent::Out => out,
            };
            let expected = problem.shape(ident);

            if actual != expected {
                return Err(FormattedConfigError::new(move || {
                    format!(
                        "Shape mismatch: {} is {}x{} but lhs {}x{} and rhs {}x{} require {}x{}",
                        ident.name(),
                        actual.0,
                        actual.1,
                        lhs.0,
                        lhs.1,
                        rhs.0,
                        rhs.1,
                        expected.0,
                        expected.1,
                    )
                }));
            }
        }

        Ok(problem)
    }

    /// Returns the shape of the identified tensor, inferred by the problem definition
    pub fn shape(&self, ident: MatmulIdent) -> (usize, usize) {
        match ident {
            MatmulIdent::Lhs => (self.m, self.k),
            MatmulIdent::Rhs => (self.k, self.n),
            MatmulIdent::Out => (self.m, self.n),
        }
    }
}
