use cubesim_runtime::{ExecutionMode, Numeric, client::ComputeClient, memory::TensorHandle};
use pretty_assertions::assert_eq;

use crate::components::{
    AccG, AccS, LhsG, LhsS, MatmulPrecision, MatmulProblem, MatmulSetupError, RhsG, RhsS,
};
use crate::reference::matmul_cpu;
use crate::tests::test_utils::{Tolerance, assert_equals_approx, sample};
use crate::{Strategy, launch};

/// Client used by the generated tests.
pub fn test_client() -> ComputeClient {
    ComputeClient::default()
}

/// Inputs and output of a test launch.
pub struct TestTensors<MP: MatmulPrecision> {
    pub lhs: TensorHandle<LhsG<MP>>,
    pub rhs: TensorHandle<RhsG<MP>>,
    pub out: TensorHandle<AccG<MP>>,
}

impl<MP: MatmulPrecision> TestTensors<MP> {
    /// Random operands for `problem`, with a zeroed output.
    pub fn random(client: &ComputeClient, problem: &MatmulProblem) -> Self {
        let lhs = sample::<LhsG<MP>>(problem.m * problem.k, 1234);
        let rhs = sample::<RhsG<MP>>(problem.k * problem.n, 5678);

        Self::from_data(client, problem, &lhs, &rhs)
    }

    pub fn from_data(
        client: &ComputeClient,
        problem: &MatmulProblem,
        lhs: &[LhsG<MP>],
        rhs: &[RhsG<MP>],
    ) -> Self {
        Self {
            lhs: client.create(lhs, problem.m, problem.k),
            rhs: client.create(rhs, problem.k, problem.n),
            out: client.empty(problem.m, problem.n),
        }
    }

    /// The expected output, computed from operands rounded to the stage precision.
    pub fn expected(&self, client: &ComputeClient, problem: &MatmulProblem) -> Vec<f32> {
        let lhs: Vec<LhsS<MP>> = client
            .read(&self.lhs)
            .into_iter()
            .map(LhsS::<MP>::cast_from)
            .collect();
        let rhs: Vec<RhsS<MP>> = client
            .read(&self.rhs)
            .into_iter()
            .map(RhsS::<MP>::cast_from)
            .collect();

        matmul_cpu(&lhs, &rhs, problem.m, problem.n, problem.k)
    }

    pub fn launch(&self, client: &ComputeClient, strategy: &Strategy) -> Result<(), MatmulSetupError> {
        launch::<MP>(client, strategy, &self.lhs, &self.rhs, &self.out)
    }
}

/// Test the correctness of the specified strategy on the given client,
/// against a naive CPU implementation over the given problem.
///
/// Strategies the device can't run are skipped, unless `MATMUL_TEST_MODE=panic`.
pub fn test_matmul_strategy<MP: MatmulPrecision>(
    client: &ComputeClient,
    problem: MatmulProblem,
    strategy: &Strategy,
) {
    let panic_on_launch_err = matches!(std::env::var("MATMUL_TEST_MODE").as_deref(), Ok("panic"));

    let tensors = TestTensors::<MP>::random(client, &problem);

    match tensors.launch(client, strategy) {
        Ok(()) => {}
        Err(MatmulSetupError::Unavailable(err)) if !panic_on_launch_err => {
            println!("Can't launch the test: {err}");
            return;
        }
        Err(err) => panic!("Can't launch the test: {err}"),
    }

    let expected = tensors.expected(client, &problem);
    let actual = client.read(&tensors.out);
    let tolerance = Tolerance::for_elems::<LhsS<MP>, RhsS<MP>, AccS<MP>, AccG<MP>>();

    if let Err(err) = assert_equals_approx(&actual, &expected, tolerance) {
        panic!("{strategy:?} on {problem:?}: {err}");
    }

    if client.execution_mode() == ExecutionMode::Checked {
        assert_eq!(
            tensors.out.write_counts(),
            vec![1; problem.m * problem.n],
            "Every output element is written exactly once"
        );
    }
}
