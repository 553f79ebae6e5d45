use cubesim::matmul::components::tile::TileKind;
use cubesim::matmul::components::{AccG, Flex32, LhsG, MatmulPrecision, RhsG};
use cubesim::matmul::{Selection, Strategy};
use cubesim::prelude::*;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

struct MatmulBench<MP: MatmulPrecision> {
    m: usize,
    k: usize,
    n: usize,
    strategy: Strategy,
    client: ComputeClient,
    _mp: PhantomData<MP>,
}

impl<MP: MatmulPrecision> MatmulBench<MP> {
    fn prepare(&self) -> (TensorHandle<LhsG<MP>>, TensorHandle<RhsG<MP>>) {
        let lhs = vec![LhsG::<MP>::from_f32(0.5); self.m * self.k];
        let rhs = vec![RhsG::<MP>::from_f32(0.25); self.k * self.n];

        (
            self.client.create(&lhs, self.m, self.k),
            self.client.create(&rhs, self.k, self.n),
        )
    }

    fn execute(&self, (lhs, rhs): &(TensorHandle<LhsG<MP>>, TensorHandle<RhsG<MP>>)) {
        let out = self.client.empty::<AccG<MP>>(self.m, self.n);

        if let Err(err) = cubesim::matmul::launch::<MP>(&self.client, &self.strategy, lhs, rhs, &out)
        {
            println!("Skipping {}: {err}", self.name());
        }
    }

    fn num_samples(&self) -> usize {
        10
    }

    fn name(&self) -> String {
        format!(
            "matmul-{}x{}x{}-{}-{:?}",
            self.m,
            self.n,
            self.k,
            LhsG::<MP>::elem(),
            self.strategy
        )
        .to_lowercase()
    }

    fn run(&self) -> Vec<Duration> {
        let args = self.prepare();

        // Warmup
        self.execute(&args);

        (0..self.num_samples())
            .map(|_| {
                let start = Instant::now();
                self.execute(&args);
                start.elapsed()
            })
            .collect()
    }
}

fn report(name: &str, mut durations: Vec<Duration>) {
    durations.sort();
    let total: Duration = durations.iter().sum();
    let mean = total / durations.len() as u32;
    let median = durations[durations.len() / 2];

    println!("{name}");
    println!(
        "  mean: {mean:?}, median: {median:?}, min: {:?}, max: {:?}",
        durations[0],
        durations[durations.len() - 1]
    );
}

fn run<MP: MatmulPrecision>(strategy: Strategy) {
    let bench = MatmulBench::<MP> {
        m: 256,
        k: 256,
        n: 256,
        strategy,
        client: ComputeClient::default(),
        _mp: PhantomData,
    };

    report(&bench.name(), bench.run());
}

fn main() {
    run::<f32>(Strategy::Naive);
    run::<f32>(Strategy::Simple(TileKind::Register, Selection::Inferred));
    run::<f32>(Strategy::DoubleBuffering(TileKind::Register, Selection::Inferred));
    run::<Flex32>(Strategy::Simple(TileKind::Accelerated, Selection::Inferred));
    run::<half::f16>(Strategy::SimpleBarrier(TileKind::Accelerated, Selection::Inferred));
}
