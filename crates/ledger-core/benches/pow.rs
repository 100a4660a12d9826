use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use powledger_core::{mine::mine_block_parallel, pow::mine_block, Block, Record};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn candidates(n: usize) -> Vec<Block> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            let record = Record::new(format!("alice-{i}"), "bob", rng.gen_range(1.0..100.0));
            Block::candidate(record, 42, "0")
        })
        .collect()
}

fn bench_pow(c: &mut Criterion) {
    let blocks = candidates(8);
    let mut group = c.benchmark_group("mine_block");
    for difficulty in [2usize, 3, 4] {
        group.bench_with_input(
            BenchmarkId::new("sequential", difficulty),
            &difficulty,
            |b, &d| {
                b.iter(|| {
                    for block in &blocks {
                        let _mined = mine_block(block.clone(), d);
                    }
                });
            },
        );
        group.bench_with_input(BenchmarkId::new("parallel", difficulty), &difficulty, |b, &d| {
            b.iter(|| {
                for block in &blocks {
                    let _mined = mine_block_parallel(block.clone(), d);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
