//! # Schulte Pool Benchmarks
//!
//! | Area | What is measured |
//! |------|------------------|
//! | Puzzle generation | Shuffle + encode per grid size |
//! | Submission check | Full walk of a correct sequence |
//! | Proof issuance | Forged vs bounded search per difficulty |
//! | Claim path | Submit + claim + open next block (in-memory store) |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sp_01_block_mining::domain::{
    check_sequence, puzzle, solve, BoundedSearchProof, ForgedProof, ProofInput, ProofPolicy,
    SchulteTask, GENESIS_HASH,
};
use sp_01_block_mining::{
    InMemoryBlockStore, MiningPoolApi, MiningPoolService, PoolConfig, Submission, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Puzzle generation
// ============================================================================

fn bench_puzzle_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("puzzle-generation");
    let mut rng = StdRng::seed_from_u64(7);

    for size in [5u32, 10, 15] {
        group.throughput(Throughput::Elements(u64::from(size * size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let puzzle = puzzle::generate(size, &mut rng).unwrap();
                black_box(puzzle.to_task_json().unwrap())
            })
        });
    }
    group.finish();
}

// ============================================================================
// Submission check
// ============================================================================

fn bench_sequence_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence-check");
    let mut rng = StdRng::seed_from_u64(11);

    for size in [5u32, 15] {
        let json = puzzle::generate(size, &mut rng).unwrap().to_task_json().unwrap();
        let task = SchulteTask::parse(&json).unwrap();
        let positions = solve(&task).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| check_sequence(black_box(&task), black_box(&positions)))
        });
    }
    group.finish();
}

// ============================================================================
// Proof issuance
// ============================================================================

fn bench_proof_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof-issuance");
    group.measurement_time(Duration::from_secs(5));

    let task_json = r#"{"grid":[[1,2],[3,4]],"size":2,"type":"schulte"}"#;
    let forged = ForgedProof::new(100_000);
    let bounded = BoundedSearchProof::new(2_000);

    for difficulty in [2u32, 4, 8] {
        let input = ProofInput {
            prev_hash: GENESIS_HASH,
            task_json,
            solver_tag: "alice|north",
            difficulty,
        };
        group.bench_with_input(BenchmarkId::new("forged", difficulty), &input, |b, input| {
            b.iter(|| forged.issue(black_box(input)))
        });
        group.bench_with_input(BenchmarkId::new("bounded", difficulty), &input, |b, input| {
            b.iter(|| bounded.issue(black_box(input)))
        });
    }
    group.finish();
}

// ============================================================================
// Claim path
// ============================================================================

fn bench_claim_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim-path");
    let service = MiningPoolService::new(
        PoolConfig::default(),
        Arc::new(InMemoryBlockStore::new()),
        Arc::new(SystemClock),
    )
    .unwrap();
    let solver = service.join("bench", "lab", None).unwrap();

    group.bench_function("submit-and-open-next", |b| {
        b.iter(|| {
            let block = service.ensure_open_block(false).unwrap();
            let task = SchulteTask::parse(&block.task_json).unwrap();
            let positions = solve(&task).unwrap();
            let outcome = service
                .submit(&Submission::for_open_block(solver.id, positions))
                .unwrap();
            assert!(outcome.is_accepted());
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_puzzle_generation,
    bench_sequence_check,
    bench_proof_policies,
    bench_claim_path
);
criterion_main!(benches);
