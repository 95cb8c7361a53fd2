use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use futures::io::Cursor;
use ledger::prelude::*;
use std::sync::Arc;
use std::thread;
use tokio::runtime::Runtime;

const TRANSFERS_PER_THREAD: usize = 1_000;

fn usd(units: i64) -> Money {
    Money::from_major(units, Currency::USD)
}

/// Ledger with `accounts` accounts named `acc-0..` holding `opening` each
fn seeded_ledger(strategy: StrategyKind, accounts: usize, opening: i64) -> (Ledger, Vec<AccountId>) {
    let ledger = Ledger::new(strategy);
    let ids: Vec<_> = (0..accounts)
        .map(|i| AccountId::new(format!("acc-{i}")))
        .collect();
    for id in &ids {
        ledger.open_account(id.clone(), usd(opening)).unwrap();
    }
    (ledger, ids)
}

/// Each worker moves 1 USD back and forth between its assigned pair
fn run_workers(ledger: &Ledger, ids: &[AccountId], threads: usize) {
    thread::scope(|scope| {
        for worker in 0..threads {
            scope.spawn(move || {
                let a = &ids[worker % ids.len()];
                let b = &ids[(worker + 1) % ids.len()];
                for _ in 0..TRANSFERS_PER_THREAD / 2 {
                    black_box(ledger.transfer(a, b, &usd(1)).ok());
                    black_box(ledger.transfer(b, a, &usd(1)).ok());
                }
            });
        }
    });
}

/// Single-threaded cost of one transfer
fn bench_uncontended_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_transfer");

    for strategy in StrategyKind::ALL {
        let (ledger, ids) = seeded_ledger(strategy, 2, 1_000_000);
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            b.iter(|| {
                ledger.transfer(&ids[0], &ids[1], &usd(1)).unwrap();
                ledger.transfer(&ids[1], &ids[0], &usd(1)).unwrap();
            });
        });
    }

    group.finish();
}

/// Every thread fights over the same two accounts
fn bench_hot_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("hot_pair");
    group.sample_size(20);

    for threads in [2, 4, 8] {
        for strategy in StrategyKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), threads),
                &threads,
                |b, &threads| {
                    b.iter_batched(
                        || seeded_ledger(strategy, 2, 1_000_000),
                        |(ledger, ids)| run_workers(&ledger, &ids, threads),
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }

    group.finish();
}

/// Threads work on disjoint pairs; only the global lock serialises them
fn bench_disjoint_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("disjoint_pairs");
    group.sample_size(20);

    let threads = 8;
    for strategy in StrategyKind::ALL {
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            b.iter_batched(
                || seeded_ledger(strategy, threads * 2, 1_000_000),
                |(ledger, ids)| {
                    thread::scope(|scope| {
                        for pair in ids.chunks(2) {
                            let ledger = &ledger;
                            scope.spawn(move || {
                                for _ in 0..TRANSFERS_PER_THREAD / 2 {
                                    black_box(ledger.transfer(&pair[0], &pair[1], &usd(1)).ok());
                                    black_box(ledger.transfer(&pair[1], &pair[0], &usd(1)).ok());
                                }
                            });
                        }
                    });
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// CSV commands through the stream processor, one stream per ring leg
fn bench_csv_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_pipeline");
    group.sample_size(10);
    let runtime = Runtime::new().unwrap();

    let legs = [("a", "b"), ("b", "c"), ("c", "a")];
    let rings: Vec<String> = legs
        .iter()
        .map(|(origin, destiny)| {
            let mut csv = String::from("type,account,counterparty,amount,currency\n");
            for _ in 0..2_000 {
                csv.push_str(&format!("transfer,{origin},{destiny},1.00,USD\n"));
            }
            csv
        })
        .collect();

    for strategy in StrategyKind::ALL {
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            b.to_async(&runtime).iter_batched(
                || {
                    let (ledger, _) = seeded_ledger(strategy, 0, 0);
                    for name in ["a", "b", "c"] {
                        ledger.open_account(AccountId::new(name), usd(10_000)).unwrap();
                    }
                    let streams: Vec<_> = rings
                        .iter()
                        .map(|csv| CsvCommandStream::new(Cursor::new(csv.clone().into_bytes())))
                        .collect();
                    (Arc::new(ledger), streams)
                },
                |(ledger, streams)| async move {
                    let mut processor =
                        StreamProcessor::new(Arc::clone(&ledger), SilentSkip).with_shards(3);
                    for stream in streams {
                        processor = processor.add_stream(stream);
                    }
                    black_box(processor.process().await);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_transfer,
    bench_hot_pair,
    bench_disjoint_pairs,
    bench_csv_pipeline
);
criterion_main!(benches);
