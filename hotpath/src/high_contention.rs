use ledger::prelude::*;
use std::sync::Arc;
use tokio::runtime::Builder;

/// High-contention hotpath profiling with a skewed account distribution
///
/// 80% of transfers touch the 20 hottest accounts, so lock waits and
/// optimistic retries dominate. Each strategy runs the same workload.
///
/// Run with: cargo run --release --bin hotpath_high_contention --features profiling
#[hotpath::main]
fn main() {
    println!("=== High Contention Hotpath Profile ===");
    println!("Workload: 1M transfers, 100 concurrent workers, 80/20 account access");
    println!();

    let runtime = Builder::new_multi_thread()
        .worker_threads(8)
        .build()
        .unwrap();

    for strategy in StrategyKind::ALL {
        println!("Profiling strategy: {strategy}");
        let total = runtime.block_on(run_skewed_workload(strategy));
        println!("Total after run: {total}");
        println!();
    }

    println!("Profiling complete.");
}

#[hotpath::measure]
async fn run_skewed_workload(strategy: StrategyKind) -> Money {
    let num_workers = 100;
    let transfers_per_worker = 10_000;
    let hot_accounts = 20usize;
    let total_accounts = 100usize;

    let ledger = Arc::new(Ledger::new(strategy));
    let ids: Arc<Vec<AccountId>> = Arc::new(
        (0..total_accounts)
            .map(|i| AccountId::new(format!("acc-{i}")))
            .collect(),
    );
    open_accounts(&ledger, &ids);

    let mut handles = Vec::new();
    for worker in 0..num_workers {
        let ledger = Arc::clone(&ledger);
        let ids = Arc::clone(&ids);

        // Ledger calls are synchronous; keep them off the async workers
        handles.push(tokio::task::spawn_blocking(move || {
            run_worker(worker, transfers_per_worker, &ledger, &ids, hot_accounts)
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        rejected += handle.await.unwrap();
    }
    println!("Rejected transfers: {rejected}");

    ledger.total_balance(Currency::USD).unwrap()
}

#[hotpath::measure]
fn open_accounts(ledger: &Ledger, ids: &[AccountId]) {
    for id in ids {
        ledger
            .open_account(id.clone(), Money::from_major(10_000, Currency::USD))
            .unwrap();
    }
}

#[hotpath::measure]
fn run_worker(
    worker: usize,
    num_transfers: usize,
    ledger: &Ledger,
    ids: &[AccountId],
    hot_accounts: usize,
) -> usize {
    let cold_accounts = ids.len() - hot_accounts;
    let pick = |i: usize| {
        if i % 5 < 4 {
            i % hot_accounts
        } else {
            hot_accounts + i % cold_accounts
        }
    };

    let mut rejected = 0;
    for i in 0..num_transfers {
        let origin = pick(worker * 7 + i);
        let mut destiny = pick(worker * 13 + i * 3 + 1);
        if destiny == origin {
            destiny = (destiny + 1) % ids.len();
        }

        if process_transfer(ledger, &ids[origin], &ids[destiny], i).is_err() {
            rejected += 1;
        }
    }
    rejected
}

#[hotpath::measure]
fn process_transfer(
    ledger: &Ledger,
    origin: &AccountId,
    destiny: &AccountId,
    i: usize,
) -> Result<(), LedgerError> {
    let amount = Money::from_major(((i % 50) + 1) as i64, Currency::USD);
    ledger.transfer(origin, destiny, &amount)
}
