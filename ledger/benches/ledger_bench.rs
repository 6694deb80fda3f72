// Transaction processor benchmarks for the bank token ledger.
//
// Covers deposit and transfer throughput, the withdrawal request/resolve
// round trip, and typed event queries over logs of various sizes.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use bank_token::{BankToken, EventType, TokenConfig};

const OWNER: &str = "0xf55583ff8461db9dfbbe90b5f3324f2a290c3356";

/// Deploys with a cap high enough that benchmark loops never trip it.
fn setup_token() -> BankToken {
    let config = TokenConfig::new(OWNER).with_holder_cap(u64::MAX / 2);
    BankToken::deploy(config).0
}

fn bench_deposit(c: &mut Criterion) {
    let mut token = setup_token();
    let mut n = 0u64;

    c.bench_function("ledger/deposit", |b| {
        b.iter(|| {
            n += 1;
            token
                .deposit(OWNER, "0xdepositor", 1, "ext", format!("bank-{}", n))
                .unwrap()
        });
    });
}

fn bench_transfer(c: &mut Criterion) {
    let mut token = setup_token();
    token.deposit(OWNER, "alice", 1_000_000, "ext", "seed-a").unwrap();
    token.deposit(OWNER, "bob", 1_000_000, "ext", "seed-b").unwrap();

    let mut flip = false;
    c.bench_function("ledger/transfer", |b| {
        b.iter(|| {
            flip = !flip;
            let (from, to) = if flip { ("alice", "bob") } else { ("bob", "alice") };
            token.transfer(from, from, to, 1).unwrap()
        });
    });
}

fn bench_withdrawal_round_trip(c: &mut Criterion) {
    let mut token = setup_token();
    token.deposit(OWNER, "alice", 1_000_000, "ext", "seed").unwrap();

    c.bench_function("ledger/withdraw_request_reject", |b| {
        b.iter(|| {
            let receipt = token.request_withdrawal(OWNER, "alice", 10).unwrap();
            let counter = receipt.withdrawal_counter.unwrap_or_default();
            token.reject_withdrawal(OWNER, counter).unwrap()
        });
    });
}

fn bench_event_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/event_query");

    for size in [100u64, 1_000, 10_000] {
        let mut token = setup_token();
        for i in 0..size {
            token
                .deposit(OWNER, format!("acct-{}", i % 16), 5, "ext", format!("tx-{}", i))
                .unwrap();
            if i % 4 == 0 {
                token.request_withdrawal(OWNER, format!("acct-{}", i % 16), 1).unwrap();
            }
        }

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &token, |b, token| {
            b.iter(|| token.get_events(EventType::RequestWithdrawal, size / 2).count());
        });
    }

    group.finish();
}

fn bench_deploy(c: &mut Criterion) {
    c.bench_function("ledger/deploy", |b| {
        b.iter_batched(
            || TokenConfig::new(OWNER),
            BankToken::deploy,
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_deposit,
    bench_transfer,
    bench_withdrawal_round_trip,
    bench_event_query,
    bench_deploy,
);
criterion_main!(benches);
