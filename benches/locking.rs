// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for local lock mediation and the lock protocol.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strontium_lock::locking::{
    KeyColumn, LocalLockMediator, LockMediators, Locker, MemoryLockBackend, MemoryLockStore,
};
use strontium_lock::time::{Clock, ManualClock, Timestamp};

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)))
}

fn bench_claim_release(c: &mut Criterion) {
    let clock = manual_clock();
    let mediator = LocalLockMediator::<u64>::new("bench", clock.clone());
    let expires = clock.now().saturating_add(Duration::from_secs(60));
    let counter = AtomicU64::new(0);

    c.bench_function("mediator::claim_release", |b| {
        b.iter_batched(
            || {
                let i = counter.fetch_add(1, Ordering::Relaxed);
                KeyColumn::new(format!("key{}", i).as_str(), "col")
            },
            |id| {
                let claimed = mediator.claim(&id, &1, expires);
                black_box(mediator.release(&id, &1));
                black_box(claimed)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_claim_renew(c: &mut Criterion) {
    let clock = manual_clock();
    let mediator = LocalLockMediator::<u64>::new("bench", clock.clone());
    let id = KeyColumn::new("hot", "col");
    let expires = clock.now().saturating_add(Duration::from_secs(60));
    mediator.claim(&id, &1, expires);

    c.bench_function("mediator::renew", |b| {
        b.iter(|| black_box(mediator.claim(&id, &1, expires)))
    });
}

fn bench_claim_contended(c: &mut Criterion) {
    let clock = manual_clock();
    let mediator = LocalLockMediator::<u64>::new("bench", clock.clone());
    let id = KeyColumn::new("hot", "col");
    let expires = clock.now().saturating_add(Duration::from_secs(60));
    mediator.claim(&id, &1, expires);

    c.bench_function("mediator::claim_contended", |b| {
        b.iter(|| black_box(mediator.claim(&id, &2, expires)))
    });
}

fn bench_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("locker");
    group.throughput(Throughput::Elements(1));

    let clock = manual_clock();
    let store = Arc::new(MemoryLockStore::new());
    let backend = MemoryLockBackend::new(store, "bench", clock.clone())
        .with_lock_wait(Duration::from_millis(1));
    let registry = LockMediators::new();
    let locker = Locker::builder(backend)
        .clock(clock.clone())
        .mediator_name(&registry, "bench")
        .build()
        .unwrap();
    let counter = AtomicU64::new(0);

    group.bench_function("write_check_delete", |b| {
        b.iter_batched(
            || counter.fetch_add(1, Ordering::Relaxed),
            |tx| {
                let id = KeyColumn::new(format!("key{}", tx).as_str(), "col");
                locker.write_lock(&id, &tx).unwrap();
                locker.check_locks(&tx).unwrap();
                locker.delete_locks(&tx).unwrap();
                black_box(tx)
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("write_abort", |b| {
        b.iter_batched(
            || counter.fetch_add(1, Ordering::Relaxed),
            |tx| {
                let id = KeyColumn::new(format!("key{}", tx).as_str(), "col");
                locker.write_lock(&id, &tx).unwrap();
                locker.delete_locks(&tx).unwrap();
                black_box(tx)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_claim_release,
    bench_claim_renew,
    bench_claim_contended,
    bench_protocol,
);
criterion_main!(benches);
