use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use sweetshop_catalog::{
    CreateSweet, RestockSweet, SWEET_AGGREGATE_TYPE, Sweet, SweetCommand, SweetEvent, SweetId,
    SweetRestocked,
};
use sweetshop_checkout::{CheckoutPolicy, PurchaseRequest};
use sweetshop_core::{Aggregate, AggregateId, ExpectedVersion, Money, PurchaserId};
use sweetshop_events::{EventEnvelope, InMemoryEventBus};
use sweetshop_infra::checkout::PurchaseCoordinator;
use sweetshop_infra::command_dispatcher::CommandDispatcher;
use sweetshop_infra::event_store::{EventStore, InMemoryEventStore, PendingEvent};
use sweetshop_infra::projections::catalog_view::CatalogProjection;
use sweetshop_infra::read_model::InMemoryKeyValueStore;

type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;

fn setup_coordinator() -> (PurchaseCoordinator<Arc<InMemoryEventStore>, Bus>, Arc<InMemoryEventStore>)
{
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let coordinator = PurchaseCoordinator::new(
        CommandDispatcher::new(store.clone(), bus),
        CheckoutPolicy::default(),
    );
    (coordinator, store)
}

fn seed_sweet(store: &Arc<InMemoryEventStore>, quantity: i64) -> SweetId {
    let sweet_id = SweetId::new(AggregateId::new());
    let sweet = Sweet::empty(sweet_id);
    let events = sweet
        .handle(&SweetCommand::CreateSweet(CreateSweet {
            sweet_id,
            name: "Bench Bonbon".to_string(),
            category: "Chocolate".to_string(),
            price: Money::from_cents(199),
            quantity,
            description: None,
            image_url: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
    let uncommitted = PendingEvent::from_domain(
        sweet_id.0,
        SWEET_AGGREGATE_TYPE,
        Uuid::now_v7(),
        &events[0],
    )
    .unwrap();
    store
        .append(vec![uncommitted], ExpectedVersion::Exact(0))
        .unwrap();
    sweet_id
}

/// Naive read-modify-write baseline: unconditional read, separate
/// unconditional update, nothing guarding the gap between them.
#[derive(Debug, Clone)]
struct NaiveCrudStore {
    inner: Arc<RwLock<HashMap<AggregateId, CrudState>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CrudState {
    price_cents: u64,
    quantity: i64,
}

impl NaiveCrudStore {
    fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn create(&self, item_id: AggregateId, price_cents: u64, quantity: i64) {
        let mut map = self.inner.write().unwrap();
        map.insert(
            item_id,
            CrudState {
                price_cents,
                quantity,
            },
        );
    }

    fn purchase(&self, item_id: AggregateId, quantity: i64) -> Result<u64, ()> {
        // Read...
        let state = {
            let map = self.inner.read().unwrap();
            map.get(&item_id).cloned().ok_or(())?
        };
        if state.quantity < quantity {
            return Err(());
        }
        // ...then write, with nothing guarding the gap.
        let mut map = self.inner.write().unwrap();
        if let Some(s) = map.get_mut(&item_id) {
            s.quantity = state.quantity - quantity;
        }
        Ok(state.price_cents * quantity as u64)
    }
}

fn bench_checkout_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkout_latency");
    group.sample_size(1000);

    // Benchmark: first purchase against a fresh stream (minimal history).
    group.bench_function("purchase_fresh_stream", |b| {
        let (coordinator, store) = setup_coordinator();
        b.iter(|| {
            let sweet_id = seed_sweet(&store, 1_000_000);
            coordinator
                .execute_purchase(black_box(PurchaseRequest {
                    sweet_id,
                    purchaser_id: PurchaserId::new(),
                    quantity: 1,
                }))
                .unwrap();
        });
    });

    // Benchmark: purchases against one stream whose history keeps growing.
    group.bench_function("purchase_with_history", |b| {
        let (coordinator, store) = setup_coordinator();
        let sweet_id = seed_sweet(&store, i64::MAX / 2);
        b.iter(|| {
            coordinator
                .execute_purchase(black_box(PurchaseRequest {
                    sweet_id,
                    purchaser_id: PurchaserId::new(),
                    quantity: 1,
                }))
                .unwrap();
        });
    });

    group.finish();
}

fn bench_event_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_append_throughput");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_append", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryEventStore::new();
                let sweet_id = SweetId::new(AggregateId::new());

                b.iter(|| {
                    let events: Vec<PendingEvent> = (0..size)
                        .map(|i| {
                            let event = SweetEvent::SweetRestocked(SweetRestocked {
                                sweet_id,
                                amount: (i + 1) as i64,
                                occurred_at: Utc::now(),
                            });
                            PendingEvent::from_domain(
                                sweet_id.0,
                                SWEET_AGGREGATE_TYPE,
                                Uuid::now_v7(),
                                &event,
                            )
                            .unwrap()
                        })
                        .collect();

                    black_box(store.append(events, ExpectedVersion::Any).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_projection_rebuild_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild_speed");

    for event_count in [10, 100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("rebuild_from_events", event_count),
            event_count,
            |b, &count| {
                let store = InMemoryEventStore::new();
                let sweet_id = seed_restock_history(&store, count);
                let all_envelopes: Vec<_> = store
                    .read_stream(sweet_id.0)
                    .unwrap()
                    .iter()
                    .map(|e| e.to_envelope())
                    .collect();

                let projection = CatalogProjection::new(Arc::new(InMemoryKeyValueStore::new()));

                b.iter(|| {
                    projection
                        .rebuild_from_scratch(black_box(all_envelopes.clone()))
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

fn seed_restock_history(store: &InMemoryEventStore, events: usize) -> SweetId {
    let sweet_id = SweetId::new(AggregateId::new());
    let mut sweet = Sweet::empty(sweet_id);

    let created = sweet
        .handle(&SweetCommand::CreateSweet(CreateSweet {
            sweet_id,
            name: "Bench Bonbon".to_string(),
            category: "Chocolate".to_string(),
            price: Money::from_cents(199),
            quantity: 0,
            description: None,
            image_url: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
    sweet.apply(&created[0]);
    append_one(store, sweet_id, &created[0], 0);

    for i in 1..events {
        let restocked = sweet
            .handle(&SweetCommand::RestockSweet(RestockSweet {
                sweet_id,
                amount: (i % 10 + 1) as i64,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        sweet.apply(&restocked[0]);
        append_one(store, sweet_id, &restocked[0], i as u64);
    }

    sweet_id
}

fn append_one(store: &InMemoryEventStore, sweet_id: SweetId, event: &SweetEvent, expected: u64) {
    let uncommitted =
        PendingEvent::from_domain(sweet_id.0, SWEET_AGGREGATE_TYPE, Uuid::now_v7(), event)
            .unwrap();
    store
        .append(vec![uncommitted], ExpectedVersion::Exact(expected))
        .unwrap();
}

fn bench_coordinated_vs_naive_crud(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinated_vs_naive_crud");
    group.sample_size(1000);

    // Benchmark: full coordinated checkout (create + purchase).
    group.bench_function("coordinated_create_and_purchase", |b| {
        let (coordinator, store) = setup_coordinator();
        b.iter(|| {
            let sweet_id = seed_sweet(&store, 100);
            coordinator
                .execute_purchase(PurchaseRequest {
                    sweet_id,
                    purchaser_id: PurchaserId::new(),
                    quantity: 10,
                })
                .unwrap();
        });
    });

    // Benchmark: the unguarded read-modify-write it replaces.
    group.bench_function("naive_crud_create_and_purchase", |b| {
        let store = NaiveCrudStore::new();
        let item_id = AggregateId::new();

        b.iter(|| {
            store.create(item_id, 199, 100);
            store.purchase(item_id, 10).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_checkout_latency,
    bench_event_append_throughput,
    bench_projection_rebuild_speed,
    bench_coordinated_vs_naive_crud
);
criterion_main!(benches);
