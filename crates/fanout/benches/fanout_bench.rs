use chrono::Utc;
use common::{ConnectionId, CounterId, OrderId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, NewItem, NewOrder, Order, OrderChange};
use fanout::{BroadcastRouter, Interest, SubscriptionRegistry, router::plan};
use order_store::InMemoryOrderStore;
use tokio::sync::mpsc;

fn order_across(counters: u32, items: u32) -> Order {
    let new_order = (0..items).fold(NewOrder::new(), |order, i| {
        order.item(
            NewItem::new(format!("Item {i}"), "bench", Money::from_cents(100), 1)
                .assigned_to(CounterId::new(i % counters + 1)),
        )
    });
    Order::create(OrderId::new(1), new_order, Utc::now())
}

fn bench_plan(c: &mut Criterion) {
    let change = OrderChange::StatusChanged(order_across(8, 32));

    c.bench_function("fanout/plan_status_change_8_counters", |b| {
        b.iter(|| plan(&change, Some(Interest::All)));
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let subscriptions = SubscriptionRegistry::new();
    let store = InMemoryOrderStore::new();
    let mut inboxes = Vec::new();

    rt.block_on(async {
        for i in 0..64u32 {
            let (tx, rx) = mpsc::channel(1024);
            subscriptions
                .join(
                    ConnectionId::new(),
                    Interest::Counter(CounterId::new(i % 8 + 1)),
                    tx,
                    &store,
                )
                .await
                .unwrap();
            inboxes.push(rx);
        }
    });

    let router = BroadcastRouter::new(subscriptions);
    let change = OrderChange::Updated(order_across(8, 32));

    c.bench_function("fanout/dispatch_64_connections", |b| {
        b.iter(|| {
            rt.block_on(async {
                router.dispatch(&change).await;
                for inbox in &mut inboxes {
                    while inbox.try_recv().is_ok() {}
                }
            });
        });
    });
}

criterion_group!(benches, bench_plan, bench_dispatch);
criterion_main!(benches);
