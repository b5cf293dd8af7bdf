//! Integration tests for the order store under concurrent use.

use std::time::Duration;

use common::{CounterId, OrderId};
use domain::{CounterRegistry, ItemStatus, Money, NewCounter, NewItem, NewOrder, OrderStatus};
use order_store::{
    InMemoryOrderStore, OrderService, OrderStore, SnapshotWriter, StoreSnapshot,
};

fn order_with_items(count: usize) -> NewOrder {
    (0..count).fold(NewOrder::new().customer("Load"), |order, i| {
        order.item(
            NewItem::new(format!("Item {i}"), "grill", Money::from_cents(100), 1)
                .assigned_to(CounterId::new(i as u32 % 3 + 1)),
        )
    })
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_item_updates_on_one_order_all_survive() {
        let store = InMemoryOrderStore::new();
        let order = store.create(order_with_items(16)).await.unwrap();

        let mut handles = Vec::new();
        for index in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_item_status(order.id, index, ItemStatus::Ready)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let order = store.get(order.id).await.unwrap().unwrap();
        assert!(order.items().iter().all(|i| i.status == ItemStatus::Ready));
        assert_eq!(order.status(), OrderStatus::ReadyToServe);
        assert_eq!(order.revision(), 17);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_updates_on_different_items_both_survive() {
        let store = InMemoryOrderStore::new();
        let order = store.create(order_with_items(2)).await.unwrap();

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_item_status(order.id, 0, ItemStatus::InProgress)
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_item_status(order.id, 1, ItemStatus::Ready)
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let order = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(order.items()[0].status, ItemStatus::InProgress);
        assert_eq!(order.items()[1].status, ItemStatus::Ready);
        assert_eq!(order.status(), OrderStatus::InProgress);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_unique_ids() {
        let store = InMemoryOrderStore::new();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(NewOrder::new()).await.unwrap().id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.next_id(), OrderId::new(51));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_revisions_are_strictly_increasing_per_order() {
        let store = InMemoryOrderStore::new();
        let order = store.create(order_with_items(4)).await.unwrap();

        let mut handles = Vec::new();
        for round in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let status = if round % 2 == 0 {
                    ItemStatus::InProgress
                } else {
                    ItemStatus::Pending
                };
                store
                    .update_item_status(order.id, round % 4, status)
                    .await
                    .unwrap()
                    .revision()
            }));
        }

        let mut revisions = Vec::new();
        for handle in handles {
            revisions.push(handle.await.unwrap());
        }
        revisions.sort();
        revisions.dedup();
        assert_eq!(revisions.len(), 40);
        assert_eq!(*revisions.last().unwrap(), 41);
    }
}

mod counter_scenario {
    use super::*;

    #[tokio::test]
    async fn test_grill_counter_sees_only_its_item() {
        let counters = CounterRegistry::new();
        let a = counters
            .create_counter(NewCounter::new("A", "1111"))
            .await
            .unwrap();
        counters
            .assign_categories(a, vec!["grill".into()])
            .await
            .unwrap();
        let service = OrderService::new(InMemoryOrderStore::new(), counters);

        let order = service
            .create_order(
                NewOrder::new()
                    .item(NewItem::new("Steak", "grill", Money::from_cents(2000), 1))
                    .item(NewItem::new("Greens", "salad", Money::from_cents(700), 1)),
            )
            .await
            .unwrap()
            .order;
        assert_eq!(order.items()[0].assigned_counter, Some(a));
        assert_eq!(order.items()[1].assigned_counter, None);

        let seen = service.orders_for_counter(a).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, order.id);
        assert_eq!(seen[0].items().len(), 1);
        assert_eq!(seen[0].items()[0].category, "grill");
    }

    #[tokio::test]
    async fn test_status_walkthrough() {
        let service = OrderService::new(InMemoryOrderStore::new(), CounterRegistry::new());
        let id = service
            .create_order(
                NewOrder::new()
                    .item(
                        NewItem::new("Tea", "drinks", Money::zero(), 1)
                            .with_status(ItemStatus::Ready),
                    )
                    .item(NewItem::new("Cake", "dessert", Money::zero(), 1)),
            )
            .await
            .unwrap()
            .order
            .id;

        assert_eq!(
            service.get_order(id).await.unwrap().status(),
            OrderStatus::Pending
        );

        let order = service
            .update_item_status(id, 1, ItemStatus::InProgress)
            .await
            .unwrap()
            .order;
        assert_eq!(order.status(), OrderStatus::InProgress);

        let order = service
            .update_item_status(id, 1, ItemStatus::Ready)
            .await
            .unwrap()
            .order;
        assert_eq!(order.status(), OrderStatus::ReadyToServe);
        assert_eq!(service.ready_to_serve().await.unwrap().len(), 1);
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn test_restart_restores_orders_and_allocator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kds").join("orders.json");

        let store = InMemoryOrderStore::new();
        let writer = SnapshotWriter::new(store.clone(), &path);
        let first = store.create(order_with_items(3)).await.unwrap();
        store
            .update_item_status(first.id, 2, ItemStatus::Ready)
            .await
            .unwrap();
        let second = store.create(NewOrder::new()).await.unwrap();
        store.delete(second.id).await.unwrap();
        assert!(writer.flush().await.unwrap());

        let snapshot = StoreSnapshot::load(&path).await.unwrap().unwrap();
        let restored = InMemoryOrderStore::from_snapshot(snapshot);

        let orders = restored.list().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items()[2].status, ItemStatus::Ready);
        assert_eq!(orders[0].revision(), 2);

        let next = restored.create(NewOrder::new()).await.unwrap();
        assert_eq!(next.id, OrderId::new(3));
    }

    #[tokio::test]
    async fn test_periodic_writer_flushes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        let store = InMemoryOrderStore::new();
        let writer = SnapshotWriter::new(store.clone(), &path);
        let handle = writer.spawn_periodic(Duration::from_millis(20));

        store.create(NewOrder::new()).await.unwrap();
        for _ in 0..100 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        let snapshot = StoreSnapshot::load(&path).await.unwrap().unwrap();
        assert_eq!(snapshot.orders.len(), 1);
    }
}
