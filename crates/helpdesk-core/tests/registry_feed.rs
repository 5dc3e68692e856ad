//! Live registry over the change feed: snapshot, incremental updates,
//! scoped subscriptions, unsubscribe, and the preview window on top.

use std::sync::Arc;
use std::time::Duration;

use helpdesk_core::{
    AssignmentCoordinator, CoreConfig, Identity, LiveRegistry, MemoryStore, Role,
    ThreadWriter, TicketDoc, TicketPredicate, TicketStore,
};

fn user() -> Identity {
    Identity::new("u-1", "Uma", Role::User)
}

fn staff(id: &str) -> Identity {
    Identity::new(id, id.to_uppercase(), Role::Staff)
}

/// Await a view state with a hard timeout so a broken feed fails the
/// test instead of hanging it.
async fn wait_for_view<F>(registry: &LiveRegistry, predicate: F) -> Vec<TicketDoc>
where
    F: Fn(&[TicketDoc]) -> bool,
{
    let mut watch = registry.watch();
    let view = tokio::time::timeout(
        Duration::from_secs(2),
        watch.wait_for(|view| predicate(view)),
    )
    .await
    .expect("view did not reach the expected state in time")
    .expect("view channel closed");
    view.clone()
}

#[tokio::test]
async fn late_subscribers_get_the_snapshot_then_increments() {
    let store = Arc::new(MemoryStore::new());
    let early = store
        .create_ticket("first", &user(), "opened before subscribing", vec![])
        .await
        .unwrap();

    let registry = LiveRegistry::spawn(store.as_ref(), TicketPredicate::All)
        .await
        .unwrap();
    let view = wait_for_view(&registry, |view| view.len() == 1).await;
    assert_eq!(view[0].id(), early.id());

    let late = store
        .create_ticket("second", &user(), "opened after subscribing", vec![])
        .await
        .unwrap();
    let view = wait_for_view(&registry, |view| view.len() == 2).await;
    assert!(view.iter().any(|doc| doc.id() == late.id()));

    registry.shutdown().await.unwrap();
}

#[tokio::test]
async fn new_activity_moves_a_ticket_to_the_front() {
    let store = Arc::new(MemoryStore::new());
    let registry = LiveRegistry::spawn(store.as_ref(), TicketPredicate::All)
        .await
        .unwrap();

    let first = store
        .create_ticket("old", &user(), "m", vec![])
        .await
        .unwrap();
    let second = store
        .create_ticket("new", &user(), "m", vec![])
        .await
        .unwrap();
    wait_for_view(&registry, |view| view.len() == 2).await;

    // A fresh reply to the first ticket outdates the second.
    let writer = ThreadWriter::new(
        Arc::clone(&store),
        CoreConfig::default().thread,
        CoreConfig::default().retry,
    );
    writer
        .append_at(
            first.id(),
            &staff("s-a"),
            "any news?",
            helpdesk_core::now_us() + 1_000,
        )
        .await
        .unwrap();

    let view = wait_for_view(&registry, |view| {
        view.first().is_some_and(|doc| doc.id() == first.id())
    })
    .await;
    assert_eq!(view[1].id(), second.id());

    registry.shutdown().await.unwrap();
}

#[tokio::test]
async fn resolved_tickets_leave_an_unresolved_scope() {
    let store = Arc::new(MemoryStore::new());
    let registry = LiveRegistry::spawn(store.as_ref(), TicketPredicate::Unresolved)
        .await
        .unwrap();
    let coordinator = AssignmentCoordinator::new(Arc::clone(&store), CoreConfig::default().retry);

    let doc = store
        .create_ticket("short lived", &user(), "m", vec![])
        .await
        .unwrap();
    wait_for_view(&registry, |view| view.len() == 1).await;

    let agent = staff("s-a");
    coordinator.claim(doc.id(), &agent).await.unwrap();
    coordinator.resolve(doc.id(), &agent).await.unwrap();

    // Resolution carries the ticket out of scope entirely.
    wait_for_view(&registry, |view| view.is_empty()).await;

    registry.shutdown().await.unwrap();
}

#[tokio::test]
async fn an_assigned_to_scope_tracks_only_ones_own_desk() {
    let store = Arc::new(MemoryStore::new());
    let registry =
        LiveRegistry::spawn(store.as_ref(), TicketPredicate::AssignedTo("s-a".to_string()))
            .await
            .unwrap();
    let coordinator = AssignmentCoordinator::new(Arc::clone(&store), CoreConfig::default().retry);

    let mine = store.create_ticket("mine", &user(), "m", vec![]).await.unwrap();
    let theirs = store
        .create_ticket("theirs", &user(), "m", vec![])
        .await
        .unwrap();

    coordinator.claim(mine.id(), &staff("s-a")).await.unwrap();
    coordinator.claim(theirs.id(), &staff("s-b")).await.unwrap();

    let view = wait_for_view(&registry, |view| view.len() == 1).await;
    assert_eq!(view[0].id(), mine.id());

    // Releasing drops it off the desk again.
    coordinator.release(mine.id(), &staff("s-a")).await.unwrap();
    wait_for_view(&registry, |view| view.is_empty()).await;

    registry.shutdown().await.unwrap();
}

#[tokio::test]
async fn no_view_updates_after_unsubscribe() {
    let store = Arc::new(MemoryStore::new());
    let registry = LiveRegistry::spawn(store.as_ref(), TicketPredicate::All)
        .await
        .unwrap();
    store
        .create_ticket("before", &user(), "m", vec![])
        .await
        .unwrap();
    wait_for_view(&registry, |view| view.len() == 1).await;

    let frozen = registry.view();
    registry.shutdown().await.unwrap();
    assert_eq!(store.subscriber_count(), 0);

    // Writes after shutdown change nothing that anyone can observe
    // through the now-final view.
    store
        .create_ticket("after", &user(), "m", vec![])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(frozen.len(), 1);
    assert_eq!(store.dump().len(), 2);
}

#[tokio::test]
async fn the_preview_window_rides_the_live_order() {
    let store = Arc::new(MemoryStore::new());
    let registry = LiveRegistry::spawn(store.as_ref(), TicketPredicate::All)
        .await
        .unwrap();

    for i in 0..8 {
        store
            .create_ticket(&format!("ticket {i}"), &user(), "m", vec![])
            .await
            .unwrap();
    }
    let view = wait_for_view(&registry, |view| view.len() == 8).await;

    let mut list = helpdesk_core::TicketList::new(&CoreConfig::default().preview);
    assert_eq!(list.display(&view), &view[..5]);

    list.toggle();
    assert_eq!(list.display(&view).len(), 8);

    registry.shutdown().await.unwrap();
}
