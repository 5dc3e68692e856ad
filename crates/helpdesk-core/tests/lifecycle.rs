//! End-to-end ticket lifecycle: open, claim, converse, resolve.

use std::sync::Arc;

use helpdesk_core::{
    AssignmentCoordinator, CoreConfig, Identity, MemoryStore, Role, ThreadPolicy,
    ThreadWriter, TicketError, TicketId, TicketState, TicketStore,
};

fn user(id: &str, name: &str) -> Identity {
    Identity::new(id, name, Role::User)
}

fn staff(id: &str, name: &str) -> Identity {
    Identity::new(id, name, Role::Staff)
}

fn harness(
    allow_post_resolution_reply: bool,
) -> (
    Arc<MemoryStore>,
    AssignmentCoordinator<MemoryStore>,
    ThreadWriter<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::new());
    let config = CoreConfig::default();
    let coordinator = AssignmentCoordinator::new(Arc::clone(&store), config.retry);
    let writer = ThreadWriter::new(
        Arc::clone(&store),
        ThreadPolicy {
            allow_post_resolution_reply,
        },
        config.retry,
    );
    (store, coordinator, writer)
}

#[tokio::test]
async fn a_ticket_travels_from_open_to_resolved() {
    let (store, coordinator, writer) = harness(false);
    let reporter = user("u-lee", "Lee");
    let agent = staff("s-ana", "Ana");

    // A user opens a ticket; the description is the first thread entry.
    let doc = store
        .create_ticket(
            "Printer broken",
            &reporter,
            "The third-floor printer stopped mid-job.",
            vec!["printer-jam.jpg".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(doc.fields.state(), TicketState::Unassigned);
    assert_eq!(doc.fields.attachments, vec!["printer-jam.jpg"]);
    assert_eq!(doc.fields.thread[0].seq, 0);

    // A staff member claims it and the conversation goes back and forth.
    let claimed = coordinator.claim(doc.id(), &agent).await.unwrap();
    assert_eq!(claimed.fields.state(), TicketState::Assigned);
    assert_eq!(claimed.fields.assignee_id.as_deref(), Some("s-ana"));

    writer
        .append(doc.id(), &agent, "On my way up, did it show an error code?")
        .await
        .unwrap();
    writer
        .append(doc.id(), &reporter, "E-04, paper jam apparently")
        .await
        .unwrap();

    let resolved = coordinator.resolve(doc.id(), &agent).await.unwrap();
    assert_eq!(resolved.fields.state(), TicketState::Resolved);
    // The resolver stays on the record.
    assert_eq!(resolved.fields.assignee_id.as_deref(), Some("s-ana"));

    // The thread survived in order: description, question, answer.
    let current = store.fetch(doc.id()).await.unwrap();
    let texts: Vec<&str> = current
        .fields
        .thread
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts.len(), 3);
    assert!(texts[0].contains("stopped mid-job"));
    assert!(texts[2].contains("paper jam"));
    assert!(current.fields.is_well_formed());
}

#[tokio::test]
async fn resolution_is_terminal_for_every_operation() {
    let (store, coordinator, writer) = harness(false);
    let agent = staff("s-ana", "Ana");

    let doc = store
        .create_ticket("t", &user("u-1", "U"), "m", vec![])
        .await
        .unwrap();
    coordinator.claim(doc.id(), &agent).await.unwrap();
    coordinator.resolve(doc.id(), &agent).await.unwrap();

    let claim = coordinator.claim(doc.id(), &staff("s-bo", "Bo")).await;
    let release = coordinator.release(doc.id(), &agent).await;
    let resolve = coordinator.resolve(doc.id(), &agent).await;
    let reply = writer.append(doc.id(), &agent, "one more thing").await;

    for outcome in [
        claim.map(|_| ()),
        release.map(|_| ()),
        resolve.map(|_| ()),
        reply.map(|_| ()),
    ] {
        assert!(matches!(
            outcome,
            Err(TicketError::InvalidState {
                state: TicketState::Resolved,
                ..
            })
        ));
    }
}

#[tokio::test]
async fn audit_replies_are_a_policy_opt_in() {
    let (store, coordinator, writer) = harness(true);
    let agent = staff("s-ana", "Ana");

    let doc = store
        .create_ticket("t", &user("u-1", "U"), "m", vec![])
        .await
        .unwrap();
    coordinator.claim(doc.id(), &agent).await.unwrap();
    coordinator.resolve(doc.id(), &agent).await.unwrap();

    let message = writer
        .append(doc.id(), &agent, "root cause: worn pickup roller")
        .await
        .unwrap();
    let current = store.fetch(doc.id()).await.unwrap();
    assert_eq!(current.fields.thread.last().unwrap().seq, message.seq);
    // The reply never un-resolves the ticket.
    assert_eq!(current.fields.state(), TicketState::Resolved);
}

#[tokio::test]
async fn operations_on_unknown_tickets_are_not_found() {
    let (_store, coordinator, writer) = harness(false);
    let agent = staff("s-ana", "Ana");
    let ghost = TicketId::new("no-such-ticket");

    assert!(matches!(
        coordinator.claim(&ghost, &agent).await,
        Err(TicketError::NotFound { .. })
    ));
    assert!(matches!(
        writer.append(&ghost, &agent, "hello?").await,
        Err(TicketError::NotFound { .. })
    ));
}

#[tokio::test]
async fn release_reopens_the_race_and_interleaved_replies_stay_ordered() {
    let (store, coordinator, writer) = harness(false);
    let reporter = user("u-lee", "Lee");
    let ana = staff("s-ana", "Ana");
    let bo = staff("s-bo", "Bo");

    let doc = store
        .create_ticket("VPN flaky", &reporter, "Drops every few minutes", vec![])
        .await
        .unwrap();

    coordinator.claim(doc.id(), &ana).await.unwrap();
    writer.append(doc.id(), &ana, "Looking at the gateway").await.unwrap();
    coordinator.release(doc.id(), &ana).await.unwrap();

    // After release anyone can pick it up, and the thread keeps growing.
    coordinator.claim(doc.id(), &bo).await.unwrap();
    writer.append(doc.id(), &bo, "Taking over from Ana").await.unwrap();
    writer.append(doc.id(), &reporter, "Still dropping").await.unwrap();

    let current = store.fetch(doc.id()).await.unwrap();
    assert_eq!(current.fields.assignee_id.as_deref(), Some("s-bo"));
    let seqs: Vec<u64> = current.fields.thread.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
}
