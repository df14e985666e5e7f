mod common;

use std::sync::Arc;

use audita::broadcast::ChatEvent;
use audita::error::AppError;
use audita::models::Role;
use audita::relay::StreamingRelay;

use common::{FakeLlm, InMemoryStore, RecordingPublisher};

fn setup() -> (
    Arc<FakeLlm>,
    Arc<RecordingPublisher>,
    Arc<InMemoryStore>,
    StreamingRelay,
) {
    let llm = Arc::new(FakeLlm::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let store = Arc::new(InMemoryStore::default());
    let relay = StreamingRelay::new(llm.clone(), publisher.clone(), store.clone());
    (llm, publisher, store, relay)
}

#[tokio::test]
async fn relays_fragments_in_order_and_persists_one_message() {
    let (llm, publisher, store, relay) = setup();
    let audit = store.add_audit();
    let chat = store.add_chat(audit.id);

    llm.set_stream(vec![
        Ok("Rozumím, ".to_string()),
        Ok("podívám se ".to_string()),
        Ok("na to.".to_string()),
    ]);

    let message_id = relay.relay(chat.id, &[], None).await.unwrap();

    let messages = store.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, message_id);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, "Rozumím, podívám se na to.");
    assert!(!messages[0].hidden);

    let events = publisher.events();
    let channel = format!("chat-{}", chat.id);
    assert!(events.iter().all(|(c, _)| c == &channel));
    assert_eq!(events[0].1, ChatEvent::started());
    assert_eq!(events[1].1, ChatEvent::chunk("Rozumím, "));
    assert_eq!(events[2].1, ChatEvent::chunk("podívám se "));
    assert_eq!(events[3].1, ChatEvent::chunk("na to."));
    assert_eq!(events[4].1, ChatEvent::completed(message_id));
    assert_eq!(events.len(), 5);
}

#[tokio::test]
async fn empty_stream_persists_nothing_and_ends_with_error() {
    let (llm, publisher, store, relay) = setup();
    let audit = store.add_audit();
    let chat = store.add_chat(audit.id);

    llm.set_stream(vec![]);

    let result = relay.relay(chat.id, &[], None).await;
    assert!(matches!(result, Err(AppError::UpstreamProvider(_))));
    assert!(store.messages.lock().unwrap().is_empty());

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    match &events[1].1 {
        ChatEvent::MessageEnd {
            status,
            message_uuid,
            error,
        } => {
            assert_eq!(status, "error");
            assert!(message_uuid.is_none());
            assert!(error.is_some());
        }
        other => panic!("expected message-end, got {:?}", other),
    }
}

#[tokio::test]
async fn mid_stream_failure_aborts_without_partial_persistence() {
    let (llm, publisher, store, relay) = setup();
    let audit = store.add_audit();
    let chat = store.add_chat(audit.id);

    llm.set_stream(vec![
        Ok("partial ".to_string()),
        Err("connection reset".to_string()),
    ]);

    let result = relay.relay(chat.id, &[], None).await;
    assert!(matches!(result, Err(AppError::UpstreamProvider(_))));
    assert!(store.messages.lock().unwrap().is_empty());

    let events = publisher.events();
    // started, one chunk, then the error end
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].1, ChatEvent::chunk("partial "));
    assert!(matches!(
        events[2].1,
        ChatEvent::MessageEnd { ref status, .. } if status == "error"
    ));
}

#[tokio::test]
async fn failed_stream_open_surfaces_the_provider_error() {
    let (_llm, publisher, store, relay) = setup();
    let audit = store.add_audit();
    let chat = store.add_chat(audit.id);

    // no stream scripted: the provider call itself fails
    let result = relay.relay(chat.id, &[], Some("be nice")).await;
    assert!(matches!(result, Err(AppError::UpstreamProvider(_))));
    assert!(store.messages.lock().unwrap().is_empty());

    let events = publisher.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].1, ChatEvent::started());
    assert!(matches!(
        events[1].1,
        ChatEvent::MessageEnd { ref status, .. } if status == "error"
    ));
}
