use super::*;
use std::sync::atomic::{AtomicI64, Ordering};
use wire::{NotificationKind, SignalKind};

fn manual(device_id: &str, start: i64) -> (InMemoryFixtureSource, Arc<AtomicI64>) {
    let now = Arc::new(AtomicI64::new(start));
    let clock = Arc::clone(&now);
    (InMemoryFixtureSource::empty(device_id).with_clock(move || clock.load(Ordering::SeqCst)), now)
}

fn content(key: &str, value: Value) -> Map<String, Value> {
    Map::from_iter([(key.to_owned(), value)])
}

#[tokio::test]
async fn push_stamps_like_the_server() {
    let (store, now) = manual("dev-a", 1000);
    assert_eq!(store.fetch_state().await.unwrap(), None);

    let first = store.push_state(&content("notices", Value::Array(vec![]))).await.unwrap();
    assert_eq!(first, PushStateResponse { success: true, last_modified: Some(1000) });

    // Same millisecond, then a clock step backwards: still strictly increasing.
    let second = store.push_state(&content("notices", Value::Array(vec![]))).await.unwrap();
    assert_eq!(second.last_modified, Some(1001));
    now.store(500, Ordering::SeqCst);
    let third = store.share("dev-b").push_state(&content("apps", Value::Array(vec![]))).await.unwrap();
    assert_eq!(third.last_modified, Some(1002));

    let doc = store.fetch_state().await.unwrap().unwrap();
    assert_eq!(doc.modified_by.as_deref(), Some("dev-b"));
    assert!(doc.content.contains_key("apps"));
    assert!(!doc.content.contains_key("notices"));
}

#[tokio::test]
async fn push_ignores_client_supplied_metadata() {
    let (store, _) = manual("dev-a", 1000);
    let mut body = content("notices", Value::Array(vec![]));
    body.insert("lastModified".into(), Value::from(99_999));
    body.insert("modifiedBy".into(), Value::from("spoofed"));
    store.push_state(&body).await.unwrap();

    let doc = store.fetch_state().await.unwrap().unwrap();
    assert_eq!(doc.last_modified, Some(1000));
    assert_eq!(doc.modified_by.as_deref(), Some("dev-a"));
    assert!(!doc.content.contains_key("lastModified"));
}

#[tokio::test]
async fn register_upserts_and_rename_is_lenient() {
    let (store, now) = manual("dev-a", 10);
    store.register_device("dev-a", "Bay 1").await.unwrap();
    now.store(20, Ordering::SeqCst);
    store.register_device("dev-a", "Bay 1 North").await.unwrap();
    store.rename_device("ghost", "Nobody").await.unwrap();

    let devices = store.devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Bay 1 North");
    assert_eq!(devices[0].last_seen, 20);
    assert_eq!(devices[0].created_at, 10);
}

#[tokio::test]
async fn signals_are_consumed_on_read() {
    let (store, _) = manual("dev-a", 5000);
    for (id, to) in [("m1", "dev-x"), ("m2", "dev-y")] {
        store
            .send_signal(&SignalingMessage {
                id: id.into(),
                from: "dev-a".into(),
                to: to.into(),
                kind: SignalKind::Offer,
                data: Value::Null,
                timestamp: 5000,
            })
            .await
            .unwrap();
    }

    let for_x = store.receive_signals("dev-x").await.unwrap();
    assert_eq!(for_x.len(), 1);
    assert_eq!(for_x[0].id, "m1");
    assert!(store.receive_signals("dev-x").await.unwrap().is_empty());
    assert_eq!(store.receive_signals("dev-y").await.unwrap()[0].id, "m2");
}

#[tokio::test]
async fn chat_send_raises_a_message_notification() {
    let (store, _) = manual("dev-a", 42);
    let message = ChatMessage { id: "msg_42".into(), from: "dev-a".into(), to: "dev-b".into(), text: "hi".into(), timestamp: 42 };
    store.send_message(&message).await.unwrap();
    assert!(matches!(store.send_message(&message).await, Err(SourceError::Rejected(_))));

    let inbox = store.notifications("dev-b", true).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Message);
    assert_eq!(inbox[0].title, "New Message");
    assert_eq!(inbox[0].message.as_deref(), Some("hi"));
    assert!(inbox[0].id.starts_with("notif_42_"));
}

#[tokio::test]
async fn notification_lifecycle() {
    let (store, now) = manual("dev-a", 100);
    let send = |title: &str| SendNotificationRequest {
        to_device: "dev-c".into(),
        from_device: "dev-a".into(),
        kind: NotificationKind::Call,
        title: title.into(),
        message: None,
        data: None,
    };
    let older = store.send_notification(&send("first")).await.unwrap();
    now.store(101, Ordering::SeqCst);
    let newer = store.send_notification(&send("second")).await.unwrap();

    let listed: Vec<_> = store.notifications("dev-c", false).await.unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(listed, vec![newer.clone(), older.clone()]);

    store.mark_notification_read(&older).await.unwrap();
    store.mark_notification_read(&older).await.unwrap();
    let unread = store.notifications("dev-c", true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, newer);

    store.delete_notification(&newer).await.unwrap();
    assert!(store.notifications("dev-c", true).await.unwrap().is_empty());
    assert_eq!(store.notifications("dev-c", false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn seeded_fixtures_cover_every_screen() {
    let store = InMemoryFixtureSource::new("preview");
    assert_eq!(store.devices().await.unwrap().len(), 3);
    assert_eq!(store.messages().await.unwrap()[0].id, "1");

    let employees = store.employees().await.unwrap();
    assert_eq!(employees.first().map(|e| e.name.as_str()), Some("Emily Brown"));
    let training = store.training_records().await.unwrap();
    assert_eq!(training[0].training_id, "quality-control");

    let inventory = store.inventory().await.unwrap();
    assert_eq!(inventory.items[0].on_hand, 0.0);
    assert!(inventory.error.is_none());
    assert_eq!(store.operations().await.unwrap().operations.len(), 3);
    assert_eq!(store.production().await.unwrap().total_completed, 163);
}

#[tokio::test]
async fn deleting_an_employee_drops_their_training() {
    let store = InMemoryFixtureSource::new("preview");
    store.delete_employee("1").await.unwrap();

    let training = store.training_records().await.unwrap();
    assert!(training.iter().all(|t| t.employee_id != "1"));
    assert_eq!(training.len(), 1);

    let orphan = TrainingRecord { employee_id: "1".into(), ..training[0].clone() };
    let err = store.create_training_record(&orphan).await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown employee: 1");
}

#[tokio::test]
async fn unreachable_server_is_offline_not_an_error() {
    // Reserved TEST-NET address; nothing answers.
    let source = RemoteHttpSource::new("http://192.0.2.1:9", "dev-a")
        .unwrap()
        .with_health_timeout(Duration::from_millis(200));
    assert!(!source.health().await);
}

#[test]
fn path_segments_are_percent_encoded() {
    let source = RemoteHttpSource::new("http://kiosk.local:3001/", "dev-a").unwrap();
    let url = source.url(&["api", "notifications", "notif/1?x#y", "read"]).unwrap();
    assert_eq!(url.as_str(), "http://kiosk.local:3001/api/notifications/notif%2F1%3Fx%23y/read");
}

#[test]
fn base_path_prefix_is_kept() {
    let source = RemoteHttpSource::new("https://host/kiosk/", "dev-a").unwrap();
    let url = source.url(&["api", "devices", "dev a"]).unwrap();
    assert_eq!(url.as_str(), "https://host/kiosk/api/devices/dev%20a");
}

#[tokio::test]
async fn malformed_server_url_probes_as_offline() {
    let source = RemoteHttpSource::new("not a url", "dev-a").unwrap();
    assert!(matches!(source.url(&["api"]), Err(SourceError::InvalidUrl(_))));
    assert!(!source.health().await);
}
