use super::*;
use crate::test_support::{ProbeSource, TestClock, identity};
use std::sync::atomic::Ordering;

fn stamped(content: Value, last_modified: i64, modified_by: &str) -> SharedStateDocument {
    let Value::Object(map) = content else { panic!("object expected") };
    SharedStateDocument::from_content(map).stamped(last_modified, modified_by)
}

fn engine(source: Arc<ProbeSource>, device_id: &str) -> SyncEngine {
    SyncEngine::new(source, &identity(device_id), SyncTimings::default())
}

/// Connected, but nothing fetched yet.
fn go_online(engine: &SyncEngine) {
    engine.inner.connected.store(true, Ordering::Release);
}

// =============================================================================
// DECISION
// =============================================================================

#[test]
fn accepts_newer_document_from_another_device() {
    let remote = stamped(json!({"notices": []}), 1000, "dev-b");
    assert!(should_accept(&remote, 0, "dev-a"));
    assert!(should_accept(&remote, 999, "dev-a"));
}

#[test]
fn rejects_own_write_even_when_newer() {
    let remote = stamped(json!({}), 5000, "dev-a");
    assert!(!should_accept(&remote, 0, "dev-a"));
}

#[test]
fn rejects_same_or_older_generation() {
    let remote = stamped(json!({}), 1000, "dev-b");
    assert!(!should_accept(&remote, 1000, "dev-a"));
    assert!(!should_accept(&remote, 1500, "dev-a"));
}

#[test]
fn unstamped_document_is_never_newer() {
    let remote = SharedStateDocument::default();
    assert!(!should_accept(&remote, 0, "dev-a"));
}

#[test]
fn default_document_carries_the_shop_floor_user() {
    let doc = default_document();
    assert!(shop_floor_user(&doc).is_some());
    assert!(!doc.contains_key(wire::LAST_MODIFIED_KEY));
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

#[tokio::test]
async fn bootstrap_offline_uses_default_document_and_never_pushes() {
    let probe = ProbeSource::new(TestClock::at(1000).fixture("dev-a"));
    probe.online.store(false, Ordering::SeqCst);
    let a = engine(probe.clone(), "dev-a");

    assert_eq!(a.bootstrap().await, Bootstrap::Offline);
    assert!(!a.is_connected());
    assert_eq!(a.document(), default_document());
    assert_eq!(a.poll_once().await, PollOutcome::Offline);

    a.update(|doc| {
        doc.insert("announcements".into(), json!(["offline edit"]));
    });
    assert!(!a.has_pending_push());
    assert_eq!(probe.push_count(), 0);
}

#[tokio::test]
async fn offline_tick_reprobes_and_reloads_server_document_once_back() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-b");
    let probe = ProbeSource::new(store.share("dev-a"));
    probe.online.store(false, Ordering::SeqCst);
    let a = engine(probe.clone(), "dev-a");
    assert_eq!(a.bootstrap().await, Bootstrap::Offline);
    assert_eq!(a.poll_once().await, PollOutcome::Offline);

    clock.set(1500);
    store.push_state(&Map::from_iter([("notices".to_owned(), json!(["from b"]))])).await.unwrap();
    probe.online.store(true, Ordering::SeqCst);

    assert_eq!(a.poll_once().await, PollOutcome::Reconnected);
    assert!(a.is_connected());
    assert_eq!(a.last_synced(), 1500);
    assert_eq!(a.document().get("notices"), Some(&json!(["from b"])));
    assert_eq!(a.poll_once().await, PollOutcome::Stale);

    clock.set(1600);
    a.update(|doc| {
        doc.insert("announcements".into(), json!(["back online"]));
    });
    assert!(a.has_pending_push());
}

#[tokio::test]
async fn reconnect_seeds_an_empty_server() {
    let probe = ProbeSource::new(TestClock::at(2000).fixture("dev-a"));
    probe.online.store(false, Ordering::SeqCst);
    let a = engine(probe.clone(), "dev-a");
    a.bootstrap().await;

    probe.online.store(true, Ordering::SeqCst);
    assert!(a.reconnect().await);
    assert_eq!(probe.push_count(), 1);
    assert_eq!(a.last_synced(), 2000);

    // Already online: a second probe does not reload.
    assert!(a.reconnect().await);
    assert_eq!(probe.push_count(), 1);
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bootstrap_adopts_existing_document() {
    let clock = TestClock::at(700);
    let store = clock.fixture("dev-b");
    store.push_state(&Map::from_iter([("notices".to_owned(), json!(["n1"]))])).await.unwrap();

    let probe = ProbeSource::new(store.share("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    assert_eq!(a.bootstrap().await, Bootstrap::Adopted);
    assert_eq!(a.last_synced(), 700);
    assert_eq!(a.document().get("notices"), Some(&json!(["n1"])));
    assert_eq!(probe.push_count(), 0);
}

#[tokio::test]
async fn bootstrap_failed_fetch_degrades_without_overwriting_server() {
    let probe = ProbeSource::new(TestClock::at(700).fixture("dev-a"));
    probe.fail_fetch.store(true, Ordering::SeqCst);
    let a = engine(probe.clone(), "dev-a");

    assert_eq!(a.bootstrap().await, Bootstrap::Degraded);
    assert!(a.is_connected());
    assert_eq!(probe.push_count(), 0);
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[tokio::test]
async fn first_device_seeds_and_second_device_accepts() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-a");
    let probe_a = ProbeSource::new(store.clone());
    let probe_b = ProbeSource::new(store.share("dev-b"));

    let a = engine(probe_a.clone(), "dev-a");
    assert_eq!(a.bootstrap().await, Bootstrap::Seeded);
    assert_eq!(a.last_synced(), 1000);
    let server = store.fetch_state().await.unwrap().unwrap();
    assert_eq!(server.last_modified, Some(1000));
    assert_eq!(server.modified_by.as_deref(), Some("dev-a"));

    clock.set(1001);
    let b = engine(probe_b, "dev-b");
    go_online(&b);
    assert_eq!(b.last_synced(), 0);
    assert_eq!(b.poll_once().await, PollOutcome::Accepted);
    assert_eq!(b.last_synced(), 1000);
    assert_eq!(b.document(), server.content);
}

#[tokio::test]
async fn own_write_echo_is_rejected_and_local_state_kept() {
    let clock = TestClock::at(1000);
    let probe = ProbeSource::new(clock.fixture("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    a.bootstrap().await;

    clock.set(2000);
    a.update(|doc| {
        doc.insert("announcements".into(), json!(["shift change at 3"]));
    });
    assert_eq!(a.push_now().await.unwrap(), Some(2000));

    // An edit made after the push must survive the echo.
    {
        let mut local = a.local();
        local.document.insert("notices".into(), json!(["unsaved"]));
    }
    let before = a.document();

    clock.set(2003);
    assert_eq!(a.poll_once().await, PollOutcome::Echo);
    assert_eq!(a.document(), before);
    assert_eq!(a.last_synced(), 2000);
}

#[tokio::test]
async fn echo_is_rejected_even_before_the_push_stamp_is_recorded() {
    let clock = TestClock::at(3000);
    let store = clock.fixture("dev-a");
    store.push_state(&Map::from_iter([("apps".to_owned(), json!(["erp"]))])).await.unwrap();

    let a = engine(ProbeSource::new(store), "dev-a");
    go_online(&a);
    assert_eq!(a.last_synced(), 0);
    assert_eq!(a.poll_once().await, PollOutcome::Echo);
    assert_eq!(a.document(), default_document());
}

#[tokio::test]
async fn repeated_identical_fetch_is_stale() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-a");
    let a = engine(ProbeSource::new(store.clone()), "dev-a");
    a.bootstrap().await;

    let b = engine(ProbeSource::new(store.share("dev-b")), "dev-b");
    go_online(&b);
    assert_eq!(b.poll_once().await, PollOutcome::Accepted);
    let accepted = b.document();
    assert_eq!(b.poll_once().await, PollOutcome::Stale);
    assert_eq!(b.document(), accepted);
}

#[tokio::test]
async fn accepted_remote_keeps_device_session() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-a");
    let a = engine(ProbeSource::new(store.clone()), "dev-a");
    a.bootstrap().await;
    a.update_session(|s| {
        s.current_user = Some(json!({"id": "manager"}));
        s.editing_layout_for_role = Some("manager".into());
    });

    clock.set(1500);
    let b = store.share("dev-b");
    b.push_state(&Map::from_iter([("notices".to_owned(), json!(["from b"]))])).await.unwrap();

    assert_eq!(a.poll_once().await, PollOutcome::Accepted);
    assert_eq!(a.document().get("notices"), Some(&json!(["from b"])));
    let session = a.session();
    assert_eq!(session.current_user, Some(json!({"id": "manager"})));
    assert_eq!(session.editing_layout_for_role.as_deref(), Some("manager"));
}

#[tokio::test]
async fn concurrent_edits_lose_all_but_the_last_push() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-a");
    let a = engine(ProbeSource::new(store.clone()), "dev-a");
    let b = engine(ProbeSource::new(store.share("dev-b")), "dev-b");
    a.bootstrap().await;
    go_online(&b);
    b.poll_once().await;

    clock.set(2000);
    a.update(|doc| {
        doc.insert("announcements".into(), json!(["from a"]));
    });
    b.update(|doc| {
        doc.insert("notices".into(), json!(["from b"]));
    });
    a.push_now().await.unwrap();
    clock.set(2001);
    b.push_now().await.unwrap();

    let server = store.fetch_state().await.unwrap().unwrap();
    assert_eq!(server.modified_by.as_deref(), Some("dev-b"));
    assert_eq!(server.content.get("notices"), Some(&json!(["from b"])));
    assert_eq!(server.content.get("announcements"), Some(&json!([])));

    assert_eq!(a.poll_once().await, PollOutcome::Accepted);
    assert_eq!(a.document().get("announcements"), Some(&json!([])));
}

// =============================================================================
// TIMING
// =============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_edits_collapses_into_one_push_with_last_state() {
    let probe = ProbeSource::new(TestClock::at(1000).fixture("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    a.bootstrap().await;
    let baseline = probe.push_count();

    for i in 0..5 {
        a.update(|doc| {
            doc.insert("announcements".into(), json!([format!("draft {i}")]));
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(probe.push_count(), baseline);
    assert!(a.has_pending_push());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(probe.push_count(), baseline + 1);
    assert_eq!(probe.last_push().unwrap().get("announcements"), Some(&json!(["draft 4"])));
    assert!(!a.has_pending_push());
}

#[tokio::test(start_paused = true)]
async fn separated_edits_push_separately() {
    let probe = ProbeSource::new(TestClock::at(1000).fixture("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    a.bootstrap().await;
    let baseline = probe.push_count();

    a.update(|doc| {
        doc.insert("notices".into(), json!(["one"]));
    });
    tokio::time::sleep(Duration::from_millis(700)).await;
    a.update(|doc| {
        doc.insert("notices".into(), json!(["two"]));
    });
    tokio::time::sleep(Duration::from_millis(700)).await;

    assert_eq!(probe.push_count(), baseline + 2);
}

#[tokio::test]
async fn tick_during_in_flight_poll_is_a_no_op() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-b");
    store.push_state(&Map::from_iter([("apps".to_owned(), json!([]))])).await.unwrap();
    let probe = ProbeSource::new(store.share("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    go_online(&a);

    let gate = probe.gate_fetches();
    let first = tokio::spawn({
        let a = a.clone();
        async move { a.poll_once().await }
    });
    while probe.fetch_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(a.poll_once().await, PollOutcome::Skipped);
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    assert_eq!(first.await.unwrap(), PollOutcome::Accepted);

    gate.add_permits(1);
    assert_eq!(a.poll_once().await, PollOutcome::Stale);
}

#[tokio::test]
async fn failed_poll_releases_busy_flag() {
    let probe = ProbeSource::new(TestClock::at(1000).fixture("dev-a"));
    let a = engine(probe.clone(), "dev-a");
    go_online(&a);

    probe.fail_fetch.store(true, Ordering::SeqCst);
    assert_eq!(a.poll_once().await, PollOutcome::Failed);
    probe.fail_fetch.store(false, Ordering::SeqCst);
    assert_eq!(a.poll_once().await, PollOutcome::Empty);
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn polling_loop_picks_up_remote_writes() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-a");
    let a = engine(ProbeSource::new(store.clone()), "dev-a");
    a.bootstrap().await;
    let handle = a.spawn_polling();

    clock.set(4000);
    store
        .share("dev-b")
        .push_state(&Map::from_iter([("notices".to_owned(), json!(["remote"]))]))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(a.last_synced(), 4000);
    assert_eq!(a.document().get("notices"), Some(&json!(["remote"])));
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn polling_loop_recovers_from_offline_start() {
    let clock = TestClock::at(1000);
    let store = clock.fixture("dev-b");
    let probe = ProbeSource::new(store.share("dev-a"));
    probe.online.store(false, Ordering::SeqCst);
    let a = engine(probe.clone(), "dev-a");
    assert_eq!(a.bootstrap().await, Bootstrap::Offline);
    let handle = a.spawn_polling();

    tokio::time::sleep(Duration::from_millis(6100)).await;
    assert!(!a.is_connected());
    assert_eq!(probe.fetch_calls.load(Ordering::SeqCst), 0);

    clock.set(7000);
    store.push_state(&Map::from_iter([("notices".to_owned(), json!(["while away"]))])).await.unwrap();
    probe.online.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert!(a.is_connected());
    assert_eq!(a.last_synced(), 7000);
    assert_eq!(a.document().get("notices"), Some(&json!(["while away"])));

    clock.set(9000);
    store.push_state(&Map::from_iter([("notices".to_owned(), json!(["later"]))])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(a.last_synced(), 9000);
    handle.abort();
}
