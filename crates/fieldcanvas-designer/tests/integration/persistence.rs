use fieldcanvas_core::{
    AppEvent, BackendCall, Field, FieldId, FieldKey, FieldPatch, FieldType, MemoryBackend,
    PersistenceEvent, SyncError, TemplateId, TemplateRecord,
};
use fieldcanvas_designer::{PlacementSession, Point, Size};
use fieldcanvas_settings::CanvasConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TEMPLATE: TemplateId = TemplateId(11);

async fn open(backend: &MemoryBackend) -> PlacementSession {
    backend.insert_template(
        TEMPLATE,
        TemplateRecord {
            fields: vec![Field::new(
                FieldKey::Remote(FieldId(1)),
                10.0,
                10.0,
                20.0,
                16.0,
            )],
            page_count: 1,
        },
    );
    PlacementSession::load(
        Arc::new(backend.clone()),
        TEMPLATE,
        CanvasConfig::default(),
        Size::new(400.0, 400.0),
        Size::new(400.0, 400.0),
    )
    .await
    .expect("template exists")
}

#[tokio::test]
async fn test_slow_create_receives_later_patches() {
    let backend = MemoryBackend::new();
    let mut s = open(&backend).await;
    backend.set_latency(Some(Duration::from_millis(20)));

    let t0 = Instant::now();
    let key = s.create_field_at(Point::new(50.0, 50.0), FieldType::Text, t0);
    s.apply_patch_intent(key, FieldPatch::position(30.0, 40.0), t0)
        .expect("valid position");
    s.apply_patch_intent(key, FieldPatch::size(25.0, 24.0), t0)
        .expect("valid size");

    s.force_save().await.expect("finalize succeeds");

    let stored = backend.fields(TEMPLATE);
    assert_eq!(stored.len(), 2);
    let created = stored
        .iter()
        .find(|f| f.key != FieldKey::Remote(FieldId(1)))
        .expect("created field stored");
    assert_eq!((created.x, created.y), (30.0, 40.0));
    assert_eq!((created.width, created.height), (25.0, 24.0));

    // The session now addresses the field by its durable id.
    assert!(s.canvas().get(key).is_none());
    assert!(s.canvas().get(created.key).is_some());
    assert!(s.sync().is_idle());
}

#[tokio::test]
async fn test_delete_while_create_in_flight() {
    let backend = MemoryBackend::new();
    let mut s = open(&backend).await;
    backend.set_latency(Some(Duration::from_millis(20)));

    let t0 = Instant::now();
    let key = s.create_field_at(Point::new(50.0, 50.0), FieldType::Text, t0);
    assert!(s.delete_field(key, t0));
    s.force_save().await.expect("finalize succeeds");

    assert_eq!(backend.fields(TEMPLATE).len(), 1);
    assert!(backend
        .calls()
        .iter()
        .any(|call| matches!(call, BackendCall::Delete { .. })));
}

#[tokio::test]
async fn test_failed_create_is_retried_on_next_finalize() {
    let backend = MemoryBackend::new();
    let mut s = open(&backend).await;
    let mut events = s.events().receiver();
    backend.fail_next_creates(1);

    let now = Instant::now();
    let key = s.create_field_at(Point::new(20.0, 70.0), FieldType::Checkbox, now);
    let err = s.force_save().await.expect_err("create fails");
    assert!(matches!(err, SyncError::FinalizeFailed { failures: 1 }));
    assert!(s.canvas().get(key).is_some());

    let mut write_failed = false;
    while let Ok(event) = events.try_recv() {
        if let AppEvent::Persistence(PersistenceEvent::WriteFailed { key: failed, .. }) = event {
            assert_eq!(failed, key);
            write_failed = true;
        }
    }
    assert!(write_failed);

    s.force_save().await.expect("retry succeeds");
    assert_eq!(backend.fields(TEMPLATE).len(), 2);
    assert!(s.canvas().fields().iter().all(|f| f.key.is_durable()));
}

#[tokio::test]
async fn test_debounced_updates_merge_into_one_write() {
    let backend = MemoryBackend::new();
    let mut s = open(&backend).await;
    backend.clear_calls();
    let key = FieldKey::Remote(FieldId(1));
    let t0 = Instant::now();

    for step in 0..5u64 {
        let x = 10.0 + step as f64;
        let at = t0 + Duration::from_millis(step * 100);
        s.apply_patch_intent(key, FieldPatch::position(x, 10.0), at)
            .expect("valid position");
    }
    // Still inside the debounce window of the last change.
    s.tick(t0 + Duration::from_millis(900));
    assert!(backend.calls().is_empty());

    s.force_save().await.expect("finalize succeeds");
    let updates: Vec<_> = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Update { .. }))
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(backend.field(TEMPLATE, FieldId(1)).map(|f| f.x), Some(14.0));
}
