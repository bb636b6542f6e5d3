use fieldcanvas_core::{Field, FieldId, FieldKey, MemoryBackend, TemplateId, TemplateRecord};
use fieldcanvas_designer::{BatchAdjust, PlacementSession, Size};
use fieldcanvas_settings::CanvasConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn key(id: u64) -> FieldKey {
    FieldKey::Remote(FieldId(id))
}

/// Three 10 % wide fields in one row with 10 % gaps.
fn row_session() -> PlacementSession {
    let record = TemplateRecord {
        fields: vec![
            Field::new(key(1), 10.0, 10.0, 10.0, 16.0),
            Field::new(key(2), 30.0, 10.0, 10.0, 16.0),
            Field::new(key(3), 50.0, 10.0, 10.0, 16.0),
        ],
        page_count: 1,
    };
    PlacementSession::new(
        Arc::new(MemoryBackend::new()),
        TemplateId(1),
        record,
        CanvasConfig::default(),
        Size::new(400.0, 400.0),
        Size::new(400.0, 400.0),
    )
}

fn xs(session: &PlacementSession) -> Vec<f64> {
    (1..=3)
        .filter_map(|id| session.canvas().get(key(id)).map(|f| f.x))
        .collect()
}

#[test]
fn test_baseline_adjustment_changes_nothing() {
    let mut s = row_session();
    let now = Instant::now();
    assert_eq!(s.select_row(key(1), now), 3);
    assert!(s.batch_snapshot().is_some());

    let before = s.canvas().snapshot();
    assert!(s.set_batch_adjust(BatchAdjust::default()));
    assert_eq!(s.canvas().snapshot(), before);
    assert_eq!(s.commit_batch(now), 0);
    assert!(!s.can_undo());
}

#[test]
fn test_spacing_preview_commit_and_undo() {
    let mut s = row_session();
    let now = Instant::now();
    s.select_row(key(2), now);

    let wide = BatchAdjust {
        horizontal_spacing: 200.0,
        ..BatchAdjust::default()
    };
    s.set_batch_adjust(wide);
    assert_eq!(xs(&s), vec![10.0, 40.0, 70.0]);
    // Previewing never schedules writes.
    assert!(s.sync().pending_patch(key(2)).is_none());

    // Same slider value twice lands on the same layout.
    s.set_batch_adjust(wide);
    assert_eq!(xs(&s), vec![10.0, 40.0, 70.0]);

    assert_eq!(s.commit_batch(now + Duration::from_millis(10)), 2);
    assert!(s.sync().pending_patch(key(3)).is_some());
    assert_eq!(s.batch_adjust(), Some(BatchAdjust::default()));

    assert!(s.undo(now + Duration::from_millis(20)));
    assert_eq!(xs(&s), vec![10.0, 30.0, 50.0]);
    // The multi-selection survives the undo.
    assert_eq!(s.selection().len(), 3);
}

#[test]
fn test_selection_change_commits_pending_adjustment() {
    let mut s = row_session();
    let now = Instant::now();
    s.select_row(key(1), now);
    s.set_batch_adjust(BatchAdjust {
        width: 150.0,
        ..BatchAdjust::default()
    });

    s.clear_selection(now + Duration::from_millis(5));
    assert!(s.batch_snapshot().is_none());
    assert_eq!(s.canvas().get(key(1)).map(|f| f.width), Some(15.0));
    assert!(s.sync().pending_patch(key(1)).is_some());
    assert!(s.can_undo());
}
