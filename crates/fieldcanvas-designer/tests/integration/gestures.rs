use fieldcanvas_core::{Field, FieldId, FieldKey, MemoryBackend, TemplateId, TemplateRecord};
use fieldcanvas_designer::{GestureMode, PlacementSession, Point, PointerEvent, Size};
use fieldcanvas_settings::CanvasConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FIELD: FieldKey = FieldKey::Remote(FieldId(1));

/// One field at (10 %, 10 %) on a 400px page filling a 400px viewport.
fn session() -> PlacementSession {
    let record = TemplateRecord {
        fields: vec![Field::new(FIELD, 10.0, 10.0, 20.0, 16.0)],
        page_count: 1,
    };
    PlacementSession::new(
        Arc::new(MemoryBackend::new()),
        TemplateId(3),
        record,
        CanvasConfig::default(),
        Size::new(400.0, 400.0),
        Size::new(400.0, 400.0),
    )
}

fn down(id: u64, x: f64, y: f64, at: Instant) -> PointerEvent {
    PointerEvent::Down {
        id,
        position: Point::new(x, y),
        at,
    }
}

fn moved(id: u64, x: f64, y: f64, at: Instant) -> PointerEvent {
    PointerEvent::Move {
        id,
        position: Point::new(x, y),
        at,
    }
}

fn up(id: u64, x: f64, y: f64, at: Instant) -> PointerEvent {
    PointerEvent::Up {
        id,
        position: Point::new(x, y),
        at,
    }
}

/// Long-presses at `x` and drags 20px right.
fn drag_right(s: &mut PlacementSession, x: f64, start: Instant) {
    s.pointer(down(1, x, 48.0, start));
    s.tick(start + Duration::from_millis(600));
    assert_eq!(s.mode(), GestureMode::DraggingField(FIELD));
    s.pointer(moved(1, x + 20.0, 48.0, start + Duration::from_millis(650)));
    s.pointer(up(1, x + 20.0, 48.0, start + Duration::from_millis(700)));
}

#[test]
fn test_undo_after_several_drags() {
    let mut s = session();
    let t0 = Instant::now();
    for (step, x) in [80.0, 100.0, 120.0].into_iter().enumerate() {
        drag_right(&mut s, x, t0 + Duration::from_secs(step as u64));
    }
    assert_eq!(s.canvas().get(FIELD).map(|f| f.x), Some(25.0));

    let later = t0 + Duration::from_secs(10);
    for _ in 0..3 {
        assert!(s.undo(later));
    }
    assert_eq!(s.canvas().get(FIELD).map(|f| f.x), Some(10.0));
    assert!(!s.undo(later));

    for _ in 0..3 {
        assert!(s.redo(later));
    }
    assert_eq!(s.canvas().get(FIELD).map(|f| f.x), Some(25.0));
}

#[test]
fn test_pinch_zooms_about_midpoint() {
    let mut s = session();
    let t0 = Instant::now();
    s.pointer(down(1, 150.0, 300.0, t0));
    s.pointer(down(2, 250.0, 300.0, t0 + Duration::from_millis(10)));
    assert_eq!(s.mode(), GestureMode::Pinching);

    s.pointer(moved(2, 350.0, 300.0, t0 + Duration::from_millis(40)));
    // Nothing is committed while fingers are down.
    assert_eq!(s.viewport().scale(), 1.0);
    assert!((s.display_camera().scale - 2.0).abs() < 1e-9);

    s.pointer(up(2, 350.0, 300.0, t0 + Duration::from_millis(60)));
    s.pointer(up(1, 150.0, 300.0, t0 + Duration::from_millis(70)));

    assert!((s.viewport().scale() - 2.0).abs() < 1e-9);
    // The image point first under the midpoint follows it.
    let followed = s.viewport().screen_from_image(Point::new(200.0, 300.0));
    assert!((followed.x - 250.0).abs() < 1e-9);
    assert!((followed.y - 300.0).abs() < 1e-9);
    assert_eq!(s.canvas().len(), 1);
}

#[test]
fn test_tap_in_empty_space_creates_and_selects() {
    let mut s = session();
    let t0 = Instant::now();
    s.pointer(down(1, 200.0, 300.0, t0));
    s.pointer(up(1, 202.0, 301.0, t0 + Duration::from_millis(90)));

    assert_eq!(s.canvas().len(), 2);
    let created = s.selection().single().expect("created field selected");
    assert!(!created.is_durable());
    let field = s.canvas().get(created).expect("created field");
    assert!(field.x >= 0.0 && field.x + field.width <= 100.0);
}

#[test]
fn test_second_tap_closes_menu_instead_of_creating() {
    let mut s = session();
    let t0 = Instant::now();
    s.pointer(down(1, 80.0, 48.0, t0));
    s.pointer(up(1, 80.0, 48.0, t0 + Duration::from_millis(50)));
    assert_eq!(s.menu_key(), Some(FIELD));

    s.pointer(down(1, 200.0, 300.0, t0 + Duration::from_millis(500)));
    s.pointer(up(1, 200.0, 300.0, t0 + Duration::from_millis(550)));
    assert_eq!(s.menu_key(), None);
    assert_eq!(s.canvas().len(), 1);
}
