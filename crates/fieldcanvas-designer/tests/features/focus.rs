use fieldcanvas_core::{Field, FieldId, FieldKey, MemoryBackend, TemplateId, TemplateRecord};
use fieldcanvas_designer::focus::compute_focus;
use fieldcanvas_designer::viewport::Viewport;
use fieldcanvas_designer::{Obstruction, PlacementSession, Point, Size};
use fieldcanvas_settings::{CanvasConfig, FocusSettings};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn key(id: u64) -> FieldKey {
    FieldKey::Remote(FieldId(id))
}

fn viewport() -> Viewport {
    Viewport::new(Size::new(400.0, 400.0), Size::new(400.0, 400.0))
}

#[test]
fn test_visible_field_at_matching_scale_stays_put() {
    // 25 % wide: the width fit is 0.5 * 400 / 100 = 2.0.
    let field = Field::new(key(1), 37.5, 47.5, 25.0, 16.0);
    let mut vp = viewport();
    vp.set_transform(2.0, 0.0, 0.0);
    let settings = FocusSettings::default();
    assert!(compute_focus(&field, &vp, Obstruction::default(), &settings).is_none());
}

#[test]
fn test_field_lands_above_keyboard() {
    let field = Field::new(key(1), 40.0, 80.0, 20.0, 16.0);
    let vp = viewport();
    let obstruction = Obstruction {
        keyboard_height: 300.0,
        ..Obstruction::default()
    };
    let settings = FocusSettings::default();
    let camera = compute_focus(&field, &vp, obstruction, &settings).expect("field is covered");
    // min(0.5 * 400 / 80, 0.5 * 100 / 16)
    assert!((camera.scale - 2.5).abs() < 1e-9);

    let mut focused = vp.clone();
    focused.set_camera(camera);
    let center = focused.screen_from_image(vp.image_rect_for_field(&field).center());
    assert!((center.x - 200.0).abs() < 1e-9);
    assert!((center.y - 100.0 * settings.anchor_fraction).abs() < 1e-9);
    assert!(center.y < 400.0 - obstruction.height());
}

#[test]
fn test_disabled_focus_leaves_camera_alone() {
    let mut config = CanvasConfig::default();
    config.focus.enabled = false;
    let record = TemplateRecord {
        fields: vec![Field::new(key(1), 40.0, 80.0, 20.0, 16.0)],
        page_count: 1,
    };
    let mut s = PlacementSession::new(
        Arc::new(MemoryBackend::new()),
        TemplateId(1),
        record,
        config,
        Size::new(400.0, 400.0),
        Size::new(400.0, 400.0),
    );
    let now = Instant::now();
    s.select(key(1), now);
    s.tick(now + Duration::from_millis(500));
    assert_eq!(s.viewport().scale(), 1.0);
    assert_eq!(s.viewport().camera().translate(), Point::ZERO);
}
