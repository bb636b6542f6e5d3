use fieldcanvas_core::{Field, FieldId, FieldKey, FieldType};
use fieldcanvas_designer::drag::{auto_size, resize_to};
use fieldcanvas_designer::viewport::Viewport;
use fieldcanvas_designer::{Point, ResizeHandle, Size};
use fieldcanvas_settings::FieldDefaults;

const IMAGE: Size = Size {
    width: 400.0,
    height: 400.0,
};

fn viewport() -> Viewport {
    Viewport::new(IMAGE, IMAGE)
}

fn checkbox() -> Field {
    // 16px square on a 400px wide image is 4 % wide.
    Field::new(FieldKey::Remote(FieldId(1)), 10.0, 10.0, 4.0, 16.0)
        .with_type(FieldType::Checkbox)
}

fn assert_square(width: f64, height: f64) {
    assert!((width / 100.0 * IMAGE.width - height).abs() < 1e-9);
}

#[test]
fn test_checkbox_right_handle_keeps_square() {
    let (width, height) = resize_to(
        &checkbox(),
        ResizeHandle::Right,
        Point::new(40.0, 0.0),
        &viewport(),
        &FieldDefaults::default(),
    );
    assert!((width - 14.0).abs() < 1e-9);
    assert_square(width, height);
}

#[test]
fn test_checkbox_corner_follows_dominant_axis() {
    let (width, height) = resize_to(
        &checkbox(),
        ResizeHandle::BottomRight,
        Point::new(4.0, 20.0),
        &viewport(),
        &FieldDefaults::default(),
    );
    assert!((height - 36.0).abs() < 1e-9);
    assert_square(width, height);
}

#[test]
fn test_checkbox_has_minimum_side() {
    let defaults = FieldDefaults::default();
    let (width, height) = resize_to(
        &checkbox(),
        ResizeHandle::Bottom,
        Point::new(0.0, -100.0),
        &viewport(),
        &defaults,
    );
    assert_eq!(height, defaults.min_boolean_size_px);
    assert_square(width, height);
}

#[test]
fn test_text_resize_is_bounded() {
    let field = Field::new(FieldKey::Remote(FieldId(2)), 70.0, 10.0, 20.0, 20.0);
    let defaults = FieldDefaults::default();

    let (width, _) = resize_to(
        &field,
        ResizeHandle::Right,
        Point::new(400.0, 0.0),
        &viewport(),
        &defaults,
    );
    assert_eq!(width, 30.0);

    let (width, height) = resize_to(
        &field,
        ResizeHandle::BottomRight,
        Point::new(-1000.0, -1000.0),
        &viewport(),
        &defaults,
    );
    assert_eq!(width, defaults.min_width_percent);
    // One line of 12pt text at 1.2 line height.
    assert!((height - 14.4).abs() < 1e-9);
}

#[test]
fn test_resize_delta_is_divided_by_scale() {
    let field = Field::new(FieldKey::Remote(FieldId(3)), 10.0, 10.0, 20.0, 20.0);
    let mut vp = viewport();
    vp.set_transform(2.0, 0.0, 0.0);
    let (width, _) = resize_to(
        &field,
        ResizeHandle::Right,
        Point::new(80.0, 0.0),
        &vp,
        &FieldDefaults::default(),
    );
    assert!((width - 30.0).abs() < 1e-9);
}

#[test]
fn test_auto_size_width_grows_height_follows() {
    let field = Field::new(FieldKey::Remote(FieldId(4)), 10.0, 10.0, 20.0, 20.0);
    let defaults = FieldDefaults::default();

    // Narrower, shorter text keeps the width and shrinks to one line.
    let (width, height) =
        auto_size(&field, Size::new(40.0, 10.0), IMAGE, &defaults).expect("shorter text");
    assert_eq!(width, 20.0);
    assert!((height - 14.4).abs() < 1e-9);

    assert_eq!(auto_size(&field, Size::new(40.0, 20.0), IMAGE, &defaults), None);
    let (width, _) =
        auto_size(&field, Size::new(200.0, 20.0), IMAGE, &defaults).expect("wider text");
    assert!(width > 20.0);
}
