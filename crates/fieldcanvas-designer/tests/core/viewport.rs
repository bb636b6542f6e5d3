use fieldcanvas_designer::viewport::Viewport;
use fieldcanvas_designer::{Point, Size};
use proptest::prelude::*;

fn viewport() -> Viewport {
    // Letterboxed: a square page inside a tall screen.
    Viewport::new(Size::new(400.0, 800.0), Size::new(1000.0, 1000.0))
}

#[test]
fn test_fitted_size_letterboxes() {
    let vp = viewport();
    assert_eq!(vp.fitted_size(), Size::new(400.0, 400.0));
    assert_eq!(vp.base_origin(), Point::new(0.0, 200.0));
}

#[test]
fn test_identity_camera_maps_image_to_base() {
    let vp = viewport();
    let s = vp.screen_from_image(Point::new(100.0, 50.0));
    assert_eq!(s, Point::new(100.0, 250.0));
    assert_eq!(vp.percent_from_screen(s), Point::new(25.0, 12.5));
}

#[test]
fn test_scale_anchors_on_image_center() {
    let mut vp = viewport();
    vp.set_transform(2.0, 0.0, 0.0);
    // The image center does not move under a pure scale.
    let center = vp.image_center();
    assert_eq!(vp.screen_from_image(center), Point::new(200.0, 400.0));
}

#[test]
fn test_zoom_respects_limits() {
    let mut vp = viewport();
    for _ in 0..20 {
        vp.zoom_in();
    }
    assert_eq!(vp.scale(), vp.scale_limits().1);
    for _ in 0..40 {
        vp.zoom_out();
    }
    assert_eq!(vp.scale(), vp.scale_limits().0);
    assert!(vp.reset());
    assert_eq!(vp.scale(), 1.0);
}

#[test]
fn test_non_finite_transform_is_rejected() {
    let mut vp = viewport();
    assert!(!vp.set_transform(f64::NAN, 0.0, 0.0));
    assert!(!vp.set_transform(1.5, f64::INFINITY, 0.0));
    assert_eq!(vp.scale(), 1.0);
}

proptest! {
    #[test]
    fn prop_screen_image_round_trip(
        scale in 0.5f64..4.0,
        tx in -500.0f64..500.0,
        ty in -500.0f64..500.0,
        x in -200.0f64..600.0,
        y in -200.0f64..600.0,
    ) {
        let mut vp = viewport();
        vp.set_transform(scale, tx, ty);
        let p = Point::new(x, y);
        let back = vp.image_from_screen(vp.screen_from_image(p));
        prop_assert!((back.x - p.x).abs() < 1e-6);
        prop_assert!((back.y - p.y).abs() < 1e-6);
    }

    #[test]
    fn prop_percent_round_trip(x in 0.0f64..100.0, y in 0.0f64..100.0, scale in 0.5f64..4.0) {
        let mut vp = viewport();
        vp.set_transform(scale, 13.0, -7.0);
        let p = Point::new(x, y);
        let back = vp.percent_from_screen(vp.screen_from_percent(p));
        prop_assert!((back.x - p.x).abs() < 1e-6);
        prop_assert!((back.y - p.y).abs() < 1e-6);
    }
}
