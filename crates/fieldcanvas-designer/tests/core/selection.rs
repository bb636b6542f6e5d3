use fieldcanvas_core::{Field, FieldId, FieldKey};
use fieldcanvas_designer::selection_manager::{
    fields_in_marquee, select_column, select_group, select_row,
};
use fieldcanvas_designer::{Point, Rect, Selection, SelectionManager, Size};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn key(id: u64) -> FieldKey {
    FieldKey::Remote(FieldId(id))
}

#[test]
fn test_marquee_overlap_without_center_is_not_selected() {
    // 50px tall on a 200px image: 25 % tall, center at (20 %, 22.5 %).
    let field = Field::new(key(1), 10.0, 10.0, 20.0, 50.0);
    let image = Size::new(200.0, 200.0);
    let rect = Rect::from_corners(Point::new(0.0, 0.0), Point::new(15.0, 15.0));
    assert!(fields_in_marquee([&field], rect, image).is_empty());

    let rect = Rect::from_corners(Point::new(0.0, 0.0), Point::new(25.0, 25.0));
    assert_eq!(fields_in_marquee([&field], rect, image), vec![key(1)]);
}

#[test]
fn test_row_and_column_tolerance() {
    let fields = vec![
        Field::new(key(1), 10.0, 20.0, 10.0, 10.0),
        Field::new(key(2), 40.0, 21.0, 10.0, 10.0),
        Field::new(key(3), 10.5, 50.0, 10.0, 10.0),
        Field::new(key(4), 70.0, 30.0, 10.0, 10.0),
    ];
    assert_eq!(select_row(&fields, &fields[0], 1.5), vec![key(1), key(2)]);
    assert_eq!(select_column(&fields, &fields[0], 1.5), vec![key(1), key(3)]);
}

#[test]
fn test_group_selection_requires_group() {
    let mut a = Field::new(key(1), 10.0, 10.0, 5.0, 10.0);
    let mut b = Field::new(key(2), 20.0, 10.0, 5.0, 10.0);
    let c = Field::new(key(3), 30.0, 10.0, 5.0, 10.0);
    assert!(select_group([&a, &b, &c], &a).is_empty());

    a.group_id = Some("color".to_string());
    b.group_id = Some("color".to_string());
    assert_eq!(select_group([&a, &b, &c], &a), vec![key(1), key(2)]);
}

#[test]
fn test_toggle_multi_until_empty() {
    let mut selection = SelectionManager::new();
    selection.enter_multi([key(1), key(2)]);
    assert!(selection.is_multi());

    selection.toggle_multi(key(2));
    assert_eq!(selection.len(), 1);
    selection.toggle_multi(key(1));
    assert!(selection.is_empty());
    assert!(matches!(selection.selection(), Selection::None));
}

proptest! {
    #[test]
    fn prop_marquee_corner_order_is_irrelevant(
        ax in 0.0f64..100.0,
        ay in 0.0f64..100.0,
        bx in 0.0f64..100.0,
        by in 0.0f64..100.0,
    ) {
        let fields: Vec<Field> = (0..25u64)
            .map(|i| Field::new(key(i), (i % 5) as f64 * 20.0, (i / 5) as f64 * 20.0, 10.0, 20.0))
            .collect();
        let image = Size::new(200.0, 200.0);
        let forward = Rect::new(ax, ay, bx - ax, by - ay);
        let backward = Rect::new(bx, by, ax - bx, ay - by);
        prop_assert_eq!(
            fields_in_marquee(&fields, forward, image),
            fields_in_marquee(&fields, backward, image)
        );
    }
}
