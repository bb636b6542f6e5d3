//! Spatial queries over the field store.

use fieldcanvas_core::{Field, FieldKey};

use super::{Canvas, ImageSize, Point, Rect};

/// Field bounds in percent space.
pub fn percent_rect(field: &Field, image: ImageSize) -> Rect {
    Rect::new(
        field.x,
        field.y,
        field.width,
        field.height_percent(image.height),
    )
}

impl Canvas {
    /// Topmost field on the active page containing a percent-space point.
    pub fn field_at(&self, point: Point, image: ImageSize) -> Option<FieldKey> {
        self.page_fields()
            .rev()
            .find(|f| percent_rect(f, image).contains(point))
            .map(|f| f.key)
    }
}
