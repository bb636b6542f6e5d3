use fieldcanvas_core::Field;
use fieldcanvas_settings::FieldDefaults;

use crate::canvas::{ImageSize, Point, Size};
use crate::geometry::{min_height_for, square_height_for_width, square_width_for_height};
use crate::viewport::Viewport;

/// Which edge or corner is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    Right,
    Bottom,
    BottomRight,
}

/// New `(width %, height px)` after dragging `handle` by a screen delta.
///
/// Widths never go past the image's right edge and heights never below the
/// rendered text. Checkbox and radio fields stay square: the axis the handle
/// drives (or the dominant one for the corner) determines the other.
pub fn resize_to(
    field: &Field,
    handle: ResizeHandle,
    delta: Point,
    viewport: &Viewport,
    defaults: &FieldDefaults,
) -> (f64, f64) {
    let image = viewport.fitted_size();
    let scale = viewport.scale();
    let dw = delta.x / scale / image.width * 100.0;
    let dh = delta.y / scale;

    let (mut width, mut height) = match handle {
        ResizeHandle::Right => (field.width + dw, field.height),
        ResizeHandle::Bottom => (field.width, field.height + dh),
        ResizeHandle::BottomRight => (field.width + dw, field.height + dh),
    };
    if !(width.is_finite() && height.is_finite()) {
        tracing::warn!("Discarding non-finite resize of {}", field.key);
        return (field.width, field.height);
    }

    let max_width = (100.0 - field.x).max(0.0);
    let max_height = ((100.0 - field.y) / 100.0 * image.height).max(0.0);

    if field.field_type.is_boolean() {
        let width_driven = match handle {
            ResizeHandle::Right => true,
            ResizeHandle::Bottom => false,
            ResizeHandle::BottomRight => delta.x.abs() >= delta.y.abs(),
        };
        let side = if width_driven {
            square_height_for_width(width, image)
        } else {
            height
        };
        let limit = square_height_for_width(max_width, image).min(max_height);
        let side = side.min(limit).max(defaults.min_boolean_size_px);
        return (square_width_for_height(side, image), side);
    }

    let min_width = defaults.min_width_percent.min(max_width);
    width = width.clamp(min_width, max_width);
    height = height.min(max_height).max(min_height_for(field, defaults));
    (width, height)
}

/// Natural size of a text run, in image pixels.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font_family: &str, font_size: f64, line_height: f64) -> Size;
}

/// Fixed-advance estimate for environments without font metrics.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTextMeasurer {
    /// Average glyph advance as a fraction of the font size.
    pub advance: f64,
}

impl Default for ApproxTextMeasurer {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasurer for ApproxTextMeasurer {
    fn measure(&self, text: &str, _font_family: &str, font_size: f64, line_height: f64) -> Size {
        let lines: Vec<&str> = text.split('\n').collect();
        let longest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        Size::new(
            longest as f64 * self.advance * font_size,
            lines.len() as f64 * font_size * line_height,
        )
    }
}

/// Fits a text field to its measured content.
///
/// Width only grows, clamped to the space left on the image. Height follows
/// the measurement both ways, floored at the rendered-text minimum. Returns
/// the new `(width %, height px)` or `None` when nothing changes.
pub fn auto_size(
    field: &Field,
    measured: Size,
    image: ImageSize,
    defaults: &FieldDefaults,
) -> Option<(f64, f64)> {
    if field.field_type.is_boolean() || image.width <= 0.0 {
        return None;
    }
    if !(measured.width.is_finite() && measured.height.is_finite()) {
        return None;
    }

    let wanted = measured.width / image.width * 100.0;
    let room = (100.0 - field.x).max(field.width);
    let width = field.width.max(wanted.min(room));
    let height = measured.height.max(min_height_for(field, defaults));

    if width == field.width && height == field.height {
        None
    } else {
        Some((width, height))
    }
}
