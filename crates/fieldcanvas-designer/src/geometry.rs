//! Geometry rules for field records.
//!
//! Pure functions enforcing the field invariants:
//! - `0 <= x` and `x + width <= 100` (percent)
//! - `height >= min_height(...)` (image pixels)
//! - checkbox/radio fields are square, with width derived from height using
//!   the image's pixel width
//! - `line_count >= 1`, and boolean fields are single line

use fieldcanvas_core::{Field, FieldKey, FieldType, ValidationError};
use fieldcanvas_settings::FieldDefaults;

use crate::canvas::{ImageSize, Point};

const EPSILON: f64 = 1e-6;

/// Smallest height a field may have, in image pixels.
pub fn min_height(
    field_type: FieldType,
    font_size: f64,
    line_height: f64,
    line_count: u32,
    defaults: &FieldDefaults,
) -> f64 {
    if field_type.is_boolean() {
        return defaults.min_boolean_size_px;
    }
    let text_height = font_size * line_height * f64::from(line_count.max(1));
    if text_height.is_finite() {
        text_height.max(defaults.min_height_px)
    } else {
        defaults.min_height_px
    }
}

/// Lines a text field renders: its line count, or more when the text has
/// more hard breaks.
pub fn rendered_lines(field: &Field) -> u32 {
    if field.field_type.is_boolean() {
        return 1;
    }
    let text_lines = u32::try_from(field.text.split('\n').count()).unwrap_or(u32::MAX);
    field.line_count.max(text_lines)
}

pub fn min_height_for(field: &Field, defaults: &FieldDefaults) -> f64 {
    min_height(
        field.field_type,
        field.font_size,
        field.line_height,
        rendered_lines(field),
        defaults,
    )
}

/// Width in percent of a square whose side is `height_px`.
pub fn square_width_for_height(height_px: f64, image: ImageSize) -> f64 {
    if image.width <= 0.0 {
        return 0.0;
    }
    height_px / image.width * 100.0
}

/// Side in pixels of a square `width_percent` wide.
pub fn square_height_for_width(width_percent: f64, image: ImageSize) -> f64 {
    width_percent / 100.0 * image.width
}

/// Keeps a box of the given percent size inside the image.
pub fn clamp_position(x: f64, y: f64, width: f64, height_percent: f64) -> (f64, f64) {
    let max_x = (100.0 - width).max(0.0);
    let max_y = (100.0 - height_percent).max(0.0);
    (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
}

/// Non-finite values fall back to the last good value.
pub fn sanitize(value: f64, last_good: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!("Discarding non-finite coordinate");
        last_good
    }
}

/// Brings a field into compliance with every invariant.
pub fn normalize(field: &mut Field, image: ImageSize, defaults: &FieldDefaults) {
    field.x = sanitize(field.x, 0.0);
    field.y = sanitize(field.y, 0.0);
    field.width = sanitize(field.width, defaults.width_percent);
    field.font_size = sanitize(field.font_size, defaults.font_size);
    field.line_height = sanitize(field.line_height, defaults.line_height);
    field.first_line_indent = sanitize(field.first_line_indent, 0.0);
    field.line_count = field.line_count.max(1);

    let floor = min_height_for(field, defaults);
    field.height = sanitize(field.height, floor);

    if field.field_type.is_boolean() {
        field.line_count = 1;
        if field.text.contains('\n') {
            field.text = field.text.replace('\n', " ");
        }

        let max_side = square_height_for_width(100.0, image);
        let side = field.height.max(defaults.min_boolean_size_px).min(max_side);
        field.height = side;
        field.width = square_width_for_height(side, image);
    } else {
        field.width = field.width.clamp(defaults.min_width_percent.min(100.0), 100.0);
        field.height = field.height.max(floor);
    }

    let (x, y) = clamp_position(
        field.x,
        field.y,
        field.width,
        field.height_percent(image.height),
    );
    field.x = x;
    field.y = y;
}

/// A new field centered on a percent-space point.
pub fn default_field_at(
    point: Point,
    page: u32,
    field_type: FieldType,
    defaults: &FieldDefaults,
    image: ImageSize,
) -> Field {
    let mut field = Field::new(FieldKey::new_local(), 0.0, 0.0, defaults.width_percent, 0.0)
        .with_type(field_type)
        .on_page(page);
    field.font_family = defaults.font_family.clone();
    field.font_size = defaults.font_size;
    field.line_height = defaults.line_height;
    field.color = defaults.color.clone();

    if field_type.is_boolean() {
        field.height = defaults.boolean_size_px;
        field.width = square_width_for_height(field.height, image);
    } else {
        field.height = min_height_for(&field, defaults);
    }

    field.x = point.x - field.width / 2.0;
    field.y = point.y - field.height_percent(image.height) / 2.0;
    normalize(&mut field, image, defaults);
    field
}

/// Copy of `source` under a fresh local id, shifted down-right by `offset_px`.
pub fn duplicate_of(source: &Field, offset_px: f64, image: ImageSize) -> Field {
    let mut copy = source.clone();
    copy.key = FieldKey::new_local();

    let dx = if image.width > 0.0 {
        offset_px / image.width * 100.0
    } else {
        0.0
    };
    let dy = if image.height > 0.0 {
        offset_px / image.height * 100.0
    } else {
        0.0
    };
    let (x, y) = clamp_position(
        source.x + dx,
        source.y + dy,
        copy.width,
        copy.height_percent(image.height),
    );
    copy.x = x;
    copy.y = y;
    copy
}

/// Checks the invariants a form must satisfy before its save is dispatched.
pub fn validate(field: &Field) -> Result<(), ValidationError> {
    let key = field.key;
    let geometry = [field.x, field.y, field.width, field.height];
    if geometry.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidGeometry {
            key,
            reason: "non-finite coordinate".to_string(),
        });
    }
    if field.width <= 0.0 || field.height <= 0.0 {
        return Err(ValidationError::InvalidGeometry {
            key,
            reason: "size must be positive".to_string(),
        });
    }
    if field.x < -EPSILON || field.x + field.width > 100.0 + EPSILON {
        return Err(ValidationError::InvalidGeometry {
            key,
            reason: format!("x {:.2} + width {:.2} leaves the image", field.x, field.width),
        });
    }
    if field.line_count == 0 {
        return Err(ValidationError::ZeroLineCount { key });
    }
    if field.field_type.is_boolean() {
        let lines = field.text.lines().count() as u32;
        if field.line_count > 1 || lines > 1 {
            return Err(ValidationError::MultiLineBoolean {
                key,
                line_count: field.line_count.max(lines),
            });
        }
    }
    match field.field_type {
        FieldType::Radio if field.group_id.as_deref().is_none_or(|g| g.trim().is_empty()) => {
            Err(ValidationError::RadioWithoutGroup { key })
        }
        FieldType::Select if field.option_list().is_empty() => {
            Err(ValidationError::SelectWithoutOptions { key })
        }
        _ => Ok(()),
    }
}
