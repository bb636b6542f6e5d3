//! Drag & resize engine.
//!
//! A drag snapshots the percent positions of the fields it moves and the
//! touch point that armed it. Every move converts the finger travel to a
//! percent delta through the viewport and produces a display-only preview.
//! Nothing reaches the model until [`DragSession::commit`].

mod resize;

pub use resize::{auto_size, resize_to, ApproxTextMeasurer, ResizeHandle, TextMeasurer};

use fieldcanvas_core::{Field, FieldId, FieldKey, LocalId};

use crate::canvas::Point;
use crate::geometry::clamp_position;
use crate::viewport::Viewport;

#[derive(Debug, Clone)]
struct DragItem {
    key: FieldKey,
    start: Point,
    width: f64,
    height_percent: f64,
    preview: Point,
}

impl DragItem {
    fn from_field(field: &Field, image_height: f64) -> Self {
        let start = Point::new(field.x, field.y);
        Self {
            key: field.key,
            start,
            width: field.width,
            height_percent: field.height_percent(image_height),
            preview: start,
        }
    }
}

/// An armed single-field or batch drag.
#[derive(Debug, Clone)]
pub struct DragSession {
    anchor: FieldKey,
    origin: Point,
    items: Vec<DragItem>,
    delta: Point,
    batch: bool,
}

impl DragSession {
    /// Drag of one field from the screen-space touch `origin`.
    pub fn single(field: &Field, origin: Point, image_height: f64) -> Self {
        Self {
            anchor: field.key,
            origin,
            items: vec![DragItem::from_field(field, image_height)],
            delta: Point::ZERO,
            batch: false,
        }
    }

    /// Drag of a whole multi-selection, grabbed at `anchor`.
    ///
    /// Returns `None` when `fields` is empty.
    pub fn batch<'a>(
        fields: impl IntoIterator<Item = &'a Field>,
        anchor: FieldKey,
        origin: Point,
        image_height: f64,
    ) -> Option<Self> {
        let items: Vec<DragItem> = fields
            .into_iter()
            .map(|f| DragItem::from_field(f, image_height))
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(Self {
            anchor,
            origin,
            items,
            delta: Point::ZERO,
            batch: true,
        })
    }

    pub fn anchor(&self) -> FieldKey {
        self.anchor
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.items.iter().map(|item| item.key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.items.iter().any(|item| item.key == key)
    }

    /// Current percent delta applied to the snapshot.
    pub fn delta(&self) -> Point {
        self.delta
    }

    /// Recomputes the preview for a new screen-space touch point.
    ///
    /// Returns false when the delta was not finite and the previous preview
    /// was kept.
    pub fn update(&mut self, touch: Point, viewport: &Viewport) -> bool {
        let delta = viewport.percent_delta_from_screen(touch - self.origin);
        if !delta.is_finite() {
            tracing::warn!("Discarding non-finite drag delta");
            return false;
        }

        let delta = if self.batch {
            self.clamp_group_delta(delta)
        } else {
            delta
        };
        self.delta = delta;
        for item in &mut self.items {
            let (x, y) = clamp_position(
                item.start.x + delta.x,
                item.start.y + delta.y,
                item.width,
                item.height_percent,
            );
            item.preview = Point::new(x, y);
        }
        true
    }

    /// Limits a shared delta so every member stays inside the image, which
    /// keeps the group's relative layout intact at the edges.
    fn clamp_group_delta(&self, delta: Point) -> Point {
        let mut min_dx = f64::NEG_INFINITY;
        let mut max_dx = f64::INFINITY;
        let mut min_dy = f64::NEG_INFINITY;
        let mut max_dy = f64::INFINITY;
        for item in &self.items {
            min_dx = min_dx.max(-item.start.x);
            max_dx = max_dx.min(100.0 - item.width - item.start.x);
            min_dy = min_dy.max(-item.start.y);
            max_dy = max_dy.min(100.0 - item.height_percent - item.start.y);
        }
        let dx = if min_dx <= max_dx {
            delta.x.clamp(min_dx, max_dx)
        } else {
            delta.x
        };
        let dy = if min_dy <= max_dy {
            delta.y.clamp(min_dy, max_dy)
        } else {
            delta.y
        };
        Point::new(dx, dy)
    }

    /// Preview positions of every dragged field.
    pub fn previews(&self) -> impl Iterator<Item = (FieldKey, Point)> + '_ {
        self.items.iter().map(|item| (item.key, item.preview))
    }

    pub fn preview_position(&self, key: FieldKey) -> Option<Point> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.preview)
    }

    /// Final positions of the fields that actually moved.
    pub fn commit(self) -> Vec<(FieldKey, f64, f64)> {
        self.items
            .into_iter()
            .filter(|item| item.preview != item.start)
            .map(|item| (item.key, item.preview.x, item.preview.y))
            .collect()
    }

    /// Discards the preview.
    pub fn cancel(self) {
        tracing::debug!(
            "Drag of {} field(s) cancelled, preview discarded",
            self.items.len()
        );
    }

    pub fn rekey(&mut self, local: LocalId, id: FieldId) {
        let from = FieldKey::Local(local);
        let to = FieldKey::Remote(id);
        if self.anchor == from {
            self.anchor = to;
        }
        for item in self.items.iter_mut().filter(|item| item.key == from) {
            item.key = to;
        }
    }
}
