use fieldcanvas_core::{FieldKey, FieldPatch, FieldType};
use std::time::Instant;

use super::{MarqueeState, PlacementSession};
use crate::canvas::{Point, Rect};
use crate::drag::DragSession;
use crate::gestures::{resolve_tap, GestureIntent, TapAction, TapContext};
use crate::hit_test::{resolve_target, HitContext};
use crate::selection_manager::fields_in_marquee;

impl PlacementSession {
    pub(super) fn apply_intent(&mut self, intent: GestureIntent, now: Instant) {
        tracing::trace!("Gesture intent {:?}", intent);
        match intent {
            GestureIntent::CommitEdit => {
                self.end_text_edit(now);
            }
            GestureIntent::CommitView { pan, pinch, focal } => {
                if self.viewport.apply_gesture(pan, pinch, focal) {
                    // A manual camera move wins over a queued focus pass.
                    self.focus.cancel();
                    self.emit_camera();
                }
            }
            GestureIntent::ArmFieldDrag { key, origin } => {
                if let Some(field) = self.canvas.get(key) {
                    let image_height = self.viewport.fitted_size().height;
                    self.drag = Some(DragSession::single(field, origin, image_height));
                    tracing::debug!("Armed drag of {}", key);
                }
            }
            GestureIntent::ArmBatchDrag { key, origin } => self.arm_batch_drag(key, origin, now),
            GestureIntent::DragFieldTo { key, touch } => {
                if let Some(drag) = self.drag.as_mut().filter(|d| d.anchor() == key) {
                    drag.update(touch, &self.viewport);
                }
            }
            GestureIntent::DragBatchTo { touch } => {
                if let Some(drag) = self.drag.as_mut().filter(|d| d.is_batch()) {
                    drag.update(touch, &self.viewport);
                }
            }
            GestureIntent::EndFieldDrag { .. } | GestureIntent::EndBatchDrag => {
                self.commit_drag(now);
            }
            GestureIntent::CancelFieldDrag { .. } | GestureIntent::CancelBatchDrag => {
                if let Some(drag) = self.drag.take() {
                    drag.cancel();
                }
            }
            GestureIntent::ArmMarquee { origin } => {
                let origin = self.viewport.image_from_screen(origin);
                self.marquee = Some(MarqueeState {
                    origin,
                    current: origin,
                });
                tracing::debug!("Marquee armed at ({:.1}, {:.1})", origin.x, origin.y);
            }
            GestureIntent::MarqueeTo { point } => {
                let current = self.viewport.image_from_screen(point);
                if let Some(marquee) = self.marquee.as_mut() {
                    if current.is_finite() {
                        marquee.current = current;
                    }
                }
            }
            GestureIntent::EndMarquee { point } => self.finish_marquee(point, now),
            GestureIntent::CancelMarquee => {
                self.marquee = None;
            }
            GestureIntent::Tap { point } => self.handle_tap(point, now),
        }
    }

    fn arm_batch_drag(&mut self, key: FieldKey, origin: Point, now: Instant) {
        // Slider adjustments are persisted before positions move under them.
        self.commit_batch(now);

        let keys = self.selection.selected();
        let fields = keys.iter().filter_map(|k| self.canvas.get(*k));
        let image_height = self.viewport.fitted_size().height;
        self.drag = DragSession::batch(fields, key, origin, image_height);
        if self.drag.is_some() {
            tracing::debug!("Armed batch drag of {} field(s)", keys.len());
        }
    }

    /// Writes the last drag preview into the model and schedules its save.
    fn commit_drag(&mut self, now: Instant) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let batch = drag.is_batch();
        let moves = drag.commit();
        if moves.is_empty() {
            return;
        }

        let before = self.canvas.snapshot();
        for (key, x, y) in &moves {
            if let Some(field) = self.canvas.get_mut(*key) {
                field.x = *x;
                field.y = *y;
            }
            self.sync
                .schedule_update(*key, FieldPatch::position(*x, *y), now);
            self.emit_field_updated(*key);
        }
        self.checkpoint(before);
        tracing::debug!("Committed drag of {} field(s)", moves.len());

        if batch {
            self.recapture_batch();
        }
    }

    fn finish_marquee(&mut self, point: Point, now: Instant) {
        let Some(mut marquee) = self.marquee.take() else {
            return;
        };
        let current = self.viewport.image_from_screen(point);
        if current.is_finite() {
            marquee.current = current;
        }

        let rect = Rect::from_corners(
            self.viewport.percent_from_image(marquee.origin),
            self.viewport.percent_from_image(marquee.current),
        );
        let image = self.viewport.fitted_size();
        let keys = fields_in_marquee(self.canvas.page_fields(), rect, image);
        tracing::debug!("Marquee selected {} field(s)", keys.len());
        self.selection.enter_multi(keys);
        self.selection_changed(now);
    }

    /// Dispatches exactly one action for an unconsumed tap.
    fn handle_tap(&mut self, point: Point, now: Instant) {
        let selected = self.selection.selected();
        let target = resolve_target(
            point,
            &HitContext {
                canvas: &self.canvas,
                viewport: &self.viewport,
                menu_rect: self.menu.as_ref().and_then(|m| m.rect),
                selected: &selected,
                hit_slop_px: self.config.gestures.hit_slop_px,
            },
        );
        let recent = self.config.gestures.recent_delete();
        let ctx = TapContext {
            target,
            editing: self.editing.is_some(),
            menu_open: self.menu.is_some(),
            multi_select: self.selection.is_multi(),
            has_selection: !self.selection.is_empty(),
            recently_deleted: self
                .last_delete
                .is_some_and(|at| now.saturating_duration_since(at) < recent),
        };

        let action = resolve_tap(&ctx);
        tracing::debug!("Tap on {:?} -> {:?}", target, action);
        match action {
            TapAction::None => {}
            TapAction::BlurEdit => {
                self.end_text_edit(now);
            }
            TapAction::ToggleMulti(key) => {
                self.selection.toggle_multi(key);
                self.selection_changed(now);
            }
            TapAction::OpenMenu(key) => {
                self.select(key, now);
                self.open_menu(key, now);
            }
            TapAction::CloseMenu => self.close_menu(now),
            TapAction::Deselect => self.clear_selection(now),
            TapAction::CreateField => {
                let percent = self.viewport.percent_from_screen(point);
                if percent.is_finite() {
                    self.create_field_at(percent, FieldType::Text, now);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{at, session};
    use crate::canvas::Point;
    use crate::gestures::{GestureMode, PointerEvent};
    use fieldcanvas_core::{FieldId, FieldKey};
    use std::time::Duration;

    fn down(p: Point, ms: u64) -> PointerEvent {
        PointerEvent::Down {
            id: 1,
            position: p,
            at: at(ms),
        }
    }

    fn moved(p: Point, ms: u64) -> PointerEvent {
        PointerEvent::Move {
            id: 1,
            position: p,
            at: at(ms),
        }
    }

    fn up(p: Point, ms: u64) -> PointerEvent {
        PointerEvent::Up {
            id: 1,
            position: p,
            at: at(ms),
        }
    }

    #[test]
    fn test_tap_on_empty_document_creates_field() {
        let mut s = session();
        let before = s.canvas().len();
        let p = Point::new(200.0, 350.0);
        s.pointer(down(p, 0));
        s.pointer(up(p, 80));

        assert_eq!(s.canvas().len(), before + 1);
        let created = s.selection().single().expect("new field is selected");
        assert!(!created.is_durable());
        assert_eq!(s.sync().pending_creates(), 1);
    }

    #[test]
    fn test_tap_on_field_opens_menu() {
        let mut s = session();
        // Field 1 spans x 10..30 % and y 10..14 % of the 400px image.
        let p = Point::new(80.0, 45.0);
        s.pointer(down(p, 0));
        s.pointer(up(p, 60));
        let key = FieldKey::Remote(FieldId(1));
        assert_eq!(s.selection().single(), Some(key));
        assert_eq!(s.menu_key(), Some(key));
    }

    #[test]
    fn test_pan_does_not_tap() {
        let mut s = session();
        let before = s.canvas().len();
        s.pointer(down(Point::new(200.0, 300.0), 0));
        s.pointer(moved(Point::new(260.0, 300.0), 40));
        assert_eq!(s.mode(), GestureMode::Panning);
        s.pointer(up(Point::new(260.0, 300.0), 80));

        assert_eq!(s.canvas().len(), before);
        assert_eq!(s.viewport().camera().translate_x, 60.0);
    }

    #[test]
    fn test_long_press_drag_commits_on_release() {
        let mut s = session();
        let key = FieldKey::Remote(FieldId(1));
        let start = Point::new(80.0, 45.0);
        s.pointer(down(start, 0));
        s.tick(at(600));
        assert_eq!(s.mode(), GestureMode::DraggingField(key));

        // 40px on a 400px image at scale 1 is 10 %.
        s.pointer(moved(Point::new(120.0, 45.0), 650));
        assert_eq!(s.canvas().get(key).map(|f| f.x), Some(10.0));
        assert_eq!(s.display_field(key).map(|f| f.x), Some(20.0));

        s.pointer(up(Point::new(120.0, 45.0), 700));
        assert_eq!(s.canvas().get(key).map(|f| f.x), Some(20.0));
        assert!(s.can_undo());
        assert!(s.sync().pending_patch(key).is_some());
    }

    #[test]
    fn test_cancelled_drag_leaves_model_alone() {
        let mut s = session();
        let key = FieldKey::Remote(FieldId(1));
        s.pointer(down(Point::new(80.0, 45.0), 0));
        s.tick(at(600));
        s.pointer(moved(Point::new(160.0, 45.0), 650));
        s.pointer(PointerEvent::Cancel { id: 1, at: at(700) });

        assert_eq!(s.canvas().get(key).map(|f| f.x), Some(10.0));
        assert!(s.drag_preview().is_empty());
        assert!(!s.can_undo());
    }

    #[test]
    fn test_tap_right_after_delete_does_not_create() {
        let mut s = session();
        let t0 = at(0);
        s.delete_field(FieldKey::Remote(FieldId(2)), t0);
        let before = s.canvas().len();

        let p = Point::new(300.0, 380.0);
        s.pointer(down(p, 50));
        s.pointer(up(p, 100));
        assert_eq!(s.canvas().len(), before);

        let later = at(100) + Duration::from_millis(1_000);
        s.pointer(PointerEvent::Down {
            id: 2,
            position: p,
            at: later,
        });
        s.pointer(PointerEvent::Up {
            id: 2,
            position: p,
            at: later + Duration::from_millis(50),
        });
        assert_eq!(s.canvas().len(), before + 1);
    }

    #[test]
    fn test_marquee_selects_by_center() {
        let mut s = session();
        s.set_marquee_mode(true);
        let origin = Point::new(0.0, 0.0);
        s.pointer(down(origin, 0));
        s.tick(at(600));
        assert_eq!(s.mode(), GestureMode::DrawingMarquee);
        // Covers the center of field 1 at (20 %, 12 %) but not field 2.
        s.pointer(moved(Point::new(100.0, 60.0), 650));
        let rect = s.marquee_rect().expect("marquee preview");
        assert_eq!(rect.width, 25.0);
        s.pointer(up(Point::new(100.0, 60.0), 700));

        assert_eq!(s.selection().selected(), vec![FieldKey::Remote(FieldId(1))]);
        assert!(s.marquee_rect().is_none());
    }
}
