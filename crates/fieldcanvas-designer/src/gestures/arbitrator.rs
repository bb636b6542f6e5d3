use fieldcanvas_core::{FieldId, FieldKey, LocalId};
use fieldcanvas_settings::GestureSettings;
use std::time::Instant;

use super::{GestureHost, GestureIntent, GestureMode, GesturePhase, PointerEvent, PointerId};
use crate::canvas::Point;
use crate::hit_test::TouchTarget;

/// Uncommitted pan/pinch of the current gesture, in screen space.
///
/// Applying it means: the image point under `focal` moves to `focal + pan`
/// while the scale is multiplied by `pinch`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPreview {
    pub pan: Point,
    pub pinch: f64,
    pub focal: Point,
}

#[derive(Debug, Clone)]
struct ActiveGesture {
    primary: PointerId,
    pointers: Vec<(PointerId, Point)>,
    origin: Point,
    started: Instant,
    target: TouchTarget,
    consumed: bool,
    /// Pan accumulated before a second finger turned the gesture into a pinch.
    base_pan: Point,
    pinch_distance: f64,
    pinch_midpoint: Point,
}

impl ActiveGesture {
    fn position(&self, id: PointerId) -> Option<Point> {
        self.pointers
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| *p)
    }

    fn primary_position(&self) -> Point {
        self.position(self.primary).unwrap_or(self.origin)
    }

    fn travel(&self) -> f64 {
        self.origin.distance(&self.primary_position())
    }

    fn two_finger(&self) -> Option<(Point, Point)> {
        match self.pointers.as_slice() {
            [(_, a), (_, b), ..] => Some((*a, *b)),
            _ => None,
        }
    }
}

/// Single authority over what the current gesture is doing.
#[derive(Debug, Clone)]
pub struct GestureArbitrator {
    settings: GestureSettings,
    mode: GestureMode,
    phase: GesturePhase,
    gesture: Option<ActiveGesture>,
    preview: Option<ViewPreview>,
}

impl GestureArbitrator {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            mode: GestureMode::Idle,
            phase: GesturePhase::Idle,
            gesture: None,
            preview: None,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Target resolved at gesture-begin.
    pub fn target(&self) -> Option<TouchTarget> {
        self.gesture.as_ref().map(|g| g.target)
    }

    /// Pan/pinch preview of a gesture still in progress.
    pub fn view_preview(&self) -> Option<ViewPreview> {
        self.preview
    }

    /// Feeds one pointer event through the state machine.
    pub fn handle(&mut self, event: PointerEvent, host: &dyn GestureHost) -> Vec<GestureIntent> {
        match event {
            PointerEvent::Down { id, position, at } => self.on_down(id, position, at, host),
            PointerEvent::Move { id, position, at } => self.on_move(id, position, at, host),
            PointerEvent::Up { id, position, at } => self.on_up(id, position, at, host),
            PointerEvent::Cancel { id, .. } => self.on_cancel(id),
        }
    }

    /// Arms a long press whose delay elapsed without further movement.
    pub fn tick(&mut self, now: Instant, host: &dyn GestureHost) -> Vec<GestureIntent> {
        let mut intents = Vec::new();
        self.check_long_press(now, host, &mut intents);
        intents
    }

    /// Readdresses a local field after its create completed.
    pub fn rekey(&mut self, local: LocalId, id: FieldId) {
        let from = FieldKey::Local(local);
        let to = FieldKey::Remote(id);
        self.mode = match self.mode {
            GestureMode::DraggingField(key) if key == from => GestureMode::DraggingField(to),
            GestureMode::DraggingBatch(key) if key == from => GestureMode::DraggingBatch(to),
            mode => mode,
        };
        if let Some(gesture) = self.gesture.as_mut() {
            if gesture.target == TouchTarget::Field(from) {
                gesture.target = TouchTarget::Field(to);
            }
        }
    }

    /// Restarts an unfinished pan or pinch from where the fingers are now.
    ///
    /// Called after the camera was set outside the gesture, so the eventual
    /// commit only carries movement made after that point.
    pub fn rebase_view(&mut self) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        match self.mode {
            GestureMode::Panning => {
                gesture.origin = gesture.primary_position();
                self.preview = Some(ViewPreview {
                    pan: Point::ZERO,
                    pinch: 1.0,
                    focal: gesture.origin,
                });
            }
            GestureMode::Pinching => {
                gesture.base_pan = Point::ZERO;
                if let Some((a, b)) = gesture.two_finger() {
                    gesture.pinch_distance = a.distance(&b);
                    gesture.pinch_midpoint = a.midpoint(&b);
                }
                self.preview = Some(ViewPreview {
                    pan: Point::ZERO,
                    pinch: 1.0,
                    focal: gesture.pinch_midpoint,
                });
            }
            _ => {}
        }
    }

    /// Drops the current gesture without emitting anything.
    pub fn reset(&mut self) {
        self.mode = GestureMode::Idle;
        self.phase = GesturePhase::Idle;
        self.gesture = None;
        self.preview = None;
    }

    fn on_down(
        &mut self,
        id: PointerId,
        position: Point,
        at: Instant,
        host: &dyn GestureHost,
    ) -> Vec<GestureIntent> {
        let mut intents = Vec::new();

        if let Some(gesture) = self.gesture.as_mut() {
            if gesture.position(id).is_some() {
                return intents;
            }
            gesture.pointers.push((id, position));
            if matches!(
                self.mode,
                GestureMode::Pressing | GestureMode::Editing | GestureMode::Panning
            ) {
                if let Some((a, b)) = gesture.two_finger() {
                    gesture.consumed = true;
                    gesture.base_pan = self.preview.map(|p| p.pan).unwrap_or(Point::ZERO);
                    gesture.pinch_distance = a.distance(&b);
                    gesture.pinch_midpoint = a.midpoint(&b);
                    self.preview = Some(ViewPreview {
                        pan: gesture.base_pan,
                        pinch: 1.0,
                        focal: gesture.pinch_midpoint - gesture.base_pan,
                    });
                    self.mode = GestureMode::Pinching;
                    self.phase = GesturePhase::Active;
                    tracing::trace!("Gesture became pinch");
                }
            }
            return intents;
        }

        let target = host.resolve_target(position);
        let mut consumed = false;
        self.mode = match (target, host.editing()) {
            (TouchTarget::Menu, _) => GestureMode::Menu,
            (TouchTarget::Field(key), Some(editing)) => {
                if key != editing {
                    intents.push(GestureIntent::CommitEdit);
                }
                consumed = true;
                GestureMode::Editing
            }
            _ => GestureMode::Pressing,
        };
        self.phase = GesturePhase::Began;
        self.preview = None;
        self.gesture = Some(ActiveGesture {
            primary: id,
            pointers: vec![(id, position)],
            origin: position,
            started: at,
            target,
            consumed,
            base_pan: Point::ZERO,
            pinch_distance: 0.0,
            pinch_midpoint: position,
        });
        tracing::trace!("Gesture began on {:?} as {:?}", target, self.mode);
        intents
    }

    fn on_move(
        &mut self,
        id: PointerId,
        position: Point,
        at: Instant,
        host: &dyn GestureHost,
    ) -> Vec<GestureIntent> {
        let mut intents = Vec::new();
        let tap_slop = self.settings.tap_slop_px;
        let Some(gesture) = self.gesture.as_mut() else {
            return intents;
        };
        let Some(slot) = gesture.pointers.iter_mut().find(|(pid, _)| *pid == id) else {
            return intents;
        };
        slot.1 = position;
        if gesture.travel() > tap_slop {
            gesture.consumed = true;
        }

        self.check_long_press(at, host, &mut intents);
        if !intents.is_empty() {
            return intents;
        }

        let Some(gesture) = self.gesture.as_mut() else {
            return intents;
        };
        let is_primary = id == gesture.primary;
        let current = gesture.primary_position();
        match self.mode {
            GestureMode::Pressing | GestureMode::Editing => {
                if gesture.travel() > self.settings.long_press_tolerance_px {
                    self.mode = GestureMode::Panning;
                    self.phase = GesturePhase::Active;
                    self.preview = Some(ViewPreview {
                        pan: current - gesture.origin,
                        pinch: 1.0,
                        focal: gesture.origin,
                    });
                }
            }
            GestureMode::Panning => {
                self.preview = Some(ViewPreview {
                    pan: current - gesture.origin,
                    pinch: 1.0,
                    focal: gesture.origin,
                });
            }
            GestureMode::Pinching => {
                if let Some((a, b)) = gesture.two_finger() {
                    let midpoint = a.midpoint(&b);
                    let distance = a.distance(&b);
                    let pinch = if gesture.pinch_distance > f64::EPSILON && distance.is_finite() {
                        distance / gesture.pinch_distance
                    } else {
                        1.0
                    };
                    self.preview = Some(ViewPreview {
                        pan: gesture.base_pan + (midpoint - gesture.pinch_midpoint),
                        pinch,
                        focal: gesture.pinch_midpoint - gesture.base_pan,
                    });
                }
            }
            GestureMode::DraggingField(key) if is_primary => {
                intents.push(GestureIntent::DragFieldTo { key, touch: position });
            }
            GestureMode::DraggingBatch(_) if is_primary => {
                intents.push(GestureIntent::DragBatchTo { touch: position });
            }
            GestureMode::DrawingMarquee if is_primary => {
                intents.push(GestureIntent::MarqueeTo { point: position });
            }
            _ => {}
        }
        intents
    }

    fn on_up(
        &mut self,
        id: PointerId,
        position: Point,
        at: Instant,
        host: &dyn GestureHost,
    ) -> Vec<GestureIntent> {
        let mut intents = Vec::new();
        let Some(gesture) = self.gesture.as_mut() else {
            return intents;
        };
        if let Some(slot) = gesture.pointers.iter_mut().find(|(pid, _)| *pid == id) {
            slot.1 = position;
        } else {
            return intents;
        }

        // A hold released before the host ticked still counts as a long press.
        if id == gesture.primary {
            self.check_long_press(at, host, &mut intents);
        }

        let Some(gesture) = self.gesture.as_mut() else {
            return intents;
        };
        gesture.pointers.retain(|(pid, _)| *pid != id);
        let finished = if self.mode == GestureMode::Pinching {
            gesture.pointers.is_empty()
        } else {
            id == gesture.primary
        };
        if !finished {
            return intents;
        }

        let consumed = gesture.consumed;
        match self.mode {
            GestureMode::Pressing if !consumed => {
                intents.push(GestureIntent::Tap { point: position });
            }
            GestureMode::Panning | GestureMode::Pinching => {
                if let Some(preview) = self.preview {
                    intents.push(GestureIntent::CommitView {
                        pan: preview.pan,
                        pinch: preview.pinch,
                        focal: preview.focal,
                    });
                }
            }
            GestureMode::DraggingField(key) => {
                intents.push(GestureIntent::EndFieldDrag { key });
            }
            GestureMode::DraggingBatch(_) => intents.push(GestureIntent::EndBatchDrag),
            GestureMode::DrawingMarquee => {
                intents.push(GestureIntent::EndMarquee { point: position });
            }
            _ => {}
        }

        self.reset();
        self.phase = GesturePhase::Ended;
        intents
    }

    fn on_cancel(&mut self, id: PointerId) -> Vec<GestureIntent> {
        let mut intents = Vec::new();
        let Some(gesture) = self.gesture.as_ref() else {
            return intents;
        };
        if gesture.position(id).is_none() {
            return intents;
        }
        match self.mode {
            GestureMode::DraggingField(key) => intents.push(GestureIntent::CancelFieldDrag { key }),
            GestureMode::DraggingBatch(_) => intents.push(GestureIntent::CancelBatchDrag),
            GestureMode::DrawingMarquee => intents.push(GestureIntent::CancelMarquee),
            _ => {}
        }
        tracing::debug!("Gesture cancelled in {:?}", self.mode);
        self.reset();
        self.phase = GesturePhase::Cancelled;
        intents
    }

    fn check_long_press(
        &mut self,
        now: Instant,
        host: &dyn GestureHost,
        intents: &mut Vec<GestureIntent>,
    ) {
        if self.mode != GestureMode::Pressing {
            return;
        }
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        if gesture.pointers.len() != 1
            || now.saturating_duration_since(gesture.started) < self.settings.long_press()
            || gesture.travel() > self.settings.long_press_tolerance_px
        {
            return;
        }

        let touch = gesture.primary_position();
        match gesture.target {
            TouchTarget::Field(key) if host.editing().is_none() => {
                gesture.consumed = true;
                if host.in_multi_selection(key) {
                    self.mode = GestureMode::DraggingBatch(key);
                    intents.push(GestureIntent::ArmBatchDrag { key, origin: touch });
                } else {
                    self.mode = GestureMode::DraggingField(key);
                    intents.push(GestureIntent::ArmFieldDrag { key, origin: touch });
                }
            }
            TouchTarget::Document if host.marquee_mode() => {
                gesture.consumed = true;
                self.mode = GestureMode::DrawingMarquee;
                intents.push(GestureIntent::ArmMarquee {
                    origin: gesture.origin,
                });
            }
            _ => return,
        }
        self.phase = GesturePhase::Active;
        tracing::debug!("Long press armed {:?}", self.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcanvas_core::FieldId;
    use std::time::Duration;

    struct Host {
        target: TouchTarget,
        editing: Option<FieldKey>,
        marquee: bool,
        multi: bool,
    }

    impl Host {
        fn on(target: TouchTarget) -> Self {
            Self {
                target,
                editing: None,
                marquee: false,
                multi: false,
            }
        }
    }

    impl GestureHost for Host {
        fn resolve_target(&self, _point: Point) -> TouchTarget {
            self.target
        }
        fn editing(&self) -> Option<FieldKey> {
            self.editing
        }
        fn marquee_mode(&self) -> bool {
            self.marquee
        }
        fn in_multi_selection(&self, _key: FieldKey) -> bool {
            self.multi
        }
    }

    fn key() -> FieldKey {
        FieldKey::Remote(FieldId(1))
    }

    fn down(at: Instant, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            id: 1,
            position: Point::new(x, y),
            at,
        }
    }

    fn mv(id: PointerId, at: Instant, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            id,
            position: Point::new(x, y),
            at,
        }
    }

    fn up(id: PointerId, at: Instant, x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            id,
            position: Point::new(x, y),
            at,
        }
    }

    #[test]
    fn test_still_press_is_tap() {
        let host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        let intents = arb.handle(up(1, t0 + Duration::from_millis(80), 12.0, 11.0), &host);
        assert_eq!(
            intents,
            vec![GestureIntent::Tap {
                point: Point::new(12.0, 11.0)
            }]
        );
        assert_eq!(arb.mode(), GestureMode::Idle);
    }

    #[test]
    fn test_pan_consumes_tap_and_commits_on_end() {
        let host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        arb.handle(mv(1, t0 + Duration::from_millis(20), 40.0, 10.0), &host);
        assert_eq!(arb.mode(), GestureMode::Panning);
        assert_eq!(arb.view_preview().unwrap().pan, Point::new(30.0, 0.0));

        let intents = arb.handle(up(1, t0 + Duration::from_millis(40), 50.0, 20.0), &host);
        assert_eq!(
            intents,
            vec![GestureIntent::CommitView {
                pan: Point::new(30.0, 0.0),
                pinch: 1.0,
                focal: Point::new(10.0, 10.0),
            }]
        );
    }

    #[test]
    fn test_long_press_arms_field_drag_via_tick() {
        let host = Host::on(TouchTarget::Field(key()));
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        assert!(arb.tick(t0 + Duration::from_millis(300), &host).is_empty());
        let intents = arb.tick(t0 + Duration::from_millis(600), &host);
        assert_eq!(
            intents,
            vec![GestureIntent::ArmFieldDrag {
                key: key(),
                origin: Point::new(10.0, 10.0)
            }]
        );
        let intents = arb.handle(mv(1, t0 + Duration::from_millis(650), 30.0, 10.0), &host);
        assert_eq!(
            intents,
            vec![GestureIntent::DragFieldTo {
                key: key(),
                touch: Point::new(30.0, 10.0)
            }]
        );
        let intents = arb.handle(up(1, t0 + Duration::from_millis(700), 30.0, 10.0), &host);
        assert_eq!(intents, vec![GestureIntent::EndFieldDrag { key: key() }]);
    }

    #[test]
    fn test_movement_aborts_long_press() {
        let host = Host::on(TouchTarget::Field(key()));
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        arb.handle(mv(1, t0 + Duration::from_millis(100), 40.0, 10.0), &host);
        assert!(arb.tick(t0 + Duration::from_millis(600), &host).is_empty());
        assert_eq!(arb.mode(), GestureMode::Panning);
    }

    #[test]
    fn test_multi_selected_field_arms_batch() {
        let mut host = Host::on(TouchTarget::Field(key()));
        host.multi = true;
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        let intents = arb.tick(t0 + Duration::from_millis(560), &host);
        assert!(matches!(intents[0], GestureIntent::ArmBatchDrag { .. }));
        assert_eq!(arb.mode(), GestureMode::DraggingBatch(key()));
    }

    #[test]
    fn test_marquee_requires_mode() {
        let mut host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        assert!(arb.tick(t0 + Duration::from_millis(600), &host).is_empty());
        arb.reset();

        host.marquee = true;
        arb.handle(down(t0, 10.0, 10.0), &host);
        let intents = arb.tick(t0 + Duration::from_millis(600), &host);
        assert_eq!(
            intents,
            vec![GestureIntent::ArmMarquee {
                origin: Point::new(10.0, 10.0)
            }]
        );
        let intents = arb.handle(PointerEvent::Cancel { id: 1, at: t0 }, &host);
        assert_eq!(intents, vec![GestureIntent::CancelMarquee]);
        assert_eq!(arb.phase(), GesturePhase::Cancelled);
    }

    #[test]
    fn test_touch_other_field_while_editing_commits_edit() {
        let mut host = Host::on(TouchTarget::Field(key()));
        host.editing = Some(FieldKey::Remote(FieldId(2)));
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        let intents = arb.handle(down(t0, 10.0, 10.0), &host);
        assert_eq!(intents, vec![GestureIntent::CommitEdit]);
        assert_eq!(arb.mode(), GestureMode::Editing);
        assert!(arb.tick(t0 + Duration::from_millis(700), &host).is_empty());
        assert!(arb.handle(up(1, t0, 10.0, 10.0), &host).is_empty());
    }

    #[test]
    fn test_pinch_preview_and_commit() {
        let host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 100.0, 100.0), &host);
        arb.handle(
            PointerEvent::Down {
                id: 2,
                position: Point::new(200.0, 100.0),
                at: t0,
            },
            &host,
        );
        assert_eq!(arb.mode(), GestureMode::Pinching);
        arb.handle(mv(2, t0, 300.0, 100.0), &host);
        let preview = arb.view_preview().unwrap();
        assert_eq!(preview.pinch, 2.0);
        assert_eq!(preview.focal, Point::new(150.0, 100.0));
        assert_eq!(preview.pan, Point::new(50.0, 0.0));

        assert!(arb.handle(up(1, t0, 100.0, 100.0), &host).is_empty());
        let intents = arb.handle(up(2, t0, 300.0, 100.0), &host);
        assert!(matches!(intents[0], GestureIntent::CommitView { pinch, .. } if pinch == 2.0));
    }

    #[test]
    fn test_rebased_pinch_starts_from_current_spread() {
        let host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 100.0, 100.0), &host);
        arb.handle(
            PointerEvent::Down {
                id: 2,
                position: Point::new(200.0, 100.0),
                at: t0,
            },
            &host,
        );
        arb.handle(mv(2, t0, 300.0, 100.0), &host);
        arb.rebase_view();
        let preview = arb.view_preview().unwrap();
        assert_eq!(preview.pinch, 1.0);
        assert_eq!(preview.pan, Point::ZERO);
        assert_eq!(preview.focal, Point::new(200.0, 100.0));

        // Spreading further only counts from the rebase.
        arb.handle(mv(2, t0, 500.0, 100.0), &host);
        let preview = arb.view_preview().unwrap();
        assert_eq!(preview.pinch, 2.0);
        assert_eq!(preview.pan, Point::new(100.0, 0.0));
    }

    #[test]
    fn test_rebase_outside_view_gesture_is_noop() {
        let host = Host::on(TouchTarget::Document);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        arb.rebase_view();
        assert_eq!(arb.view_preview(), None);

        arb.handle(down(Instant::now(), 10.0, 10.0), &host);
        arb.rebase_view();
        assert_eq!(arb.mode(), GestureMode::Pressing);
        assert_eq!(arb.view_preview(), None);
    }

    #[test]
    fn test_menu_gesture_ignores_camera() {
        let host = Host::on(TouchTarget::Menu);
        let mut arb = GestureArbitrator::new(GestureSettings::default());
        let t0 = Instant::now();
        arb.handle(down(t0, 10.0, 10.0), &host);
        arb.handle(mv(1, t0, 80.0, 10.0), &host);
        assert_eq!(arb.mode(), GestureMode::Menu);
        assert!(arb.handle(up(1, t0, 80.0, 10.0), &host).is_empty());
    }
}
