//! Focus controller: recenters the camera on a newly selected field.
//!
//! The camera never zooms out on its own. A field already fully visible at a
//! scale close to the target is left alone so small selection changes do not
//! make the view jitter.

use fieldcanvas_core::{Field, FieldId, FieldKey, LocalId};
use fieldcanvas_settings::FocusSettings;
use std::time::Instant;

use crate::canvas::Point;
use crate::debounce::Debouncer;
use crate::viewport::{CameraState, Viewport};

/// Camera a focus pass wants to commit.
pub type CameraTarget = CameraState;

/// Screen area covered by the menu sheet and the on-screen keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Obstruction {
    pub menu_height: f64,
    pub keyboard_height: f64,
    /// Menu and keyboard sit on top of each other rather than overlapping.
    pub stacked: bool,
}

impl Obstruction {
    pub fn height(&self) -> f64 {
        let menu = self.menu_height.max(0.0);
        let keyboard = self.keyboard_height.max(0.0);
        if self.stacked {
            menu + keyboard
        } else {
            menu.max(keyboard)
        }
    }
}

/// Camera that frames `field` above the obstruction, or `None` to leave the
/// view as it is.
pub fn compute_focus(
    field: &Field,
    viewport: &Viewport,
    obstruction: Obstruction,
    settings: &FocusSettings,
) -> Option<CameraTarget> {
    let view = viewport.viewport_size();
    let band = view.height - obstruction.height();
    if band <= 0.0 || view.width <= 0.0 {
        return None;
    }

    let rect = viewport.image_rect_for_field(field);
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }

    let fraction = if field.width / 100.0 > settings.wide_field_threshold {
        settings.wide_field_fraction
    } else {
        settings.width_fraction
    };
    let fit = (fraction * view.width / rect.width)
        .min(settings.max_height_fraction * band / rect.height);
    if !fit.is_finite() {
        return None;
    }

    let (min_scale, max_scale) = viewport.scale_limits();
    let current = viewport.scale();
    let target = current.max(fit.clamp(min_scale, max_scale));

    let on_screen = viewport.screen_rect_for_field(field);
    let visible = on_screen.x >= 0.0
        && on_screen.y >= 0.0
        && on_screen.right() <= view.width
        && on_screen.bottom() <= band;
    // Skip delta is a fraction of the current scale.
    if visible && (target - current).abs() <= settings.skip_delta * current {
        tracing::trace!("Field {} already in view, skipping focus", field.key);
        return None;
    }

    let anchor = Point::new(view.width / 2.0, band * settings.anchor_fraction);
    let camera = viewport.camera_placing(rect.center(), anchor, target);
    camera.is_finite().then_some(camera)
}

/// Why a focus pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusReason {
    SelectionChanged,
    FieldCreated,
    MenuToggled,
    SubmenuChanged,
    KeyboardChanged,
    ViewportResized,
}

/// Debounces focus requests so bursts of triggers produce one camera move.
#[derive(Debug, Clone)]
pub struct FocusScheduler {
    timer: Debouncer<()>,
    target: Option<FieldKey>,
    reason: Option<FocusReason>,
}

impl FocusScheduler {
    pub fn new(settings: &FocusSettings) -> Self {
        Self {
            timer: Debouncer::new(settings.debounce()),
            target: None,
            reason: None,
        }
    }

    /// Requests a focus pass on `key`, restarting the debounce window.
    pub fn request(&mut self, key: FieldKey, reason: FocusReason, now: Instant) {
        self.target = Some(key);
        self.reason = Some(reason);
        self.timer.schedule((), now);
    }

    pub fn cancel(&mut self) {
        self.timer.cancel(&());
        self.target = None;
        self.reason = None;
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending(&())
    }

    /// When the pending request becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.next_deadline()
    }

    /// The request whose debounce window has closed, if any.
    pub fn due(&mut self, now: Instant) -> Option<(FieldKey, FocusReason)> {
        if self.timer.due(now).is_empty() {
            return None;
        }
        let target = self.target.take()?;
        let reason = self.reason.take()?;
        Some((target, reason))
    }

    pub fn rekey(&mut self, local: LocalId, id: FieldId) {
        if self.target == Some(FieldKey::Local(local)) {
            self.target = Some(FieldKey::Remote(id));
        }
    }
}
