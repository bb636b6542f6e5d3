//! Gesture arbitration for the shared pointer surface.
//!
//! One surface carries tap, pan, pinch and long-press recognizers. Instead of
//! independent flags, each gesture has exactly one [`GestureMode`], chosen at
//! gesture-begin and cleared at gesture-end. The arbitrator never mutates the
//! model; it emits [`GestureIntent`]s for the session to apply.

mod arbitrator;
mod tap;

pub use arbitrator::{GestureArbitrator, ViewPreview};
pub use tap::{resolve_tap, TapAction, TapContext};

use fieldcanvas_core::FieldKey;
use std::time::Instant;

use crate::canvas::Point;
use crate::hit_test::TouchTarget;

pub type PointerId = u64;

/// Raw pointer input in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        id: PointerId,
        position: Point,
        at: Instant,
    },
    Move {
        id: PointerId,
        position: Point,
        at: Instant,
    },
    Up {
        id: PointerId,
        position: Point,
        at: Instant,
    },
    /// Recognizer failure; the gesture's preview is discarded.
    Cancel { id: PointerId, at: Instant },
}

impl PointerEvent {
    pub fn id(&self) -> PointerId {
        match self {
            PointerEvent::Down { id, .. }
            | PointerEvent::Move { id, .. }
            | PointerEvent::Up { id, .. }
            | PointerEvent::Cancel { id, .. } => *id,
        }
    }

    pub fn at(&self) -> Instant {
        match self {
            PointerEvent::Down { at, .. }
            | PointerEvent::Move { at, .. }
            | PointerEvent::Up { at, .. }
            | PointerEvent::Cancel { at, .. } => *at,
        }
    }
}

/// Recognizer state of one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Began,
    Active,
    Ended,
    Cancelled,
    Failed,
}

/// What the current gesture is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    /// Finger down, not yet a pan, long press or tap.
    Pressing,
    /// Began inside the open menu; camera effects are ignored.
    Menu,
    /// Began on a field while a text edit was active; no drag this gesture.
    Editing,
    Panning,
    Pinching,
    DraggingField(FieldKey),
    DraggingBatch(FieldKey),
    DrawingMarquee,
}

/// Session state the arbitrator consults at gesture-begin and long-press.
pub trait GestureHost {
    fn resolve_target(&self, point: Point) -> TouchTarget;
    /// Field under text edit, if any.
    fn editing(&self) -> Option<FieldKey>;
    fn marquee_mode(&self) -> bool;
    /// Whether `key` belongs to an active multi-selection.
    fn in_multi_selection(&self, key: FieldKey) -> bool;
}

/// A state change requested by a gesture. All points are in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIntent {
    /// Close the active text edit, keeping its changes.
    CommitEdit,
    /// Commit a finished pan/pinch to the camera.
    CommitView {
        pan: Point,
        pinch: f64,
        focal: Point,
    },
    ArmFieldDrag {
        key: FieldKey,
        origin: Point,
    },
    DragFieldTo {
        key: FieldKey,
        touch: Point,
    },
    EndFieldDrag {
        key: FieldKey,
    },
    CancelFieldDrag {
        key: FieldKey,
    },
    ArmBatchDrag {
        key: FieldKey,
        origin: Point,
    },
    DragBatchTo {
        touch: Point,
    },
    EndBatchDrag,
    CancelBatchDrag,
    ArmMarquee {
        origin: Point,
    },
    MarqueeTo {
        point: Point,
    },
    EndMarquee {
        point: Point,
    },
    CancelMarquee,
    /// Unconsumed tap; resolved at the release point.
    Tap {
        point: Point,
    },
}
