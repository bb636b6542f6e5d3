//! # FieldCanvas Designer
//!
//! Interactive placement of form fields over a page image. This crate owns
//! everything between raw pointer input and the persistence backend.
//!
//! ## Core Components
//!
//! - **Viewport**: camera transform between screen, image and percent space
//! - **Gestures**: one arbitrator deciding whether a pointer sequence is a
//!   tap, a pan/pinch, a field drag, a batch drag or a marquee
//! - **Drag/Resize**: preview-then-commit moves and handle resizes
//! - **Selection**: single and multi selection, marquee, row/column/group
//! - **Batch**: cluster-aware spacing and size adjustments for a selection
//! - **Focus**: debounced camera moves that keep the active field visible
//!   above the keyboard and menu sheet
//! - **Sync**: debounced, ordered writes with create-before-patch replay
//! - **History**: snapshot undo/redo
//!
//! ## Architecture
//!
//! ```text
//! PlacementSession
//!   ├── GestureArbitrator ── HitTest
//!   ├── Viewport / FocusScheduler
//!   ├── Canvas ── Selection / Batch / Drag
//!   ├── UndoRedoManager
//!   └── SyncEngine ── FieldBackend
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldcanvas_designer::{PlacementSession, Size};
//!
//! let mut session = PlacementSession::load(backend, template, config, viewport, image).await?;
//! session.pointer(event);
//! session.tick(Instant::now());
//! session.force_save().await?;
//! ```

pub mod batch;
pub mod canvas;
pub mod debounce;
pub mod drag;
pub mod focus;
pub mod geometry;
pub mod gestures;
pub mod history;
pub mod selection_manager;
pub mod session;
pub mod sync;
pub mod viewport;

pub use batch::{BatchAdjust, BatchSnapshot, Cluster};
pub use canvas::{Canvas, ImageSize, Point, Rect, Size};
pub use debounce::Debouncer;
pub use drag::{ApproxTextMeasurer, DragSession, ResizeHandle, TextMeasurer};
pub use focus::{compute_focus, FocusReason, FocusScheduler, Obstruction};
pub use gestures::{
    GestureArbitrator, GestureHost, GestureIntent, GestureMode, PointerEvent, PointerId,
    ViewPreview,
};
pub use hit_test::TouchTarget;
pub use history::UndoRedoManager;
pub use selection_manager::{Selection, SelectionManager};
pub use session::PlacementSession;
pub use sync::{FlushReport, SyncEngine, SyncOutcome};
pub use viewport::{CameraState, Viewport};
