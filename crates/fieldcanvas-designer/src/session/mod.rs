//! Placement session: the state every canvas interaction flows through.
//!
//! This module is split into submodules:
//! - `pointer`: gesture intents and tap dispatch
//! - `mutations`: create, duplicate, delete, patch, resize, text edit, batch
//! - `history`: undo/redo over whole-model snapshots
//! - `view`: camera, menu, keyboard and page state
//! - `save`: sync outcomes and finalize
//!
//! The field collection and the camera are only ever written from here.

mod history;
mod mutations;
mod pointer;
mod save;
mod view;

use fieldcanvas_core::{
    AppEvent, CalibrationRect, EventBus, Field, FieldBackend, FieldId, FieldKey, LocalId,
    TemplateId, TemplateRecord, ViewEvent,
};
use fieldcanvas_settings::CanvasConfig;
use std::sync::Arc;
use std::time::Instant;

use crate::batch::{BatchAdjust, BatchSnapshot};
use crate::canvas::{Canvas, Point, Rect, Size};
use crate::drag::{ApproxTextMeasurer, DragSession, TextMeasurer};
use crate::focus::{compute_focus, FocusReason, FocusScheduler, Obstruction};
use crate::gestures::{GestureArbitrator, GestureHost, GestureMode, PointerEvent};
use crate::hit_test::{resolve_target, HitContext, TouchTarget};
use crate::history::UndoRedoManager;
use crate::selection_manager::SelectionManager;
use crate::sync::SyncEngine;
use crate::viewport::{CameraState, Viewport};

/// Context menu attached to a field.
#[derive(Debug, Clone)]
struct MenuState {
    key: FieldKey,
    /// Measured rectangle in screen space, once laid out.
    rect: Option<Rect>,
    submenu: Option<String>,
}

/// Open text edit. Every change made during it is one undo step.
#[derive(Debug, Clone)]
struct EditState {
    key: FieldKey,
    before: Vec<Field>,
}

/// Marquee corners in image space.
#[derive(Debug, Clone, Copy)]
struct MarqueeState {
    origin: Point,
    current: Point,
}

#[derive(Debug, Clone)]
struct BatchState {
    snapshot: BatchSnapshot,
    adjust: BatchAdjust,
    /// Model at capture time, diffed against on commit.
    before: Vec<Field>,
}

fn rekey_fields(fields: &mut [Field], local: LocalId, id: FieldId) {
    let from = FieldKey::Local(local);
    for field in fields.iter_mut().filter(|f| f.key == from) {
        field.key = FieldKey::Remote(id);
    }
}

/// What the arbitrator sees of the session.
struct SessionHost<'a> {
    hit: HitContext<'a>,
    editing: Option<FieldKey>,
    marquee_mode: bool,
    selection: &'a SelectionManager,
}

impl GestureHost for SessionHost<'_> {
    fn resolve_target(&self, point: Point) -> TouchTarget {
        resolve_target(point, &self.hit)
    }

    fn editing(&self) -> Option<FieldKey> {
        self.editing
    }

    fn marquee_mode(&self) -> bool {
        self.marquee_mode
    }

    fn in_multi_selection(&self, key: FieldKey) -> bool {
        self.selection.is_multi() && self.selection.is_selected(key)
    }
}

/// One template open on the placement canvas.
pub struct PlacementSession {
    config: CanvasConfig,
    template: TemplateId,
    backend: Arc<dyn FieldBackend>,
    canvas: Canvas,
    viewport: Viewport,
    selection: SelectionManager,
    gestures: GestureArbitrator,
    drag: Option<DragSession>,
    marquee: Option<MarqueeState>,
    batch: Option<BatchState>,
    focus: FocusScheduler,
    obstruction: Obstruction,
    menu: Option<MenuState>,
    editing: Option<EditState>,
    marquee_mode: bool,
    history: UndoRedoManager<Vec<Field>>,
    sync: SyncEngine,
    events: Arc<EventBus>,
    last_delete: Option<Instant>,
    measurer: Box<dyn TextMeasurer>,
    calibration: Option<CalibrationRect>,
}

impl std::fmt::Debug for PlacementSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementSession")
            .field("template", &self.template)
            .field("fields", &self.canvas.len())
            .field("page", &self.canvas.page())
            .field("mode", &self.gestures.mode())
            .field("sync", &self.sync)
            .finish()
    }
}

impl PlacementSession {
    /// Opens an already fetched template.
    pub fn new(
        backend: Arc<dyn FieldBackend>,
        template: TemplateId,
        record: TemplateRecord,
        config: CanvasConfig,
        viewport_size: Size,
        image_size: Size,
    ) -> Self {
        let viewport = Viewport::with_zoom(viewport_size, image_size, &config.zoom);
        let sync = SyncEngine::new(Arc::clone(&backend), template, &config.persistence);
        tracing::info!(
            "Opened template {} with {} field(s) on {} page(s)",
            template,
            record.fields.len(),
            record.page_count.max(1)
        );
        Self {
            gestures: GestureArbitrator::new(config.gestures.clone()),
            focus: FocusScheduler::new(&config.focus),
            history: UndoRedoManager::new(config.persistence.undo_depth),
            canvas: Canvas::from_template(record),
            selection: SelectionManager::new(),
            drag: None,
            marquee: None,
            batch: None,
            obstruction: Obstruction::default(),
            menu: None,
            editing: None,
            marquee_mode: false,
            events: Arc::new(EventBus::new()),
            last_delete: None,
            measurer: Box::new(ApproxTextMeasurer::default()),
            calibration: None,
            config,
            template,
            backend,
            viewport,
            sync,
        }
    }

    /// Fetches the template and the first page's calibration, then opens it.
    pub async fn load(
        backend: Arc<dyn FieldBackend>,
        template: TemplateId,
        config: CanvasConfig,
        viewport_size: Size,
        image_size: Size,
    ) -> fieldcanvas_core::Result<Self> {
        let record = backend.get_template(template).await?;
        let mut session = Self::new(backend, template, record, config, viewport_size, image_size);
        session.calibration = match session.backend.get_calibration(template, 0).await {
            Ok(rect) => rect,
            Err(err) => {
                tracing::warn!("No calibration for template {}: {}", template, err);
                None
            }
        };
        Ok(session)
    }

    /// Publishes session events on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    /// Feeds one pointer event through gesture arbitration.
    pub fn pointer(&mut self, event: PointerEvent) {
        let now = event.at();
        let selected = self.selection.selected();
        let host = SessionHost {
            hit: HitContext {
                canvas: &self.canvas,
                viewport: &self.viewport,
                menu_rect: self.menu.as_ref().and_then(|m| m.rect),
                selected: &selected,
                hit_slop_px: self.config.gestures.hit_slop_px,
            },
            editing: self.editing.as_ref().map(|e| e.key),
            marquee_mode: self.marquee_mode,
            selection: &self.selection,
        };
        let intents = self.gestures.handle(event, &host);
        for intent in intents {
            self.apply_intent(intent, now);
        }
    }

    /// Advances timers: long-press arming, focus, and debounced writes.
    pub fn tick(&mut self, now: Instant) {
        let selected = self.selection.selected();
        let host = SessionHost {
            hit: HitContext {
                canvas: &self.canvas,
                viewport: &self.viewport,
                menu_rect: self.menu.as_ref().and_then(|m| m.rect),
                selected: &selected,
                hit_slop_px: self.config.gestures.hit_slop_px,
            },
            editing: self.editing.as_ref().map(|e| e.key),
            marquee_mode: self.marquee_mode,
            selection: &self.selection,
        };
        let intents = self.gestures.tick(now, &host);
        for intent in intents {
            self.apply_intent(intent, now);
        }

        self.run_focus(now);

        let outcomes = self.sync.poll(now);
        self.apply_outcomes(outcomes);
    }

    /// Earliest instant at which [`tick`] has work: a focus pass or a
    /// debounced write.
    ///
    /// [`tick`]: PlacementSession::tick
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.focus.next_deadline(), self.sync.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn run_focus(&mut self, now: Instant) {
        let Some((key, reason)) = self.focus.due(now) else {
            return;
        };
        if self.gestures.is_active() {
            // Never move the camera under a finger.
            self.focus.request(key, reason, now);
            return;
        }
        let Some(field) = self.canvas.get(key) else {
            return;
        };
        let Some(camera) = compute_focus(field, &self.viewport, self.obstruction, &self.config.focus)
        else {
            return;
        };
        if self.viewport.set_camera(camera) {
            tracing::debug!("Focused {} ({:?})", key, reason);
            self.emit_camera();
        }
    }

    fn request_focus(&mut self, key: FieldKey, reason: FocusReason, now: Instant) {
        if self.config.focus.enabled {
            self.focus.request(key, reason, now);
        }
    }

    fn emit(&self, event: AppEvent) {
        self.events.emit(event);
    }

    fn emit_camera(&self) {
        let camera = self.viewport.camera();
        self.emit(AppEvent::View(ViewEvent::CameraChanged {
            scale: camera.scale,
            translate_x: camera.translate_x,
            translate_y: camera.translate_y,
        }));
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn mode(&self) -> GestureMode {
        self.gestures.mode()
    }

    pub fn calibration(&self) -> Option<CalibrationRect> {
        self.calibration
    }

    pub fn menu_key(&self) -> Option<FieldKey> {
        self.menu.as_ref().map(|m| m.key)
    }

    pub fn submenu(&self) -> Option<&str> {
        self.menu.as_ref().and_then(|m| m.submenu.as_deref())
    }

    pub fn editing_key(&self) -> Option<FieldKey> {
        self.editing.as_ref().map(|e| e.key)
    }

    pub fn marquee_mode(&self) -> bool {
        self.marquee_mode
    }

    pub fn obstruction(&self) -> Obstruction {
        self.obstruction
    }

    pub fn batch_adjust(&self) -> Option<BatchAdjust> {
        self.batch.as_ref().map(|b| b.adjust)
    }

    pub fn batch_snapshot(&self) -> Option<&BatchSnapshot> {
        self.batch.as_ref().map(|b| &b.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drag preview positions, `(x %, y %)` per dragged field.
    pub fn drag_preview(&self) -> Vec<(FieldKey, Point)> {
        self.drag
            .as_ref()
            .map(|drag| drag.previews().collect())
            .unwrap_or_default()
    }

    /// A field as it should be drawn, with any drag preview applied.
    pub fn display_field(&self, key: FieldKey) -> Option<Field> {
        let mut field = self.canvas.get(key)?.clone();
        if let Some(preview) = self.drag.as_ref().and_then(|d| d.preview_position(key)) {
            field.x = preview.x;
            field.y = preview.y;
        }
        Some(field)
    }

    /// Marquee being drawn, in percent space.
    pub fn marquee_rect(&self) -> Option<Rect> {
        let marquee = self.marquee?;
        Some(Rect::from_corners(
            self.viewport.percent_from_image(marquee.origin),
            self.viewport.percent_from_image(marquee.current),
        ))
    }

    /// Camera including an unfinished pan/pinch, for rendering.
    pub fn display_camera(&self) -> CameraState {
        match self.gestures.view_preview() {
            Some(preview) => {
                self.viewport
                    .camera_for_gesture(preview.pan, preview.pinch, preview.focal)
            }
            None => self.viewport.camera(),
        }
    }
}
