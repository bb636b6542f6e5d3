use fieldcanvas_core::{AppEvent, Error, ErrorEvent, FieldKey, SelectionEvent, ViewEvent};
use std::time::Instant;

use super::{MenuState, PlacementSession};
use crate::canvas::{Rect, Size};
use crate::focus::FocusReason;

impl PlacementSession {
    pub fn zoom_in(&mut self) -> bool {
        let changed = self.viewport.zoom_in();
        self.camera_moved(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.viewport.zoom_out();
        self.camera_moved(changed)
    }

    pub fn reset_zoom(&mut self) -> bool {
        let changed = self.viewport.reset();
        self.camera_moved(changed)
    }

    fn camera_moved(&mut self, changed: bool) -> bool {
        if changed {
            self.focus.cancel();
            self.gestures.rebase_view();
            self.emit_camera();
        }
        changed
    }

    /// Opens the context menu of a field.
    pub fn open_menu(&mut self, key: FieldKey, now: Instant) {
        if !self.canvas.contains(key) {
            return;
        }
        self.menu = Some(MenuState {
            key,
            rect: None,
            submenu: None,
        });
        self.emit(AppEvent::View(ViewEvent::MenuOpened { key }));
        self.request_focus(key, FocusReason::MenuToggled, now);
    }

    pub fn close_menu(&mut self, now: Instant) {
        if self.menu.take().is_none() {
            return;
        }
        self.obstruction.menu_height = 0.0;
        self.emit(AppEvent::View(ViewEvent::MenuClosed));
        if let Some(key) = self.selection.single() {
            self.request_focus(key, FocusReason::MenuToggled, now);
        }
    }

    /// Records where the menu was laid out, for touch target resolution.
    pub fn set_menu_rect(&mut self, rect: Option<Rect>) {
        if let Some(menu) = self.menu.as_mut() {
            menu.rect = rect.filter(|r| r.width > 0.0 && r.height > 0.0);
        }
    }

    /// The menu switched submenu; `sheet_height` is how much of the
    /// viewport bottom it now covers.
    pub fn submenu_changed(&mut self, name: Option<String>, sheet_height: f64, now: Instant) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        menu.submenu = name.clone();
        let key = menu.key;
        self.obstruction.menu_height = if sheet_height.is_finite() {
            sheet_height.max(0.0)
        } else {
            0.0
        };
        self.emit(AppEvent::View(ViewEvent::SubmenuChanged { name, sheet_height }));
        self.request_focus(key, FocusReason::SubmenuChanged, now);
    }

    /// The on-screen keyboard appeared, resized or went away (`height` 0).
    pub fn keyboard_changed(&mut self, height: f64, stacked: bool, now: Instant) {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        if self.obstruction.keyboard_height == height && self.obstruction.stacked == stacked {
            return;
        }
        self.obstruction.keyboard_height = height;
        self.obstruction.stacked = stacked;
        self.emit(AppEvent::View(ViewEvent::KeyboardChanged { height }));
        if let Some(key) = self.editing_key().or(self.selection.single()) {
            self.request_focus(key, FocusReason::KeyboardChanged, now);
        }
    }

    pub fn viewport_resized(&mut self, size: Size, now: Instant) {
        if size.is_empty() {
            return;
        }
        self.viewport.set_viewport_size(size);
        if let Some(key) = self.selection.single() {
            self.request_focus(key, FocusReason::ViewportResized, now);
        }
    }

    /// Natural pixel size of the page image, once decoded.
    pub fn set_image_size(&mut self, natural: Size) {
        if natural.is_empty() {
            return;
        }
        self.viewport.set_image_size(natural);
    }

    /// Switches to another page and fetches its calibration.
    ///
    /// Open edits and batch adjustments are committed first; selection,
    /// menu and gestures do not carry over.
    pub async fn change_page(&mut self, page: u32) -> Result<(), Error> {
        let now = Instant::now();
        if page == self.canvas.page() {
            return Ok(());
        }
        if page >= self.canvas.page_count() {
            return Err(Error::other(format!(
                "Page {} out of range ({} page(s))",
                page + 1,
                self.canvas.page_count()
            )));
        }

        self.end_text_edit(now);
        self.commit_batch(now);
        self.gestures.reset();
        self.drag = None;
        self.marquee = None;
        self.close_menu(now);
        self.focus.cancel();
        if !self.selection.is_empty() {
            self.selection.clear();
            self.batch = None;
            self.emit(AppEvent::Selection(SelectionEvent::Cleared));
        }

        self.canvas.set_page(page);
        self.calibration = match self.backend.get_calibration(self.template, page).await {
            Ok(rect) => rect,
            Err(err) => {
                tracing::warn!("Calibration for page {} unavailable: {}", page + 1, err);
                self.emit(AppEvent::Error(ErrorEvent::Notice {
                    message: format!("Could not load calibration: {}", err),
                }));
                None
            }
        };
        tracing::info!("Switched to page {}", page + 1);
        self.emit(AppEvent::View(ViewEvent::PageChanged { page }));
        Ok(())
    }
}
