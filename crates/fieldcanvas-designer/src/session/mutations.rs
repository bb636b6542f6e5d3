use fieldcanvas_core::{
    AppEvent, Error, ErrorEvent, Field, FieldEvent, FieldKey, FieldPatch, FieldPayload, FieldType,
    SelectionEvent, SyncError, ValidationError, ViewEvent,
};
use std::time::Instant;

use super::{BatchState, EditState, PlacementSession};
use crate::batch::{BatchAdjust, BatchSnapshot};
use crate::canvas::Point;
use crate::drag::{auto_size, resize_to, ResizeHandle};
use crate::focus::FocusReason;
use crate::geometry::{default_field_at, duplicate_of, normalize, validate};
use crate::selection_manager;

impl PlacementSession {
    /// Creates a field centered on a percent-space point and selects it.
    pub fn create_field_at(&mut self, point: Point, field_type: FieldType, now: Instant) -> FieldKey {
        let field = default_field_at(
            point,
            self.canvas.page(),
            field_type,
            &self.config.field_defaults,
            self.viewport.fitted_size(),
        );
        let key = self.insert_new(field, now);
        self.emit(AppEvent::Field(FieldEvent::Created { key }));
        self.request_focus(key, FocusReason::FieldCreated, now);
        key
    }

    /// Copies a field with a fixed pixel offset. Returns the copy's key.
    pub fn duplicate_field(&mut self, source: FieldKey, now: Instant) -> Option<FieldKey> {
        let original = self.canvas.get(source)?;
        let copy = duplicate_of(
            original,
            self.config.field_defaults.duplicate_offset_px,
            self.viewport.fitted_size(),
        );
        let key = self.insert_new(copy, now);
        self.emit(AppEvent::Field(FieldEvent::Duplicated { source, key }));
        self.request_focus(key, FocusReason::FieldCreated, now);
        Some(key)
    }

    /// Adds a local field, issues its create and selects it.
    fn insert_new(&mut self, field: Field, now: Instant) -> FieldKey {
        let key = field.key;
        let before = self.canvas.snapshot();
        if let Some(local) = key.local_id() {
            self.sync.create(local, FieldPayload::from_field(local, &field));
        }
        self.canvas.insert(field);
        self.checkpoint(before);
        tracing::debug!("Created {}", key);
        self.select(key, now);
        key
    }

    /// Removes a field locally and, once it has an id, remotely.
    pub fn delete_field(&mut self, key: FieldKey, now: Instant) -> bool {
        if !self.canvas.contains(key) {
            return false;
        }
        if self.editing_key() == Some(key) {
            self.end_text_edit(now);
        }
        if self.batch.as_ref().is_some_and(|b| b.snapshot.contains(key)) {
            self.settle_batch(now);
        }

        let before = self.canvas.snapshot();
        self.canvas.remove(key);
        self.checkpoint(before);
        self.sync.delete(key);
        self.last_delete = Some(now);
        tracing::debug!("Deleted {}", key);
        self.emit(AppEvent::Field(FieldEvent::Deleted { key }));

        if self.drag.as_ref().is_some_and(|d| d.contains(key)) {
            self.drag = None;
        }
        if self.selection.is_selected(key) {
            self.selection.remove(key);
            self.selection_changed(now);
        } else if self.menu_key() == Some(key) {
            self.close_menu(now);
        }
        true
    }

    /// Applies a partial edit from a form or menu.
    ///
    /// The result is normalized and validated before anything is written;
    /// a rejected patch leaves the model untouched.
    pub fn apply_patch_intent(
        &mut self,
        key: FieldKey,
        patch: FieldPatch,
        now: Instant,
    ) -> Result<(), Error> {
        let Some(current) = self.canvas.get(key) else {
            return Err(SyncError::UnknownField { key }.into());
        };
        if !patch.is_finite() {
            tracing::warn!("Rejecting non-finite patch for {}", key);
            return Err(ValidationError::InvalidGeometry {
                key,
                reason: "non-finite value".to_string(),
            }
            .into());
        }

        let mut next = current.clone();
        patch.apply_to(&mut next);
        normalize(
            &mut next,
            self.viewport.fitted_size(),
            &self.config.field_defaults,
        );
        if let Err(err) = validate(&next) {
            self.emit(AppEvent::Error(ErrorEvent::ValidationFailed {
                key,
                message: err.to_string(),
            }));
            return Err(err.into());
        }
        if next == *current {
            return Ok(());
        }

        let in_batch = self.batch.as_ref().is_some_and(|b| b.snapshot.contains(key));
        if in_batch {
            self.settle_batch(now);
        }

        let before = self.canvas.snapshot();
        let Some(previous) = self.canvas.replace(next.clone()) else {
            return Err(SyncError::UnknownField { key }.into());
        };
        self.checkpoint(before);
        self.sync
            .schedule_update(key, FieldPatch::between(&previous, &next), now);
        self.emit_field_updated(key);

        if in_batch {
            self.recapture_batch();
        }
        Ok(())
    }

    /// Resizes by a screen-space handle delta.
    pub fn resize_field(
        &mut self,
        key: FieldKey,
        handle: ResizeHandle,
        delta: Point,
        now: Instant,
    ) -> Result<(), Error> {
        let Some(field) = self.canvas.get(key) else {
            return Err(SyncError::UnknownField { key }.into());
        };
        let (width, height) = resize_to(
            field,
            handle,
            delta,
            &self.viewport,
            &self.config.field_defaults,
        );
        self.apply_patch_intent(key, FieldPatch::size(width, height), now)
    }

    /// Fits a text field to its content. Returns true when its size changed.
    pub fn auto_size_field(&mut self, key: FieldKey, now: Instant) -> bool {
        let Some(field) = self.canvas.get(key) else {
            return false;
        };
        let measured = self.measurer.measure(
            &field.text,
            &field.font_family,
            field.font_size,
            field.line_height,
        );
        let Some((width, height)) = auto_size(
            field,
            measured,
            self.viewport.fitted_size(),
            &self.config.field_defaults,
        ) else {
            return false;
        };
        self.apply_patch_intent(key, FieldPatch::size(width, height), now)
            .is_ok()
    }

    /// Starts a text edit. Changes until [`end_text_edit`] undo as one step.
    ///
    /// [`end_text_edit`]: PlacementSession::end_text_edit
    pub fn begin_text_edit(&mut self, key: FieldKey, now: Instant) -> bool {
        if !self.canvas.contains(key) {
            return false;
        }
        if self.editing_key() == Some(key) {
            return true;
        }
        self.end_text_edit(now);
        self.editing = Some(EditState {
            key,
            before: self.canvas.snapshot(),
        });
        self.emit(AppEvent::View(ViewEvent::EditingChanged { key: Some(key) }));
        if self.selection.single() != Some(key) {
            self.select(key, now);
        }
        true
    }

    /// Replaces a field's text and fits the field to it.
    pub fn set_text(&mut self, key: FieldKey, text: &str, now: Instant) -> Result<(), Error> {
        let patch = FieldPatch {
            text: Some(text.to_string()),
            ..FieldPatch::default()
        };
        self.apply_patch_intent(key, patch, now)?;
        self.auto_size_field(key, now);
        Ok(())
    }

    /// Closes the text edit, keeping its changes.
    pub fn end_text_edit(&mut self, _now: Instant) -> bool {
        let Some(edit) = self.editing.take() else {
            return false;
        };
        if edit.before != self.canvas.fields() {
            self.history.record(edit.before);
        }
        tracing::debug!("Ended text edit of {}", edit.key);
        self.emit(AppEvent::View(ViewEvent::EditingChanged { key: None }));
        true
    }

    /// Previews slider values against the frozen batch snapshot.
    ///
    /// Nothing is persisted until [`commit_batch`] or the selection changes.
    ///
    /// [`commit_batch`]: PlacementSession::commit_batch
    pub fn set_batch_adjust(&mut self, adjust: BatchAdjust) -> bool {
        if !adjust.is_finite() {
            tracing::warn!("Discarding non-finite batch adjustment");
            return false;
        }
        let Some(state) = self.batch.as_mut() else {
            return false;
        };
        state.adjust = adjust;

        let image = self.viewport.fitted_size();
        for (key, patch) in state.snapshot.apply(&adjust) {
            if let Some(field) = self.canvas.get_mut(key) {
                patch.apply_to(field);
                normalize(field, image, &self.config.field_defaults);
            }
        }
        true
    }

    /// Persists the previewed batch adjustment and takes a fresh baseline.
    /// Returns the number of fields written.
    pub fn commit_batch(&mut self, now: Instant) -> usize {
        let written = self.settle_batch(now);
        if self.batch.is_none() {
            self.recapture_batch();
        }
        written
    }

    /// Schedules saves for every field the batch preview moved.
    pub(super) fn settle_batch(&mut self, now: Instant) -> usize {
        if !self.batch.as_ref().is_some_and(|b| !b.adjust.is_baseline()) {
            return 0;
        }
        let Some(state) = self.batch.take() else {
            return 0;
        };

        let mut written = 0;
        for key in state.snapshot.keys() {
            let (Some(old), Some(new)) = (
                state.before.iter().find(|f| f.key == key),
                self.canvas.get(key),
            ) else {
                continue;
            };
            let patch = FieldPatch::between(old, new);
            if patch.is_empty() {
                continue;
            }
            self.sync.schedule_update(key, patch, now);
            self.emit_field_updated(key);
            written += 1;
        }
        if written > 0 {
            self.checkpoint(state.before);
        }
        tracing::debug!("Committed batch adjustment of {} field(s)", written);
        written
    }

    /// Freezes a new baseline for a selection of two or more fields.
    pub(super) fn recapture_batch(&mut self) {
        self.batch = None;
        if !self.selection.is_multi() || self.selection.len() < 2 {
            return;
        }
        let keys = self.selection.selected();
        let fields = keys.iter().filter_map(|k| self.canvas.get(*k));
        if let Some(snapshot) = BatchSnapshot::capture(fields, self.viewport.fitted_size()) {
            tracing::debug!(
                "Batch snapshot: {} field(s), {} row(s), {} column(s)",
                snapshot.len(),
                snapshot.rows().len(),
                snapshot.columns().len()
            );
            self.batch = Some(BatchState {
                snapshot,
                adjust: BatchAdjust::default(),
                before: self.canvas.snapshot(),
            });
        }
    }

    pub fn select(&mut self, key: FieldKey, now: Instant) {
        if !self.canvas.contains(key) {
            return;
        }
        self.selection.select(key);
        self.selection_changed(now);
    }

    pub fn clear_selection(&mut self, now: Instant) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.selection_changed(now);
    }

    /// Multi-selects the page fields in the reference field's row.
    pub fn select_row(&mut self, reference: FieldKey, now: Instant) -> usize {
        let Some(field) = self.canvas.get(reference) else {
            return 0;
        };
        let keys = selection_manager::select_row(
            self.canvas.page_fields(),
            field,
            self.config.selection.row_tolerance_percent,
        );
        self.enter_multi(keys, now)
    }

    /// Multi-selects the page fields in the reference field's column.
    pub fn select_column(&mut self, reference: FieldKey, now: Instant) -> usize {
        let Some(field) = self.canvas.get(reference) else {
            return 0;
        };
        let keys = selection_manager::select_column(
            self.canvas.page_fields(),
            field,
            self.config.selection.column_tolerance_percent,
        );
        self.enter_multi(keys, now)
    }

    /// Multi-selects every field sharing the reference field's group.
    pub fn select_group(&mut self, reference: FieldKey, now: Instant) -> usize {
        let Some(field) = self.canvas.get(reference) else {
            return 0;
        };
        let keys = selection_manager::select_group(self.canvas.page_fields(), field);
        self.enter_multi(keys, now)
    }

    fn enter_multi(&mut self, keys: Vec<FieldKey>, now: Instant) -> usize {
        let count = keys.len();
        self.selection.enter_multi(keys);
        self.selection_changed(now);
        count
    }

    pub fn set_marquee_mode(&mut self, enabled: bool) {
        if self.marquee_mode == enabled {
            return;
        }
        self.marquee_mode = enabled;
        self.emit(AppEvent::View(ViewEvent::MarqueeModeChanged { enabled }));
    }

    /// Follow-up work after any selection change.
    pub(super) fn selection_changed(&mut self, now: Instant) {
        self.settle_batch(now);
        self.recapture_batch();

        let selected = self.selection.selected();
        if selected.is_empty() {
            self.focus.cancel();
            self.emit(AppEvent::Selection(SelectionEvent::Cleared));
        } else {
            self.emit(AppEvent::Selection(SelectionEvent::Changed {
                selected,
                multi: self.selection.is_multi(),
            }));
        }

        if let Some(key) = self.selection.single() {
            self.request_focus(key, FocusReason::SelectionChanged, now);
        }
        if let Some(menu) = self.menu_key() {
            if !self.selection.is_selected(menu) {
                self.close_menu(now);
            }
        }
    }

    /// Records `before` as an undo step unless a text edit is grouping
    /// changes.
    pub(super) fn checkpoint(&mut self, before: Vec<Field>) {
        if self.editing.is_none() {
            self.history.record(before);
        }
    }

    pub(super) fn emit_field_updated(&self, key: FieldKey) {
        self.emit(AppEvent::Field(FieldEvent::Updated { key }));
    }
}
