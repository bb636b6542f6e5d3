use fieldcanvas_core::{
    AppEvent, Field, FieldEvent, FieldKey, FieldPatch, FieldPayload, LocalId, SelectionEvent,
};
use std::time::Instant;

use super::PlacementSession;

impl PlacementSession {
    /// Restores the model as it was before the last committed change.
    pub fn undo(&mut self, now: Instant) -> bool {
        self.end_text_edit(now);
        self.settle_batch(now);
        let current = self.canvas.snapshot();
        let Some(target) = self.history.undo(current.clone()) else {
            return false;
        };
        tracing::debug!("Undo ({} step(s) left)", self.history.undo_depth());
        self.restore_snapshot(current, target, now);
        true
    }

    /// Re-applies the change the last undo removed.
    pub fn redo(&mut self, now: Instant) -> bool {
        self.end_text_edit(now);
        self.settle_batch(now);
        let current = self.canvas.snapshot();
        let Some(target) = self.history.redo(current.clone()) else {
            return false;
        };
        tracing::debug!("Redo ({} step(s) left)", self.history.redo_depth());
        self.restore_snapshot(current, target, now);
        true
    }

    /// Swaps the live model for `target` and brings the store along: fields
    /// that differ are updated, fields that vanished are deleted, and fields
    /// that came back are created again under a fresh local id.
    fn restore_snapshot(&mut self, current: Vec<Field>, mut target: Vec<Field>, now: Instant) {
        let mut recreated: Vec<(FieldKey, FieldKey)> = Vec::new();
        for field in target.iter_mut() {
            match current.iter().find(|live| live.key == field.key) {
                Some(live) => {
                    let patch = FieldPatch::between(live, field);
                    if !patch.is_empty() {
                        self.sync.schedule_update(field.key, patch, now);
                        self.emit_field_updated(field.key);
                    }
                }
                None => {
                    let local = LocalId::new();
                    let old = field.key;
                    field.key = FieldKey::Local(local);
                    self.sync
                        .create(local, FieldPayload::from_field(local, field));
                    recreated.push((old, field.key));
                }
            }
        }

        for live in &current {
            if !target.iter().any(|f| f.key == live.key) {
                self.sync.delete(live.key);
                self.emit(AppEvent::Field(FieldEvent::Deleted { key: live.key }));
            }
        }

        // Other snapshots still name re-created fields by their old key.
        for (old, new) in &recreated {
            self.history.map_snapshots(|snapshot| {
                for field in snapshot.iter_mut().filter(|f| f.key == *old) {
                    field.key = *new;
                }
            });
        }

        let count = target.len();
        self.canvas.restore(target);
        self.drag = None;
        self.marquee = None;

        let before = self.selection.selected();
        let canvas = &self.canvas;
        self.selection.retain(|key| canvas.contains(key));
        if let Some(menu) = self.menu_key() {
            if !self.canvas.contains(menu) {
                self.close_menu(now);
            }
        }
        self.recapture_batch();

        if self.selection.selected() != before {
            let selected = self.selection.selected();
            if selected.is_empty() {
                self.emit(AppEvent::Selection(SelectionEvent::Cleared));
            } else {
                self.emit(AppEvent::Selection(SelectionEvent::Changed {
                    selected,
                    multi: self.selection.is_multi(),
                }));
            }
        }
        self.emit(AppEvent::Field(FieldEvent::Restored { count }));
    }
}
