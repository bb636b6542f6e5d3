use fieldcanvas_core::{
    AppEvent, ErrorEvent, FieldEvent, FieldId, FieldKey, LocalId, PersistenceEvent, SyncError,
};
use std::time::Instant;

use super::{rekey_fields, PlacementSession};
use crate::sync::SyncOutcome;

impl PlacementSession {
    /// Finalize: drains every pending write and waits for everything in
    /// flight.
    ///
    /// On failure the canvas stays as it is, still editable; nothing is
    /// rolled back.
    pub async fn force_save(&mut self) -> Result<(), SyncError> {
        let now = Instant::now();
        self.end_text_edit(now);
        self.commit_batch(now);

        let outstanding =
            self.sync.pending_updates() + self.sync.in_flight() + self.sync.failed_count();
        tracing::info!("Finalizing {} outstanding write(s)", outstanding);
        self.emit(AppEvent::Persistence(PersistenceEvent::FinalizeStarted {
            outstanding,
        }));

        let timeout = self.sync.create_timeout();
        let report = self.sync.flush(timeout).await;
        self.apply_outcomes(report.outcomes);

        match report.result {
            Ok(()) => {
                tracing::info!("All changes saved");
                self.emit(AppEvent::Persistence(PersistenceEvent::FinalizeCompleted));
                Ok(())
            }
            Err(err) => {
                let failures = match &err {
                    SyncError::FinalizeFailed { failures } => *failures,
                    SyncError::CreateTimeout { pending } => *pending,
                    _ => 1,
                };
                tracing::error!("Finalize failed: {}", err);
                self.emit(AppEvent::Persistence(PersistenceEvent::FinalizeFailed {
                    failures,
                }));
                Err(err)
            }
        }
    }

    pub(super) fn apply_outcomes(&mut self, outcomes: Vec<SyncOutcome>) {
        for outcome in outcomes {
            match outcome {
                SyncOutcome::Created { local, id, .. } => {
                    self.rekey(local, id);
                    self.emit(AppEvent::Field(FieldEvent::Rekeyed { local, id }));
                    self.emit(AppEvent::Persistence(PersistenceEvent::Created { local, id }));
                }
                SyncOutcome::Updated { id, .. } => {
                    self.emit(AppEvent::Persistence(PersistenceEvent::Updated { id }));
                }
                SyncOutcome::Deleted { id } => {
                    self.emit(AppEvent::Persistence(PersistenceEvent::Deleted { id }));
                }
                SyncOutcome::MissingId { local } => {
                    let err = SyncError::MissingId { local };
                    tracing::error!("{}", err);
                    self.write_failed(FieldKey::Local(local), err.to_string());
                }
                SyncOutcome::CreateFailed { local, error } => {
                    self.write_failed(FieldKey::Local(local), error.to_string());
                }
                SyncOutcome::UpdateFailed { id, error } | SyncOutcome::DeleteFailed { id, error } => {
                    self.write_failed(FieldKey::Remote(id), error.to_string());
                }
            }
        }
    }

    fn write_failed(&self, key: FieldKey, message: String) {
        self.emit(AppEvent::Error(ErrorEvent::Notice {
            message: format!("Could not save {}: {}", key, message),
        }));
        self.emit(AppEvent::Persistence(PersistenceEvent::WriteFailed {
            key,
            message,
        }));
    }

    /// Readdresses a local field everywhere once its create resolved.
    fn rekey(&mut self, local: LocalId, id: FieldId) {
        let from = FieldKey::Local(local);
        let to = FieldKey::Remote(id);

        if !self.canvas.rekey(local, id) {
            tracing::debug!("{} resolved after it was removed locally", from);
        }
        self.selection.rekey(local, id);
        self.history
            .map_snapshots(|snapshot| rekey_fields(snapshot, local, id));
        self.gestures.rekey(local, id);
        self.focus.rekey(local, id);

        if let Some(menu) = self.menu.as_mut().filter(|m| m.key == from) {
            menu.key = to;
        }
        if let Some(edit) = self.editing.as_mut() {
            if edit.key == from {
                edit.key = to;
            }
            rekey_fields(&mut edit.before, local, id);
        }
        if let Some(drag) = self.drag.as_mut() {
            drag.rekey(local, id);
        }
        if let Some(batch) = self.batch.as_mut() {
            batch.snapshot.rekey(local, id);
            rekey_fields(&mut batch.before, local, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{at, session_with, TEMPLATE};
    use crate::canvas::Point;
    use fieldcanvas_core::{
        AppEvent, FieldId, FieldKey, FieldPatch, FieldType, MemoryBackend, PersistenceEvent,
        SyncError,
    };

    #[tokio::test]
    async fn test_patches_before_create_are_replayed() {
        let backend = MemoryBackend::new();
        let mut s = session_with(&backend);
        let key = s.create_field_at(Point::new(50.0, 50.0), FieldType::Text, at(0));

        s.apply_patch_intent(key, FieldPatch::size(30.0, 20.0), at(10))
            .unwrap();
        s.apply_patch_intent(key, FieldPatch::position(5.0, 60.0), at(100))
            .unwrap();
        s.tick(at(800));
        assert!(s.sync().deferred_patch(key.local_id().unwrap()).is_some());

        s.force_save().await.unwrap();

        let resolved = s.selection().single().unwrap();
        let id = resolved.remote_id().expect("create resolved");
        assert!(s.canvas().get(FieldKey::Remote(id)).is_some());
        let stored = backend.field(TEMPLATE, id).unwrap();
        assert_eq!(stored.width, 30.0);
        assert_eq!(stored.height, 20.0);
        assert_eq!(stored.x, 5.0);
        assert_eq!(stored.y, 60.0);
        assert!(s.sync().is_idle());
    }

    #[tokio::test]
    async fn test_finalize_failure_is_reported_and_retried() {
        let backend = MemoryBackend::new();
        let mut s = session_with(&backend);
        let mut events = s.events().receiver();
        let key = FieldKey::Remote(FieldId(1));

        s.apply_patch_intent(key, FieldPatch::position(40.0, 40.0), at(0))
            .unwrap();
        backend.fail_next_updates(1);
        let err = s.force_save().await.unwrap_err();
        assert_eq!(err, SyncError::FinalizeFailed { failures: 1 });
        // Local state is kept.
        assert_eq!(s.canvas().get(key).map(|f| f.x), Some(40.0));

        let mut failed = false;
        while let Ok(event) = events.try_recv() {
            if let AppEvent::Persistence(PersistenceEvent::FinalizeFailed { failures }) = event {
                assert_eq!(failures, 1);
                failed = true;
            }
        }
        assert!(failed);

        s.force_save().await.unwrap();
        assert_eq!(backend.field(TEMPLATE, FieldId(1)).map(|f| f.x), Some(40.0));
    }

    #[tokio::test]
    async fn test_missing_id_keeps_local_key() {
        let backend = MemoryBackend::new();
        let mut s = session_with(&backend);
        backend.omit_next_create_id(1);
        let key = s.create_field_at(Point::new(50.0, 50.0), FieldType::Text, at(0));

        assert!(s.force_save().await.is_err());
        assert!(s.canvas().get(key).is_some());
        assert!(!key.is_durable());

        // The next finalize retries the create.
        s.force_save().await.unwrap();
        assert!(s.canvas().get(key).is_none());
        assert!(s.canvas().fields().iter().all(|f| f.key.is_durable()));
    }
}
