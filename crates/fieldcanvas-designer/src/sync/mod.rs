//! Debounced write pipeline between the optimistic local model and the
//! remote field store.
//!
//! Local edits land in the model immediately; this engine only decides when
//! and how they reach the backend:
//! - updates are debounced per key, and a newer edit replaces (merges into)
//!   the pending one
//! - a field still addressed by its local id is never patched; its patch is
//!   deferred until the create returns an id, then replayed
//! - one create per local id is in flight at a time
//! - one update per field is in flight at a time; later patches queue behind
//!   it, so a field's writes reach the store in commit order
//!
//! Writes run on the tokio runtime and report back over a channel that
//! [`SyncEngine::poll`] drains, so completions are always handled on the
//! caller's thread.

mod request;

use fieldcanvas_core::{
    BackendError, FieldBackend, FieldId, FieldKey, FieldPatch, FieldPayload, LocalId, SyncError,
    TemplateId,
};
use fieldcanvas_settings::PersistenceSettings;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::debounce::Debouncer;
use request::{Completion, Request};

/// What happened to a remote write.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Created {
        local: LocalId,
        id: FieldId,
        echo: FieldPatch,
    },
    CreateFailed {
        local: LocalId,
        error: BackendError,
    },
    /// The create succeeded but its response carried no id.
    MissingId { local: LocalId },
    Updated { id: FieldId, echo: FieldPatch },
    UpdateFailed { id: FieldId, error: BackendError },
    Deleted { id: FieldId },
    DeleteFailed { id: FieldId, error: BackendError },
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncOutcome::CreateFailed { .. }
                | SyncOutcome::MissingId { .. }
                | SyncOutcome::UpdateFailed { .. }
                | SyncOutcome::DeleteFailed { .. }
        )
    }

    pub fn key(&self) -> FieldKey {
        match self {
            SyncOutcome::Created { local, .. }
            | SyncOutcome::CreateFailed { local, .. }
            | SyncOutcome::MissingId { local } => FieldKey::Local(*local),
            SyncOutcome::Updated { id, .. }
            | SyncOutcome::UpdateFailed { id, .. }
            | SyncOutcome::Deleted { id }
            | SyncOutcome::DeleteFailed { id, .. } => FieldKey::Remote(*id),
        }
    }
}

/// Result of a finalize pass.
#[derive(Debug)]
pub struct FlushReport {
    pub outcomes: Vec<SyncOutcome>,
    pub result: Result<(), SyncError>,
}

pub struct SyncEngine {
    backend: Arc<dyn FieldBackend>,
    template: TemplateId,
    timer: Debouncer<FieldKey>,
    create_timeout: Duration,
    /// Debounced patches not yet fired.
    pending: HashMap<FieldKey, FieldPatch>,
    /// Fired patches of local fields waiting for their id.
    deferred: HashMap<LocalId, FieldPatch>,
    creating: HashSet<LocalId>,
    /// Create bodies kept until the create succeeds, for retries.
    create_payloads: HashMap<LocalId, FieldPayload>,
    resolved: HashMap<LocalId, FieldId>,
    /// Deleted while their create was still in flight.
    deleted_locals: HashSet<LocalId>,
    updating: HashSet<FieldId>,
    queued: HashMap<FieldId, FieldPatch>,
    failed_updates: HashMap<FieldId, FieldPatch>,
    failed_deletes: HashSet<FieldId>,
    in_flight: usize,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("template", &self.template)
            .field("pending", &self.pending.len())
            .field("deferred", &self.deferred.len())
            .field("creating", &self.creating.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl SyncEngine {
    pub fn new(
        backend: Arc<dyn FieldBackend>,
        template: TemplateId,
        settings: &PersistenceSettings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            template,
            timer: Debouncer::new(settings.update_debounce()),
            create_timeout: settings.create_timeout(),
            pending: HashMap::new(),
            deferred: HashMap::new(),
            creating: HashSet::new(),
            create_payloads: HashMap::new(),
            resolved: HashMap::new(),
            deleted_locals: HashSet::new(),
            updating: HashSet::new(),
            queued: HashMap::new(),
            failed_updates: HashMap::new(),
            failed_deletes: HashSet::new(),
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn create_timeout(&self) -> Duration {
        self.create_timeout
    }

    /// Durable address of `key` when its create already resolved.
    pub fn resolve(&self, key: FieldKey) -> FieldKey {
        match key {
            FieldKey::Local(local) => self
                .resolved
                .get(&local)
                .map(|id| FieldKey::Remote(*id))
                .unwrap_or(key),
            remote => remote,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn pending_creates(&self) -> usize {
        self.creating.len()
    }

    /// Debounced patches not yet fired.
    pub fn pending_updates(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_patch(&self, key: FieldKey) -> Option<&FieldPatch> {
        self.pending.get(&self.resolve(key))
    }

    pub fn deferred_patch(&self, local: LocalId) -> Option<&FieldPatch> {
        self.deferred.get(&local)
    }

    /// Writes that failed and wait for the next attempt.
    pub fn failed_count(&self) -> usize {
        let failed_creates = self
            .create_payloads
            .keys()
            .filter(|local| !self.creating.contains(*local))
            .count();
        failed_creates + self.failed_updates.len() + self.failed_deletes.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
            && self.pending.is_empty()
            && self.deferred.is_empty()
            && self.failed_count() == 0
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.next_deadline()
    }

    /// Issues the create for a local field. Returns false when one is
    /// already in flight or the field already has an id.
    pub fn create(&mut self, local: LocalId, payload: FieldPayload) -> bool {
        if self.creating.contains(&local) || self.resolved.contains_key(&local) {
            tracing::debug!("Create for {} already issued", local);
            return false;
        }
        self.create_payloads.insert(local, payload.clone());
        self.creating.insert(local);
        self.dispatch(Request::Create { local, payload });
        true
    }

    /// Debounces a patch for `key`, merging it into any pending one.
    pub fn schedule_update(&mut self, key: FieldKey, patch: FieldPatch, now: Instant) {
        if patch.is_empty() {
            return;
        }
        let key = self.resolve(key);
        self.pending.entry(key).or_default().merge(patch);
        if self.timer.schedule(key, now) {
            tracing::trace!("Replaced pending write for {}", key);
        }
    }

    /// Drops pending work for `key` and deletes it remotely once it has an id.
    pub fn delete(&mut self, key: FieldKey) {
        let key = self.resolve(key);
        self.timer.cancel(&key);
        self.pending.remove(&key);

        match key {
            FieldKey::Remote(id) => {
                self.queued.remove(&id);
                self.failed_updates.remove(&id);
                self.dispatch(Request::Delete { id });
            }
            FieldKey::Local(local) => {
                self.deferred.remove(&local);
                if self.creating.contains(&local) {
                    self.deleted_locals.insert(local);
                } else {
                    // Never reached the store.
                    self.create_payloads.remove(&local);
                }
            }
        }
    }

    /// Fires due writes and handles every completion received so far.
    pub fn poll(&mut self, now: Instant) -> Vec<SyncOutcome> {
        for key in self.timer.due(now) {
            self.fire(key);
        }
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            outcomes.extend(self.complete(completion));
        }
        outcomes
    }

    /// Re-issues every failed write.
    pub fn retry_failed(&mut self) {
        let creates: Vec<(LocalId, FieldPayload)> = self
            .create_payloads
            .iter()
            .filter(|(local, _)| !self.creating.contains(*local))
            .map(|(local, payload)| (*local, payload.clone()))
            .collect();
        for (local, payload) in creates {
            tracing::info!("Retrying create for {}", local);
            self.creating.insert(local);
            self.dispatch(Request::Create { local, payload });
        }

        let updates: Vec<FieldId> = self
            .failed_updates
            .keys()
            .filter(|id| !self.updating.contains(*id))
            .copied()
            .collect();
        for id in updates {
            self.dispatch_update(id, FieldPatch::new());
        }

        for id in std::mem::take(&mut self.failed_deletes) {
            self.dispatch(Request::Delete { id });
        }
    }

    /// Finalize: fires every pending and failed write, then waits for all of
    /// them (and anything they trigger) to finish.
    pub async fn flush(&mut self, timeout: Duration) -> FlushReport {
        for key in self.timer.drain_all() {
            self.fire(key);
        }
        self.retry_failed();
        tracing::info!("Flushing {} in-flight write(s)", self.in_flight);

        let mut outcomes = Vec::new();
        if let Err(err) = self.settle(timeout, &mut outcomes).await {
            return FlushReport {
                outcomes,
                result: Err(err),
            };
        }

        let failures = outcomes.iter().filter(|o| o.is_failure()).count();
        let result = if failures > 0 {
            Err(SyncError::FinalizeFailed { failures })
        } else {
            Ok(())
        };
        FlushReport { outcomes, result }
    }

    /// Waits until nothing is in flight, collecting outcomes.
    pub async fn settle(
        &mut self,
        timeout: Duration,
        outcomes: &mut Vec<SyncOutcome>,
    ) -> Result<(), SyncError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            while let Ok(completion) = self.rx.try_recv() {
                outcomes.extend(self.complete(completion));
            }
            if self.in_flight == 0 {
                return Ok(());
            }
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(completion)) => outcomes.extend(self.complete(completion)),
                Ok(None) => return Ok(()),
                Err(_) => {
                    tracing::warn!("Timed out with {} write(s) in flight", self.in_flight);
                    return Err(SyncError::CreateTimeout {
                        pending: self.in_flight,
                    });
                }
            }
        }
    }

    fn fire(&mut self, key: FieldKey) {
        let Some(patch) = self.pending.remove(&key) else {
            return;
        };
        match self.resolve(key) {
            FieldKey::Remote(id) => self.dispatch_update(id, patch),
            FieldKey::Local(local) => {
                tracing::debug!("Deferring patch for {} until its create resolves", local);
                self.deferred.entry(local).or_default().merge(patch);
                if !self.creating.contains(&local) {
                    if let Some(payload) = self.create_payloads.get(&local).cloned() {
                        self.creating.insert(local);
                        self.dispatch(Request::Create { local, payload });
                    }
                }
            }
        }
    }

    fn dispatch_update(&mut self, id: FieldId, patch: FieldPatch) {
        if self.updating.contains(&id) {
            self.queued.entry(id).or_default().merge(patch);
            return;
        }
        let patch = match self.failed_updates.remove(&id) {
            Some(failed) => failed.merged(patch),
            None => patch,
        };
        if patch.is_empty() {
            return;
        }
        self.updating.insert(id);
        self.dispatch(Request::Update { id, patch });
    }

    fn dispatch(&mut self, request: Request) {
        self.in_flight += 1;
        let tx = self.tx.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let backend = Arc::clone(&self.backend);
                let template = self.template;
                handle.spawn(async move {
                    let completion = request.run(backend, template).await;
                    // The engine may be gone; its writes no longer matter.
                    let _ = tx.send(completion);
                });
            }
            Err(_) => {
                tracing::error!("No async runtime available, write not sent");
                let _ = tx.send(request.failed(BackendError::network("no async runtime")));
            }
        }
    }

    fn complete(&mut self, completion: Completion) -> Vec<SyncOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);
        let mut outcomes = Vec::new();

        match completion {
            Completion::Create { local, result } => {
                self.creating.remove(&local);
                match result {
                    Ok(remote) => match remote.id {
                        Some(id) => {
                            self.create_payloads.remove(&local);
                            self.resolved.insert(local, id);
                            tracing::debug!("Created {} as {}", local, id);

                            if self.deleted_locals.remove(&local) {
                                self.deferred.remove(&local);
                                self.dispatch(Request::Delete { id });
                            } else {
                                let from = FieldKey::Local(local);
                                let to = FieldKey::Remote(id);
                                if let Some(patch) = self.pending.remove(&from) {
                                    self.pending.insert(to, patch);
                                    self.timer.rekey(&from, to);
                                }
                                if let Some(patch) = self.deferred.remove(&local) {
                                    self.dispatch_update(id, patch);
                                }
                            }
                            outcomes.push(SyncOutcome::Created {
                                local,
                                id,
                                echo: remote.echo,
                            });
                        }
                        None => {
                            tracing::error!("Create for {} returned no id", local);
                            outcomes.push(SyncOutcome::MissingId { local });
                        }
                    },
                    Err(error) => {
                        tracing::warn!("Create for {} failed: {}", local, error);
                        outcomes.push(SyncOutcome::CreateFailed { local, error });
                    }
                }
                if !self.resolved.contains_key(&local) && self.deleted_locals.remove(&local) {
                    self.create_payloads.remove(&local);
                    self.deferred.remove(&local);
                }
            }
            Completion::Update { id, patch, result } => {
                self.updating.remove(&id);
                match result {
                    Ok(remote) => outcomes.push(SyncOutcome::Updated {
                        id,
                        echo: remote.echo,
                    }),
                    Err(error) => {
                        tracing::warn!("Update of {} failed: {}", id, error);
                        self.failed_updates.insert(id, patch);
                        outcomes.push(SyncOutcome::UpdateFailed { id, error });
                    }
                }
                if let Some(next) = self.queued.remove(&id) {
                    self.dispatch_update(id, next);
                }
            }
            Completion::Delete { id, result } => match result {
                Ok(()) => outcomes.push(SyncOutcome::Deleted { id }),
                Err(error) => {
                    tracing::warn!("Delete of {} failed: {}", id, error);
                    self.failed_deletes.insert(id);
                    outcomes.push(SyncOutcome::DeleteFailed { id, error });
                }
            },
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcanvas_core::{BackendCall, Field, MemoryBackend, TemplateRecord};

    const TEMPLATE: TemplateId = TemplateId(1);

    fn engine(backend: &MemoryBackend) -> SyncEngine {
        SyncEngine::new(
            Arc::new(backend.clone()),
            TEMPLATE,
            &PersistenceSettings::default(),
        )
    }

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.insert_template(
            TEMPLATE,
            TemplateRecord {
                fields: vec![Field::new(FieldKey::Remote(FieldId(1)), 10.0, 10.0, 20.0, 14.0)],
                page_count: 1,
            },
        );
        backend
    }

    #[tokio::test]
    async fn test_debounce_merges_updates() {
        let backend = seeded();
        let mut sync = engine(&backend);
        let key = FieldKey::Remote(FieldId(1));
        let t0 = Instant::now();

        sync.schedule_update(key, FieldPatch::position(20.0, 20.0), t0);
        sync.schedule_update(key, FieldPatch::size(30.0, 16.0), t0 + Duration::from_millis(300));
        assert!(sync.poll(t0 + Duration::from_millis(700)).is_empty());
        assert_eq!(sync.in_flight(), 0);

        sync.poll(t0 + Duration::from_millis(950));
        let mut outcomes = Vec::new();
        sync.settle(Duration::from_secs(1), &mut outcomes).await.unwrap();
        assert!(matches!(outcomes[..], [SyncOutcome::Updated { .. }]));

        let updates: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Update { .. }))
            .collect();
        assert_eq!(updates.len(), 1);
        let stored = backend.field(TEMPLATE, FieldId(1)).unwrap();
        assert_eq!((stored.x, stored.width), (20.0, 30.0));
    }

    #[tokio::test]
    async fn test_create_dedup_and_deferred_patch() {
        let backend = MemoryBackend::new();
        backend.insert_template(TEMPLATE, TemplateRecord::default());
        let mut sync = engine(&backend);
        let field = Field::new(FieldKey::new_local(), 5.0, 5.0, 20.0, 14.0);
        let local = field.key.local_id().unwrap();

        assert!(sync.create(local, FieldPayload::from_field(local, &field)));
        assert!(!sync.create(local, FieldPayload::from_field(local, &field)));

        let report = {
            let t0 = Instant::now();
            sync.schedule_update(field.key, FieldPatch::position(40.0, 5.0), t0);
            sync.flush(Duration::from_secs(1)).await
        };
        assert!(report.result.is_ok());
        let id = report
            .outcomes
            .iter()
            .find_map(|o| match o {
                SyncOutcome::Created { id, .. } => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(backend.field(TEMPLATE, id).unwrap().x, 40.0);
        assert_eq!(sync.resolve(field.key), FieldKey::Remote(id));
    }

    #[tokio::test]
    async fn test_flush_reports_failures() {
        let backend = seeded();
        backend.fail_next_updates(1);
        let mut sync = engine(&backend);
        sync.schedule_update(
            FieldKey::Remote(FieldId(1)),
            FieldPatch::position(1.0, 1.0),
            Instant::now(),
        );
        let report = sync.flush(Duration::from_secs(1)).await;
        assert_eq!(report.result, Err(SyncError::FinalizeFailed { failures: 1 }));
        assert_eq!(sync.failed_count(), 1);

        // The next flush retries the failed patch.
        let report = sync.flush(Duration::from_secs(1)).await;
        assert!(report.result.is_ok());
        assert_eq!(backend.field(TEMPLATE, FieldId(1)).unwrap().x, 1.0);
    }

    #[tokio::test]
    async fn test_delete_before_create_resolves() {
        let backend = MemoryBackend::new();
        backend.insert_template(TEMPLATE, TemplateRecord::default());
        let mut sync = engine(&backend);
        let field = Field::new(FieldKey::new_local(), 5.0, 5.0, 20.0, 14.0);
        let local = field.key.local_id().unwrap();

        sync.create(local, FieldPayload::from_field(local, &field));
        sync.delete(field.key);
        let report = sync.flush(Duration::from_secs(1)).await;
        assert!(report.result.is_ok());
        assert!(backend.fields(TEMPLATE).is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_fails_finalize() {
        let backend = MemoryBackend::new();
        backend.insert_template(TEMPLATE, TemplateRecord::default());
        backend.omit_next_create_id(1);
        let mut sync = engine(&backend);
        let field = Field::new(FieldKey::new_local(), 5.0, 5.0, 20.0, 14.0);
        let local = field.key.local_id().unwrap();

        sync.create(local, FieldPayload::from_field(local, &field));
        let report = sync.flush(Duration::from_secs(1)).await;
        assert!(matches!(
            report.outcomes[..],
            [SyncOutcome::MissingId { .. }]
        ));
        assert!(report.result.is_err());
        assert_eq!(sync.resolve(field.key), field.key);
    }

    #[tokio::test]
    async fn test_create_timeout() {
        let backend = MemoryBackend::new();
        backend.insert_template(TEMPLATE, TemplateRecord::default());
        backend.set_latency(Some(Duration::from_millis(200)));
        let mut sync = engine(&backend);
        let field = Field::new(FieldKey::new_local(), 5.0, 5.0, 20.0, 14.0);
        let local = field.key.local_id().unwrap();

        sync.create(local, FieldPayload::from_field(local, &field));
        let report = sync.flush(Duration::from_millis(20)).await;
        assert_eq!(report.result, Err(SyncError::CreateTimeout { pending: 1 }));
    }

    #[test]
    fn test_without_runtime_write_fails() {
        let backend = seeded();
        let mut sync = engine(&backend);
        let t0 = Instant::now();
        sync.schedule_update(FieldKey::Remote(FieldId(1)), FieldPatch::position(2.0, 2.0), t0);
        let outcomes = sync.poll(t0 + Duration::from_secs(1));
        assert!(matches!(outcomes[..], [SyncOutcome::UpdateFailed { .. }]));
        assert_eq!(sync.failed_count(), 1);
    }
}
