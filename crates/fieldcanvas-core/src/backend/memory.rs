//! In-memory backend with a call log and failure injection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::FieldBackend;
use crate::data::{
    CalibrationRect, Field, FieldId, FieldKey, FieldPatch, FieldPayload, LocalId, RemoteField,
    TemplateId, TemplateRecord,
};
use crate::error::BackendError;

/// One recorded backend request.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create { local: LocalId, payload: FieldPatch },
    Update { id: FieldId, patch: FieldPatch },
    Delete { id: FieldId },
    GetTemplate,
    GetCalibration { page: u32 },
}

#[derive(Debug, Default)]
struct StoredTemplate {
    fields: Vec<Field>,
    page_count: u32,
    calibrations: HashMap<u32, CalibrationRect>,
}

#[derive(Debug, Default)]
struct MemoryState {
    templates: HashMap<TemplateId, StoredTemplate>,
    next_id: u64,
    calls: Vec<BackendCall>,
    failing_creates: usize,
    failing_updates: usize,
    failing_deletes: usize,
    id_less_creates: usize,
    latency: Option<Duration>,
}

/// Thread-safe in-memory `FieldBackend`.
///
/// Clones share state, so a test can keep a handle while the session owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Seeds a template. Field keys are rewritten to fresh durable ids when
    /// they are not durable already.
    pub fn insert_template(&self, template: TemplateId, record: TemplateRecord) {
        let mut state = self.state.lock();
        let mut fields = record.fields;
        for field in &mut fields {
            match field.key {
                FieldKey::Remote(FieldId(id)) => state.next_id = state.next_id.max(id + 1),
                FieldKey::Local(_) => {
                    field.key = FieldKey::Remote(FieldId(state.next_id));
                    state.next_id += 1;
                }
            }
        }
        state.templates.insert(
            template,
            StoredTemplate {
                fields,
                page_count: record.page_count.max(1),
                calibrations: HashMap::new(),
            },
        );
    }

    pub fn set_calibration(&self, template: TemplateId, page: u32, rect: CalibrationRect) {
        self.state
            .lock()
            .templates
            .entry(template)
            .or_default()
            .calibrations
            .insert(page, rect);
    }

    /// Delay applied before every request completes.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    pub fn fail_next_creates(&self, count: usize) {
        self.state.lock().failing_creates = count;
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.state.lock().failing_updates = count;
    }

    pub fn fail_next_deletes(&self, count: usize) {
        self.state.lock().failing_deletes = count;
    }

    /// The next `count` creates succeed but answer without an id.
    pub fn omit_next_create_id(&self, count: usize) {
        self.state.lock().id_less_creates = count;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn fields(&self, template: TemplateId) -> Vec<Field> {
        self.state
            .lock()
            .templates
            .get(&template)
            .map(|t| t.fields.clone())
            .unwrap_or_default()
    }

    pub fn field(&self, template: TemplateId, id: FieldId) -> Option<Field> {
        self.state
            .lock()
            .templates
            .get(&template)
            .and_then(|t| t.fields.iter().find(|f| f.key == FieldKey::Remote(id)).cloned())
    }

    async fn delay(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn take_one(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl FieldBackend for MemoryBackend {
    async fn create_field(
        &self,
        template: TemplateId,
        payload: FieldPayload,
    ) -> Result<RemoteField, BackendError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Create {
            local: payload.local_id,
            payload: payload.attributes.clone(),
        });

        if take_one(&mut state.failing_creates) {
            return Err(BackendError::network("create failed"));
        }
        if take_one(&mut state.id_less_creates) {
            return Ok(RemoteField {
                id: None,
                echo: payload.attributes,
            });
        }

        let id = FieldId(state.next_id);
        state.next_id += 1;

        let mut field = Field::new(FieldKey::Remote(id), 0.0, 0.0, 0.0, 0.0);
        payload.attributes.apply_to(&mut field);
        let echo = FieldPatch::from_field(&field);
        state.templates.entry(template).or_default().fields.push(field);

        tracing::debug!("memory backend: created {} in {}", id, template);
        Ok(RemoteField { id: Some(id), echo })
    }

    async fn update_field(
        &self,
        template: TemplateId,
        id: FieldId,
        patch: FieldPatch,
    ) -> Result<RemoteField, BackendError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Update {
            id,
            patch: patch.clone(),
        });

        if take_one(&mut state.failing_updates) {
            return Err(BackendError::network("update failed"));
        }

        let field = state
            .templates
            .get_mut(&template)
            .and_then(|t| t.fields.iter_mut().find(|f| f.key == FieldKey::Remote(id)))
            .ok_or_else(|| BackendError::NotFound {
                what: format!("field {} in {}", id, template),
            })?;
        patch.apply_to(field);

        Ok(RemoteField {
            id: Some(id),
            echo: FieldPatch::from_field(field),
        })
    }

    async fn delete_field(&self, template: TemplateId, id: FieldId) -> Result<(), BackendError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Delete { id });

        if take_one(&mut state.failing_deletes) {
            return Err(BackendError::network("delete failed"));
        }

        let stored = state
            .templates
            .get_mut(&template)
            .ok_or_else(|| BackendError::NotFound {
                what: template.to_string(),
            })?;
        let before = stored.fields.len();
        stored.fields.retain(|f| f.key != FieldKey::Remote(id));
        if stored.fields.len() == before {
            return Err(BackendError::NotFound {
                what: format!("field {} in {}", id, template),
            });
        }
        Ok(())
    }

    async fn get_template(&self, template: TemplateId) -> Result<TemplateRecord, BackendError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(BackendCall::GetTemplate);
        state
            .templates
            .get(&template)
            .map(|t| TemplateRecord {
                fields: t.fields.clone(),
                page_count: t.page_count.max(1),
            })
            .ok_or_else(|| BackendError::NotFound {
                what: template.to_string(),
            })
    }

    async fn get_calibration(
        &self,
        template: TemplateId,
        page: u32,
    ) -> Result<Option<CalibrationRect>, BackendError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.calls.push(BackendCall::GetCalibration { page });
        Ok(state
            .templates
            .get(&template)
            .and_then(|t| t.calibrations.get(&page).copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: TemplateId = TemplateId(1);

    fn payload(x: f64) -> FieldPayload {
        let field = Field::new(FieldKey::new_local(), x, 5.0, 20.0, 14.0);
        FieldPayload::from_field(LocalId::new(), &field)
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let backend = MemoryBackend::new();
        let a = backend.create_field(T, payload(1.0)).await.unwrap();
        let b = backend.create_field(T, payload(2.0)).await.unwrap();
        assert_eq!(a.id, Some(FieldId(1)));
        assert_eq!(b.id, Some(FieldId(2)));
        assert_eq!(backend.fields(T).len(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_next_creates(1);
        assert!(backend.create_field(T, payload(1.0)).await.is_err());
        assert!(backend.create_field(T, payload(1.0)).await.is_ok());

        backend.omit_next_create_id(1);
        let echo = backend.create_field(T, payload(3.0)).await.unwrap();
        assert!(echo.id.is_none());

        backend.fail_next_updates(1);
        let err = backend
            .update_field(T, FieldId(1), FieldPatch::position(1.0, 1.0))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let backend = MemoryBackend::new();
        let id = backend.create_field(T, payload(1.0)).await.unwrap().id.unwrap();
        backend
            .update_field(T, id, FieldPatch::position(40.0, 41.0))
            .await
            .unwrap();
        let stored = backend.field(T, id).unwrap();
        assert_eq!((stored.x, stored.y), (40.0, 41.0));

        backend.delete_field(T, id).await.unwrap();
        assert!(backend.field(T, id).is_none());
        assert!(matches!(
            backend.delete_field(T, id).await,
            Err(BackendError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_template_and_calibration() {
        let backend = MemoryBackend::new();
        assert!(backend.get_template(T).await.is_err());

        backend.insert_template(
            T,
            TemplateRecord {
                fields: vec![Field::new(FieldKey::new_local(), 1.0, 1.0, 10.0, 12.0)],
                page_count: 2,
            },
        );
        let record = backend.get_template(T).await.unwrap();
        assert_eq!(record.page_count, 2);
        assert!(record.fields[0].key.is_durable());

        let rect = CalibrationRect {
            x: 5.0,
            y: 5.0,
            width: 90.0,
            height: 90.0,
        };
        backend.set_calibration(T, 1, rect);
        assert_eq!(backend.get_calibration(T, 1).await.unwrap(), Some(rect));
        assert_eq!(backend.get_calibration(T, 0).await.unwrap(), None);
        assert_eq!(
            backend.calls().last(),
            Some(&BackendCall::GetCalibration { page: 0 })
        );
    }
}
