//! Backend collaborator interface.
//!
//! The canvas treats every call as fallible and does not retry at this
//! layer; the next scheduled write is the natural retry path.

mod memory;

pub use memory::{BackendCall, MemoryBackend};

use async_trait::async_trait;

use crate::data::{
    CalibrationRect, FieldId, FieldPatch, FieldPayload, RemoteField, TemplateId, TemplateRecord,
};
use crate::error::BackendError;

/// Remote store of template fields.
#[async_trait]
pub trait FieldBackend: Send + Sync {
    /// Creates a field and returns its echo, which should carry the new id.
    async fn create_field(
        &self,
        template: TemplateId,
        payload: FieldPayload,
    ) -> Result<RemoteField, BackendError>;

    /// Applies a partial update to a durable field.
    async fn update_field(
        &self,
        template: TemplateId,
        id: FieldId,
        patch: FieldPatch,
    ) -> Result<RemoteField, BackendError>;

    async fn delete_field(&self, template: TemplateId, id: FieldId) -> Result<(), BackendError>;

    async fn get_template(&self, template: TemplateId) -> Result<TemplateRecord, BackendError>;

    /// Calibration rectangle of a page, if one was recorded.
    async fn get_calibration(
        &self,
        template: TemplateId,
        page: u32,
    ) -> Result<Option<CalibrationRect>, BackendError>;
}
