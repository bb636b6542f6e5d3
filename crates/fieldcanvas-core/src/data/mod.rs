//! Data model for template fields.

mod field;
mod patch;
mod template;

pub use field::{Field, FieldId, FieldKey, FieldType, LocalId, TextAlign};
pub use patch::{FieldPatch, FieldPayload, RemoteField};
pub use template::{CalibrationRect, TemplateId, TemplateRecord};
