//! # FieldCanvas Core
//!
//! Shared types for the field placement canvas: the field record model,
//! the error taxonomy, the session event bus, and the backend interface the
//! canvas persists through.

pub mod backend;
pub mod constants;
pub mod data;
pub mod error;
pub mod event_bus;

pub use backend::{BackendCall, FieldBackend, MemoryBackend};

pub use data::{
    CalibrationRect, Field, FieldId, FieldKey, FieldPatch, FieldPayload, FieldType, LocalId,
    RemoteField, TemplateId, TemplateRecord, TextAlign,
};

pub use error::{BackendError, Error, Result, SyncError, ValidationError};

pub use event_bus::{
    AppEvent, ErrorEvent, EventBus, EventBusConfig, EventCategory, EventFilter, FieldEvent,
    PersistenceEvent, RecordedEvent, SelectionEvent, SubscriptionId, ViewEvent,
};
