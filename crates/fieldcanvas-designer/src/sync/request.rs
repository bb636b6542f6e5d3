use fieldcanvas_core::{
    BackendError, FieldBackend, FieldId, FieldPatch, FieldPayload, LocalId, RemoteField,
    TemplateId,
};
use std::sync::Arc;

/// A remote write about to be dispatched.
#[derive(Debug, Clone)]
pub(super) enum Request {
    Create { local: LocalId, payload: FieldPayload },
    Update { id: FieldId, patch: FieldPatch },
    Delete { id: FieldId },
}

/// A finished remote write, delivered back to the engine.
#[derive(Debug)]
pub(super) enum Completion {
    Create {
        local: LocalId,
        result: Result<RemoteField, BackendError>,
    },
    Update {
        id: FieldId,
        patch: FieldPatch,
        result: Result<RemoteField, BackendError>,
    },
    Delete {
        id: FieldId,
        result: Result<(), BackendError>,
    },
}

impl Request {
    pub(super) async fn run(self, backend: Arc<dyn FieldBackend>, template: TemplateId) -> Completion {
        match self {
            Request::Create { local, payload } => Completion::Create {
                local,
                result: backend.create_field(template, payload).await,
            },
            Request::Update { id, patch } => {
                let result = backend.update_field(template, id, patch.clone()).await;
                Completion::Update { id, patch, result }
            }
            Request::Delete { id } => Completion::Delete {
                id,
                result: backend.delete_field(template, id).await,
            },
        }
    }

    /// Completion reporting that the request never reached the backend.
    pub(super) fn failed(self, error: BackendError) -> Completion {
        match self {
            Request::Create { local, .. } => Completion::Create {
                local,
                result: Err(error),
            },
            Request::Update { id, patch } => Completion::Update {
                id,
                patch,
                result: Err(error),
            },
            Request::Delete { id } => Completion::Delete {
                id,
                result: Err(error),
            },
        }
    }
}
