//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so a session can be logged and
//! replayed.

use serde::{Deserialize, Serialize};

use crate::data::{FieldId, FieldKey, LocalId};

/// Root event enum for all session events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Field model mutations
    Field(FieldEvent),
    /// Selection changes
    Selection(SelectionEvent),
    /// Camera, menu and page changes
    View(ViewEvent),
    /// Remote write progress
    Persistence(PersistenceEvent),
    /// Non-blocking notices
    Error(ErrorEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Field(_) => EventCategory::Field,
            AppEvent::Selection(_) => EventCategory::Selection,
            AppEvent::View(_) => EventCategory::View,
            AppEvent::Persistence(_) => EventCategory::Persistence,
            AppEvent::Error(_) => EventCategory::Error,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Field(e) => e.description(),
            AppEvent::Selection(e) => e.description(),
            AppEvent::View(e) => e.description(),
            AppEvent::Persistence(e) => e.description(),
            AppEvent::Error(e) => e.description(),
        }
    }

    /// Whether this event is about `key`.
    ///
    /// A rekey concerns both the local and the durable address, so a
    /// listener following a new field keeps receiving its events.
    pub fn concerns(&self, key: FieldKey) -> bool {
        let is = |other: &FieldKey| *other == key;
        match self {
            AppEvent::Field(FieldEvent::Created { key: k })
            | AppEvent::Field(FieldEvent::Updated { key: k })
            | AppEvent::Field(FieldEvent::Deleted { key: k }) => is(k),
            AppEvent::Field(FieldEvent::Duplicated { source, key: k }) => is(source) || is(k),
            AppEvent::Field(FieldEvent::Rekeyed { local, id })
            | AppEvent::Persistence(PersistenceEvent::Created { local, id }) => {
                key == FieldKey::Local(*local) || key == FieldKey::Remote(*id)
            }
            AppEvent::Field(FieldEvent::Restored { .. }) => false,
            AppEvent::Selection(SelectionEvent::Changed { selected, .. }) => {
                selected.contains(&key)
            }
            AppEvent::Selection(SelectionEvent::Cleared) => false,
            AppEvent::View(ViewEvent::MenuOpened { key: k }) => is(k),
            AppEvent::View(ViewEvent::EditingChanged { key: k }) => k.as_ref().is_some_and(is),
            AppEvent::View(_) => false,
            AppEvent::Persistence(PersistenceEvent::Updated { id })
            | AppEvent::Persistence(PersistenceEvent::Deleted { id }) => {
                key == FieldKey::Remote(*id)
            }
            AppEvent::Persistence(PersistenceEvent::WriteFailed { key: k, .. }) => is(k),
            AppEvent::Persistence(_) => false,
            AppEvent::Error(ErrorEvent::ValidationFailed { key: k, .. }) => is(k),
            AppEvent::Error(ErrorEvent::Notice { .. }) => false,
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Field model events.
    Field,
    /// Selection events.
    Selection,
    /// Camera, menu, keyboard and page events.
    View,
    /// Remote write events.
    Persistence,
    /// Error and notice events.
    Error,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Field => write!(f, "Field"),
            EventCategory::Selection => write!(f, "Selection"),
            EventCategory::View => write!(f, "View"),
            EventCategory::Persistence => write!(f, "Persistence"),
            EventCategory::Error => write!(f, "Error"),
        }
    }
}

/// Field model events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEvent {
    /// Field added to the model.
    Created {
        /// The new field.
        key: FieldKey,
    },
    /// Field copied from another.
    Duplicated {
        /// The copied field.
        source: FieldKey,
        /// The copy.
        key: FieldKey,
    },
    /// One or more attributes changed.
    Updated {
        /// The changed field.
        key: FieldKey,
    },
    /// Field removed from the model.
    Deleted {
        /// The removed field.
        key: FieldKey,
    },
    /// Local field received its durable id.
    Rekeyed {
        /// The former local id.
        local: LocalId,
        /// The durable id.
        id: FieldId,
    },
    /// Whole model replaced by undo/redo.
    Restored {
        /// Number of fields after the restore.
        count: usize,
    },
}

impl FieldEvent {
    fn description(&self) -> String {
        match self {
            FieldEvent::Created { key } => format!("Field {} created", key),
            FieldEvent::Duplicated { source, key } => {
                format!("Field {} duplicated as {}", source, key)
            }
            FieldEvent::Updated { key } => format!("Field {} updated", key),
            FieldEvent::Deleted { key } => format!("Field {} deleted", key),
            FieldEvent::Rekeyed { local, id } => format!("Field {} is now {}", local, id),
            FieldEvent::Restored { count } => format!("Restored {} field(s)", count),
        }
    }
}

/// Selection events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// Selection replaced.
    Changed {
        /// Selected fields in selection order.
        selected: Vec<FieldKey>,
        /// Whether multi-select mode is active.
        multi: bool,
    },
    /// Selection emptied.
    Cleared,
}

impl SelectionEvent {
    fn description(&self) -> String {
        match self {
            SelectionEvent::Changed { selected, multi } => format!(
                "Selection changed: {} field(s){}",
                selected.len(),
                if *multi { " (multi)" } else { "" }
            ),
            SelectionEvent::Cleared => "Selection cleared".to_string(),
        }
    }
}

/// Camera, menu and page events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewEvent {
    /// Camera transform committed.
    CameraChanged {
        /// New scale.
        scale: f64,
        /// New horizontal translate in viewport pixels.
        translate_x: f64,
        /// New vertical translate in viewport pixels.
        translate_y: f64,
    },
    /// Context menu opened for a field.
    MenuOpened {
        /// The field the menu belongs to.
        key: FieldKey,
    },
    /// Context menu closed.
    MenuClosed,
    /// Submenu switched; the sheet height changes with it.
    SubmenuChanged {
        /// Submenu name, `None` for the root menu.
        name: Option<String>,
        /// Sheet height in viewport pixels.
        sheet_height: f64,
    },
    /// On-screen keyboard shown or hidden.
    KeyboardChanged {
        /// Keyboard height in viewport pixels, zero when hidden.
        height: f64,
    },
    /// Marquee mode toggled.
    MarqueeModeChanged {
        /// Whether long-press on the document draws a marquee.
        enabled: bool,
    },
    /// Active page switched.
    PageChanged {
        /// New zero-based page.
        page: u32,
    },
    /// Text edit session began or ended.
    EditingChanged {
        /// The edited field, `None` when editing ended.
        key: Option<FieldKey>,
    },
}

impl ViewEvent {
    fn description(&self) -> String {
        match self {
            ViewEvent::CameraChanged {
                scale,
                translate_x,
                translate_y,
            } => format!(
                "Camera: scale {:.2}, translate ({:.1}, {:.1})",
                scale, translate_x, translate_y
            ),
            ViewEvent::MenuOpened { key } => format!("Menu opened for {}", key),
            ViewEvent::MenuClosed => "Menu closed".to_string(),
            ViewEvent::SubmenuChanged { name, sheet_height } => format!(
                "Submenu {} ({:.0}px)",
                name.as_deref().unwrap_or("root"),
                sheet_height
            ),
            ViewEvent::KeyboardChanged { height } => format!("Keyboard height {:.0}px", height),
            ViewEvent::MarqueeModeChanged { enabled } => {
                format!("Marquee mode {}", if *enabled { "on" } else { "off" })
            }
            ViewEvent::PageChanged { page } => format!("Page {}", page + 1),
            ViewEvent::EditingChanged { key } => match key {
                Some(key) => format!("Editing {}", key),
                None => "Editing ended".to_string(),
            },
        }
    }
}

/// Remote write events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PersistenceEvent {
    /// Create request completed.
    Created {
        /// The former local id.
        local: LocalId,
        /// Assigned durable id.
        id: FieldId,
    },
    /// Update request completed.
    Updated {
        /// The updated field.
        id: FieldId,
    },
    /// Delete request completed.
    Deleted {
        /// The deleted field.
        id: FieldId,
    },
    /// A write failed; local state is kept.
    WriteFailed {
        /// The field the write addressed.
        key: FieldKey,
        /// Failure message.
        message: String,
    },
    /// Finalize began draining writes.
    FinalizeStarted {
        /// Writes pending or in flight when finalize began.
        outstanding: usize,
    },
    /// Every write completed.
    FinalizeCompleted,
    /// Finalize aborted.
    FinalizeFailed {
        /// Number of failed writes.
        failures: usize,
    },
}

impl PersistenceEvent {
    fn description(&self) -> String {
        match self {
            PersistenceEvent::Created { local, id } => format!("Saved {} as {}", local, id),
            PersistenceEvent::Updated { id } => format!("Saved {}", id),
            PersistenceEvent::Deleted { id } => format!("Deleted {}", id),
            PersistenceEvent::WriteFailed { key, message } => {
                format!("Save failed for {}: {}", key, message)
            }
            PersistenceEvent::FinalizeStarted { outstanding } => {
                format!("Finalizing {} write(s)", outstanding)
            }
            PersistenceEvent::FinalizeCompleted => "All changes saved".to_string(),
            PersistenceEvent::FinalizeFailed { failures } => {
                format!("Finalize failed: {} write(s)", failures)
            }
        }
    }
}

/// Non-blocking notices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ErrorEvent {
    /// Transient failure shown to the user.
    Notice {
        /// Message text.
        message: String,
    },
    /// A patch intent was rejected.
    ValidationFailed {
        /// The field the intent addressed.
        key: FieldKey,
        /// Message text.
        message: String,
    },
}

impl ErrorEvent {
    fn description(&self) -> String {
        match self {
            ErrorEvent::Notice { message } => format!("Notice: {}", message),
            ErrorEvent::ValidationFailed { key, message } => {
                format!("Rejected change to {}: {}", key, message)
            }
        }
    }
}
