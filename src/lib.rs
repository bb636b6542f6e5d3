//! # FieldCanvas
//!
//! Interactive placement of form fields over scanned page images: a zoomable
//! camera, one gesture arbitrator for taps, pans, pinches, drags and marquee
//! selection, batch spacing for multi-selections, keyboard-aware focus, and
//! debounced optimistic persistence with undo.
//!
//! ## Architecture
//!
//! FieldCanvas is organized as a workspace with multiple crates:
//!
//! 1. **fieldcanvas-core** - Field records, errors, event bus, backend trait
//! 2. **fieldcanvas-settings** - Tunables and config file I/O
//! 3. **fieldcanvas-designer** - Camera, gestures, selection, batch, focus,
//!    history, sync engine and the `PlacementSession` facade
//! 4. **fieldcanvas** - This crate: re-exports, logging, and the headless
//!    replay tool

pub mod replay;

pub use fieldcanvas_core::{
    AppEvent, BackendError, CalibrationRect, Error, EventBus, Field, FieldBackend, FieldId,
    FieldKey, FieldPatch, FieldType, LocalId, MemoryBackend, Result, SyncError, TemplateId,
    TemplateRecord, ValidationError,
};

pub use fieldcanvas_designer::{
    BatchAdjust, CameraState, GestureMode, PlacementSession, Point, PointerEvent, Rect,
    ResizeHandle, Size, Viewport,
};

pub use fieldcanvas_settings::{CanvasConfig, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Short git revision the binary was built from
pub const BUILD_REVISION: &str = env!("BUILD_REVISION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - stderr output, so replay results on stdout stay machine readable
/// - RUST_LOG environment variable support
/// - INFO as the default level
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = log_filter(std::env::var("RUST_LOG").ok());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Filter from `RUST_LOG` directives, INFO when unset or unparsable.
fn log_filter(directives: Option<String>) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(tracing::Level::INFO.to_string()))
}
