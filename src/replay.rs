//! Headless replay of scripted canvas input.
//!
//! A script is a JSON document with the viewport size, an optional page
//! image size and a list of steps stamped in milliseconds from the start of
//! the run. Steps are fed through a [`PlacementSession`] backed by a
//! [`MemoryBackend`], the session is finalized, and the resulting model is
//! reported.

use anyhow::Context;
use fieldcanvas_core::{
    Field, FieldId, FieldKey, FieldType, MemoryBackend, TemplateId, TemplateRecord,
};
use fieldcanvas_designer::{
    BatchAdjust, CameraState, PlacementSession, Point, PointerEvent, ResizeHandle, Size,
};
use fieldcanvas_settings::CanvasConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TEMPLATE: TemplateId = TemplateId(1);
const SETTLE_PASSES: usize = 8;

fn default_viewport() -> Size {
    Size::new(390.0, 844.0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_viewport")]
    pub viewport: Size,
    /// Natural page size; the page image or the viewport is used otherwise.
    #[serde(default)]
    pub image: Option<Size>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted input. Pointer positions are in screen pixels, field
/// positions in percent of the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Down {
        at_ms: u64,
        #[serde(default)]
        pointer: u64,
        x: f64,
        y: f64,
    },
    Move {
        at_ms: u64,
        #[serde(default)]
        pointer: u64,
        x: f64,
        y: f64,
    },
    Up {
        at_ms: u64,
        #[serde(default)]
        pointer: u64,
        x: f64,
        y: f64,
    },
    Cancel {
        at_ms: u64,
        #[serde(default)]
        pointer: u64,
    },
    Tick {
        at_ms: u64,
    },
    Create {
        at_ms: u64,
        x: f64,
        y: f64,
        #[serde(default)]
        field_type: FieldType,
    },
    Select {
        at_ms: u64,
        field: u64,
    },
    SelectRow {
        at_ms: u64,
        field: u64,
    },
    SelectColumn {
        at_ms: u64,
        field: u64,
    },
    Resize {
        at_ms: u64,
        field: u64,
        dx: f64,
        dy: f64,
    },
    Batch {
        adjust: BatchAdjust,
    },
    CommitBatch {
        at_ms: u64,
    },
    Keyboard {
        at_ms: u64,
        height: f64,
        #[serde(default)]
        stacked: bool,
    },
    MarqueeMode {
        enabled: bool,
    },
    ZoomIn,
    ZoomOut,
    Undo {
        at_ms: u64,
    },
    Redo {
        at_ms: u64,
    },
    Page {
        page: u32,
    },
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub fields: Vec<Field>,
    pub selected: Vec<FieldKey>,
    pub camera: CameraState,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reads a template record from a JSON file.
pub fn read_template(path: &Path) -> anyhow::Result<TemplateRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading template {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing template {}", path.display()))
}

pub fn read_script(path: &Path) -> anyhow::Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
}

/// Natural pixel size of a page image.
pub fn image_size(path: &Path) -> anyhow::Result<Size> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("reading page image {}", path.display()))?;
    Ok(Size::new(f64::from(width), f64::from(height)))
}

/// Runs `script` against `record` and finalizes.
///
/// A failed finalize is reported, not returned as an error; the local model
/// is still printed.
pub async fn run(
    record: TemplateRecord,
    script: Script,
    page_image: Option<Size>,
    config: CanvasConfig,
) -> anyhow::Result<ReplayReport> {
    let backend = MemoryBackend::new();
    backend.insert_template(TEMPLATE, record);

    let image = page_image.or(script.image).unwrap_or(script.viewport);
    let mut session =
        PlacementSession::load(Arc::new(backend), TEMPLATE, config, script.viewport, image)
            .await?;

    let start = Instant::now();
    tracing::info!("Replaying {} step(s)", script.steps.len());
    for step in script.steps {
        apply_step(&mut session, step, start).await?;
    }

    settle(&mut session);

    let (saved, error) = match session.force_save().await {
        Ok(()) => (true, None),
        Err(err) => {
            tracing::warn!("Finalize failed: {}", err);
            (false, Some(err.to_string()))
        }
    };

    Ok(ReplayReport {
        fields: session.canvas().fields().to_vec(),
        selected: session.selection().selected(),
        camera: session.viewport().camera(),
        saved,
        error,
    })
}

/// Ticks through whatever the script left queued so the report shows the
/// camera a user would end up with.
fn settle(session: &mut PlacementSession) {
    // A focus pass re-queues itself while a finger is still down.
    for _ in 0..SETTLE_PASSES {
        let Some(deadline) = session.next_deadline() else {
            return;
        };
        session.tick(deadline);
    }
    tracing::debug!("Replay ended with work still queued");
}

async fn apply_step(
    session: &mut PlacementSession,
    step: Step,
    start: Instant,
) -> anyhow::Result<()> {
    let at = |ms: u64| start + Duration::from_millis(ms);
    let key = |id: u64| FieldKey::Remote(FieldId(id));

    match step {
        Step::Down { at_ms, pointer, x, y } => session.pointer(PointerEvent::Down {
            id: pointer,
            position: Point::new(x, y),
            at: at(at_ms),
        }),
        Step::Move { at_ms, pointer, x, y } => session.pointer(PointerEvent::Move {
            id: pointer,
            position: Point::new(x, y),
            at: at(at_ms),
        }),
        Step::Up { at_ms, pointer, x, y } => session.pointer(PointerEvent::Up {
            id: pointer,
            position: Point::new(x, y),
            at: at(at_ms),
        }),
        Step::Cancel { at_ms, pointer } => session.pointer(PointerEvent::Cancel {
            id: pointer,
            at: at(at_ms),
        }),
        Step::Tick { at_ms } => session.tick(at(at_ms)),
        Step::Create {
            at_ms,
            x,
            y,
            field_type,
        } => {
            session.create_field_at(Point::new(x, y), field_type, at(at_ms));
        }
        Step::Select { at_ms, field } => session.select(key(field), at(at_ms)),
        Step::SelectRow { at_ms, field } => {
            session.select_row(key(field), at(at_ms));
        }
        Step::SelectColumn { at_ms, field } => {
            session.select_column(key(field), at(at_ms));
        }
        Step::Resize { at_ms, field, dx, dy } => {
            if let Err(err) = session.resize_field(
                key(field),
                ResizeHandle::BottomRight,
                Point::new(dx, dy),
                at(at_ms),
            ) {
                tracing::warn!("Resize of field {} rejected: {}", field, err);
            }
        }
        Step::Batch { adjust } => {
            session.set_batch_adjust(adjust);
        }
        Step::CommitBatch { at_ms } => {
            session.commit_batch(at(at_ms));
        }
        Step::Keyboard {
            at_ms,
            height,
            stacked,
        } => session.keyboard_changed(height, stacked, at(at_ms)),
        Step::MarqueeMode { enabled } => session.set_marquee_mode(enabled),
        Step::ZoomIn => {
            session.zoom_in();
        }
        Step::ZoomOut => {
            session.zoom_out();
        }
        Step::Undo { at_ms } => {
            session.undo(at(at_ms));
        }
        Step::Redo { at_ms } => {
            session.redo(at(at_ms));
        }
        Step::Page { page } => session.change_page(page).await?,
    }
    Ok(())
}
