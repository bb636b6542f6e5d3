//! Default tunables shared by the settings and designer crates.

/// Hold time before a press arms a field drag or marquee.
pub const LONG_PRESS_MS: u64 = 550;
/// Finger travel that aborts a pending long press.
pub const LONG_PRESS_TOLERANCE_PX: f64 = 10.0;
/// Travel after which a gesture is consumed and no longer counts as a tap.
pub const TAP_SLOP_PX: f64 = 8.0;
/// Extra touch area around the selected field.
pub const HIT_SLOP_PX: f64 = 12.0;
/// Taps this soon after a delete never create a field.
pub const RECENT_DELETE_MS: u64 = 400;

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 4.0;
pub const ZOOM_STEP: f64 = 1.2;

pub const FOCUS_DEBOUNCE_MS: u64 = 120;
pub const FOCUS_WIDTH_FRACTION: f64 = 0.5;
pub const FOCUS_WIDE_FIELD_FRACTION: f64 = 0.85;
/// Fields wider than this share of the document get the wide-field fraction.
pub const FOCUS_WIDE_FIELD_THRESHOLD: f64 = 1.0 / 3.0;
pub const FOCUS_MAX_HEIGHT_FRACTION: f64 = 0.5;
/// Focused field center sits this far down the unobstructed band.
pub const FOCUS_ANCHOR_FRACTION: f64 = 0.35;
pub const FOCUS_SKIP_DELTA: f64 = 0.05;

pub const UPDATE_DEBOUNCE_MS: u64 = 600;
pub const CREATE_TIMEOUT_MS: u64 = 10_000;
pub const UNDO_DEPTH: usize = 20;

pub const DEFAULT_FONT_FAMILY: &str = "Helvetica";
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;
pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_WIDTH_PERCENT: f64 = 20.0;
pub const DUPLICATE_OFFSET_PX: f64 = 12.0;
pub const DEFAULT_BOOLEAN_SIZE_PX: f64 = 16.0;

pub const ROW_TOLERANCE_PERCENT: f64 = 1.5;
pub const COLUMN_TOLERANCE_PERCENT: f64 = 1.5;

/// Smallest field width, in percent of the image width.
pub const MIN_WIDTH_PERCENT: f64 = 1.0;
/// Smallest field height, in image pixels.
pub const MIN_HEIGHT_PX: f64 = 8.0;
/// Smallest checkbox/radio side, in image pixels.
pub const MIN_BOOLEAN_SIZE_PX: f64 = 8.0;
