//! Canvas configuration
//!
//! Every tunable of the placement canvas, grouped by the component that
//! reads it. Missing sections and keys fall back to their defaults.

use fieldcanvas_core::constants;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SettingsError, SettingsResult};

/// Pointer gesture thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// Hold time that arms a field drag or marquee
    pub long_press_ms: u64,
    /// Travel that aborts a pending long press, in viewport pixels
    pub long_press_tolerance_px: f64,
    /// Travel that marks a gesture consumed, in viewport pixels
    pub tap_slop_px: f64,
    /// Extra touch area around the selected field, in viewport pixels
    pub hit_slop_px: f64,
    /// Quiet period after a delete during which taps never create
    pub recent_delete_ms: u64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            long_press_ms: constants::LONG_PRESS_MS,
            long_press_tolerance_px: constants::LONG_PRESS_TOLERANCE_PX,
            tap_slop_px: constants::TAP_SLOP_PX,
            hit_slop_px: constants::HIT_SLOP_PX,
            recent_delete_ms: constants::RECENT_DELETE_MS,
        }
    }
}

impl GestureSettings {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn recent_delete(&self) -> Duration {
        Duration::from_millis(self.recent_delete_ms)
    }
}

/// Camera zoom limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Multiplier applied by one zoom button press
    pub step: f64,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min_scale: constants::MIN_SCALE,
            max_scale: constants::MAX_SCALE,
            step: constants::ZOOM_STEP,
        }
    }
}

/// Auto-recentering on selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
    /// Share of the viewport width a focused field should occupy
    pub width_fraction: f64,
    /// Same, for fields wider than `wide_field_threshold` of the document
    pub wide_field_fraction: f64,
    pub wide_field_threshold: f64,
    /// Cap on the share of the unobstructed band a field may fill
    pub max_height_fraction: f64,
    /// Where the field center lands, measured down the unobstructed band
    pub anchor_fraction: f64,
    /// Scale difference, relative to the current scale, under which a
    /// visible field is left alone
    pub skip_delta: f64,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: constants::FOCUS_DEBOUNCE_MS,
            width_fraction: constants::FOCUS_WIDTH_FRACTION,
            wide_field_fraction: constants::FOCUS_WIDE_FIELD_FRACTION,
            wide_field_threshold: constants::FOCUS_WIDE_FIELD_THRESHOLD,
            max_height_fraction: constants::FOCUS_MAX_HEIGHT_FRACTION,
            anchor_fraction: constants::FOCUS_ANCHOR_FRACTION,
            skip_delta: constants::FOCUS_SKIP_DELTA,
        }
    }
}

impl FocusSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Remote write pipeline and history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub update_debounce_ms: u64,
    /// How long finalize waits for in-flight creates
    pub create_timeout_ms: u64,
    pub undo_depth: usize,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            update_debounce_ms: constants::UPDATE_DEBOUNCE_MS,
            create_timeout_ms: constants::CREATE_TIMEOUT_MS,
            undo_depth: constants::UNDO_DEPTH,
        }
    }
}

impl PersistenceSettings {
    pub fn update_debounce(&self) -> Duration {
        Duration::from_millis(self.update_debounce_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }
}

/// Attributes of newly created fields and geometry floors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDefaults {
    pub font_family: String,
    pub font_size: f64,
    pub line_height: f64,
    pub color: String,
    /// Width of a tapped-in field, percent of the image width
    pub width_percent: f64,
    /// Offset of a duplicate from its source, image pixels
    pub duplicate_offset_px: f64,
    /// Side of a new checkbox/radio, image pixels
    pub boolean_size_px: f64,
    pub min_width_percent: f64,
    pub min_height_px: f64,
    pub min_boolean_size_px: f64,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            font_family: constants::DEFAULT_FONT_FAMILY.to_string(),
            font_size: constants::DEFAULT_FONT_SIZE,
            line_height: constants::DEFAULT_LINE_HEIGHT,
            color: constants::DEFAULT_COLOR.to_string(),
            width_percent: constants::DEFAULT_WIDTH_PERCENT,
            duplicate_offset_px: constants::DUPLICATE_OFFSET_PX,
            boolean_size_px: constants::DEFAULT_BOOLEAN_SIZE_PX,
            min_width_percent: constants::MIN_WIDTH_PERCENT,
            min_height_px: constants::MIN_HEIGHT_PX,
            min_boolean_size_px: constants::MIN_BOOLEAN_SIZE_PX,
        }
    }
}

/// Row/column selection tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub row_tolerance_percent: f64,
    pub column_tolerance_percent: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            row_tolerance_percent: constants::ROW_TOLERANCE_PERCENT,
            column_tolerance_percent: constants::COLUMN_TOLERANCE_PERCENT,
        }
    }
}

/// Complete canvas configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub gestures: GestureSettings,
    pub zoom: ZoomSettings,
    pub focus: FocusSettings,
    pub persistence: PersistenceSettings,
    pub field_defaults: FieldDefaults,
    pub selection: SelectionSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(SettingsError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::read(path, e))?;

        let config: Self = match format {
            Format::Json => {
                serde_json::from_str(&content).map_err(|e| SettingsError::parse(path, e))?
            }
            Format::Toml => toml::from_str(&content).map_err(|e| SettingsError::parse(path, e))?,
        };

        config.validate()?;
        tracing::info!("Loaded canvas config from {}", path.display());
        Ok(config)
    }

    /// Load config from file, or the defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| SettingsError::Encode(e.to_string()))?,
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| SettingsError::Encode(e.to_string()))?
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SettingsError::write(path, e))?;
            }
        }
        std::fs::write(path, content).map_err(|e| SettingsError::write(path, e))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let g = &self.gestures;
        if g.long_press_ms == 0 {
            return Err(SettingsError::invalid("gestures.long_press_ms", "must be > 0"));
        }
        if !(g.long_press_tolerance_px > 0.0 && g.tap_slop_px > 0.0 && g.hit_slop_px >= 0.0) {
            return Err(SettingsError::invalid(
                "gestures",
                "tolerances must be positive",
            ));
        }

        let z = &self.zoom;
        if !(z.min_scale > 0.0 && z.min_scale <= z.max_scale && z.max_scale.is_finite()) {
            return Err(SettingsError::invalid(
                "zoom",
                "need 0 < min_scale <= max_scale",
            ));
        }
        if z.step <= 1.0 {
            return Err(SettingsError::invalid("zoom.step", "must be > 1"));
        }

        let f = &self.focus;
        for (key, value) in [
            ("focus.width_fraction", f.width_fraction),
            ("focus.wide_field_fraction", f.wide_field_fraction),
            ("focus.wide_field_threshold", f.wide_field_threshold),
            ("focus.max_height_fraction", f.max_height_fraction),
            ("focus.anchor_fraction", f.anchor_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(SettingsError::invalid(key, "must be in (0, 1]"));
            }
        }
        if f.skip_delta < 0.0 {
            return Err(SettingsError::invalid("focus.skip_delta", "must be >= 0"));
        }

        let p = &self.persistence;
        if p.undo_depth == 0 {
            return Err(SettingsError::invalid("persistence.undo_depth", "must be > 0"));
        }
        if p.create_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "persistence.create_timeout_ms",
                "must be > 0",
            ));
        }

        let d = &self.field_defaults;
        if d.font_size <= 0.0 || d.line_height <= 0.0 {
            return Err(SettingsError::invalid(
                "field_defaults",
                "font size and line height must be > 0",
            ));
        }
        if !(d.width_percent > 0.0 && d.width_percent <= 100.0) {
            return Err(SettingsError::invalid(
                "field_defaults.width_percent",
                "must be in (0, 100]",
            ));
        }
        if d.min_width_percent <= 0.0 || d.min_height_px <= 0.0 || d.min_boolean_size_px <= 0.0 {
            return Err(SettingsError::invalid(
                "field_defaults",
                "minimum sizes must be > 0",
            ));
        }

        let s = &self.selection;
        if s.row_tolerance_percent < 0.0 || s.column_tolerance_percent < 0.0 {
            return Err(SettingsError::invalid("selection", "tolerances must be >= 0"));
        }

        Ok(())
    }
}

/// Default location of the user's canvas config
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("fieldcanvas").join("canvas.toml"))
        .ok_or(SettingsError::NoConfigDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CanvasConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gestures.long_press_ms, 550);
        assert_eq!(config.zoom.min_scale, 0.5);
        assert_eq!(config.zoom.max_scale, 4.0);
        assert_eq!(config.persistence.undo_depth, 20);
        assert_eq!(config.focus.anchor_fraction, 0.35);
    }

    #[test]
    fn test_invalid_zoom_rejected() {
        let mut config = CanvasConfig::default();
        config.zoom.min_scale = 5.0;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CanvasConfig = toml::from_str("[zoom]\nmax_scale = 3.0\n").unwrap();
        assert_eq!(config.zoom.max_scale, 3.0);
        assert_eq!(config.zoom.min_scale, 0.5);
        assert_eq!(config.gestures, GestureSettings::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let config = CanvasConfig::default();
        let err = config.save_to_file(Path::new("canvas.yaml")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedFormat { path } if path.ends_with("canvas.yaml")));
    }
}
