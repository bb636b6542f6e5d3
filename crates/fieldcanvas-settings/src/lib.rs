//! FieldCanvas Settings Crate
//!
//! Tunables for the placement canvas and their JSON/TOML persistence.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, CanvasConfig, FieldDefaults, FocusSettings, GestureSettings,
    PersistenceSettings, SelectionSettings, ZoomSettings,
};
pub use error::{SettingsError, SettingsResult};
