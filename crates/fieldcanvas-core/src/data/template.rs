//! Template-level records returned by the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::Field;

/// Backend identifier of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u64);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {}", self.0)
    }
}

/// A template with all of its durable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
}

fn default_page_count() -> u32 {
    1
}

impl TemplateRecord {
    pub fn fields_on_page(&self, page: u32) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.page == page)
    }
}

/// Calibrated content rectangle of a page, in percent of the page image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CalibrationRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}
