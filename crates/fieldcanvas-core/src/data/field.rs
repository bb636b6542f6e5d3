//! Field records: the positioned, typed overlay elements of a template.
//!
//! `x`, `y` and `width` are percentages of the rendered image; `height` is in
//! image pixels. Checkbox and radio fields are kept square by converting
//! between the two with the image's pixel width.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants;

/// Durable, server-assigned field id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Client-assigned id for a field whose create has not completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub Uuid);

impl LocalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local:{}", &self.0.to_string()[..8])
    }
}

/// The one authoritative address of a field.
///
/// A field is addressed by its local id until the backend assigns a durable
/// id, then by the durable id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum FieldKey {
    Remote(FieldId),
    Local(LocalId),
}

impl FieldKey {
    pub fn new_local() -> Self {
        FieldKey::Local(LocalId::new())
    }

    pub fn remote_id(&self) -> Option<FieldId> {
        match self {
            FieldKey::Remote(id) => Some(*id),
            FieldKey::Local(_) => None,
        }
    }

    pub fn local_id(&self) -> Option<LocalId> {
        match self {
            FieldKey::Local(id) => Some(*id),
            FieldKey::Remote(_) => None,
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, FieldKey::Remote(_))
    }
}

impl From<FieldId> for FieldKey {
    fn from(id: FieldId) -> Self {
        FieldKey::Remote(id)
    }
}

impl From<LocalId> for FieldKey {
    fn from(id: LocalId) -> Self {
        FieldKey::Local(id)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Remote(id) => id.fmt(f),
            FieldKey::Local(id) => id.fmt(f),
        }
    }
}

/// Field semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Checkbox,
    Radio,
    Select,
}

impl FieldType {
    /// Checkbox and radio fields: square, single line, carry a checked state.
    pub fn is_boolean(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Checkbox => write!(f, "checkbox"),
            Self::Radio => write!(f, "radio"),
            Self::Select => write!(f, "select"),
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A positioned, typed, editable overlay element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: FieldKey,
    /// Zero-based page of the template this field sits on.
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub field_type: FieldType,

    /// Left edge, percent of image width.
    pub x: f64,
    /// Top edge, percent of image height.
    pub y: f64,
    /// Percent of image width.
    pub width: f64,
    /// Image pixels.
    pub height: f64,

    pub font_family: String,
    pub font_size: f64,
    pub color: String,
    #[serde(default)]
    pub alignment: TextAlign,
    /// Multiplier of the font size.
    pub line_height: f64,
    pub line_count: u32,
    #[serde(default)]
    pub first_line_indent: f64,

    /// Sample value shown and edited on the canvas.
    #[serde(default)]
    pub text: String,

    /// Default state of checkbox/radio fields.
    #[serde(default)]
    pub checked: bool,
    /// Radio exclusivity group.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub option_value: Option<String>,
    /// `|`-delimited select options.
    #[serde(default)]
    pub options: Option<String>,

    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl Field {
    /// Creates a text field with default typography at the given geometry.
    pub fn new(key: FieldKey, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            key,
            page: 0,
            field_type: FieldType::Text,
            x,
            y,
            width,
            height,
            font_family: constants::DEFAULT_FONT_FAMILY.to_string(),
            font_size: constants::DEFAULT_FONT_SIZE,
            color: constants::DEFAULT_COLOR.to_string(),
            alignment: TextAlign::Left,
            line_height: constants::DEFAULT_LINE_HEIGHT,
            line_count: 1,
            first_line_indent: 0.0,
            text: String::new(),
            checked: false,
            group_id: None,
            option_value: None,
            options: None,
            category: None,
            display_name: None,
            description: None,
            example: None,
        }
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Height expressed in percent of an image `image_height_px` tall.
    pub fn height_percent(&self, image_height_px: f64) -> f64 {
        if image_height_px <= 0.0 {
            return 0.0;
        }
        self.height / image_height_px * 100.0
    }

    /// Center point in percent space.
    pub fn center_percent(&self, image_height_px: f64) -> (f64, f64) {
        (
            self.x + self.width / 2.0,
            self.y + self.height_percent(image_height_px) / 2.0,
        )
    }

    /// Parsed select options, empty entries dropped.
    pub fn option_list(&self) -> Vec<&str> {
        self.options
            .as_deref()
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
