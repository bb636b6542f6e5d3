//! Partial field records.
//!
//! A `FieldPatch` names only the attributes it changes. It is the unit of
//! every local mutation intent and every remote write. Nullable string
//! attributes use `Option<Option<String>>` so a patch can clear them.

use serde::{Deserialize, Deserializer, Serialize};

use super::field::{Field, FieldId, FieldType, LocalId, TextAlign};

macro_rules! with_attributes {
    ($m:ident!($($args:tt)*)) => {
        $m!($($args)*;
            page, field_type, x, y, width, height, font_family, font_size, color, alignment,
            line_height, line_count, first_line_indent, text, checked, group_id, option_value,
            options, category, display_name, description, example)
    };
}

macro_rules! apply_attrs {
    ($patch:expr, $field:expr; $($name:ident),*) => {
        $( if let Some(v) = &$patch.$name { $field.$name = v.clone(); } )*
    };
}

macro_rules! merge_attrs {
    ($dst:expr, $newer:expr; $($name:ident),*) => {
        $( if let Some(v) = $newer.$name { $dst.$name = Some(v); } )*
    };
}

macro_rules! diff_attrs {
    ($old:expr, $new:expr, $out:expr; $($name:ident),*) => {
        $( if $old.$name != $new.$name { $out.$name = Some($new.$name.clone()); } )*
    };
}

macro_rules! full_attrs {
    ($field:expr; $($name:ident),*) => {
        FieldPatch { $( $name: Some($field.$name.clone()), )* }
    };
}

macro_rules! empty_attrs {
    ($patch:expr; $($name:ident),*) => {
        true $( && $patch.$name.is_none() )*
    };
}

fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// All-optional partial field record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line_indent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub group_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub option_value: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub options: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub display_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub example: Option<Option<String>>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch carrying every attribute of `field`.
    pub fn from_field(field: &Field) -> Self {
        with_attributes!(full_attrs!(field))
    }

    /// Patch that turns `old` into `new`, or an empty patch when they match.
    pub fn between(old: &Field, new: &Field) -> Self {
        let mut patch = FieldPatch::default();
        with_attributes!(diff_attrs!(old, new, patch));
        patch
    }

    /// Position-only patch.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Size-only patch.
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Layers `newer` on top of this patch, last write wins per attribute.
    pub fn merge(&mut self, newer: FieldPatch) {
        with_attributes!(merge_attrs!(self, newer));
    }

    pub fn merged(mut self, newer: FieldPatch) -> Self {
        self.merge(newer);
        self
    }

    pub fn apply_to(&self, field: &mut Field) {
        with_attributes!(apply_attrs!(self, field));
    }

    pub fn is_empty(&self) -> bool {
        with_attributes!(empty_attrs!(self))
    }

    pub fn touches_geometry(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }

    /// Finite check over every numeric attribute present.
    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.width,
            self.height,
            self.font_size,
            self.line_height,
            self.first_line_indent,
        ]
        .iter()
        .flatten()
        .all(|v| v.is_finite())
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPayload {
    pub local_id: LocalId,
    #[serde(flatten)]
    pub attributes: FieldPatch,
}

impl FieldPayload {
    pub fn from_field(local_id: LocalId, field: &Field) -> Self {
        Self {
            local_id,
            attributes: FieldPatch::from_field(field),
        }
    }
}

/// Backend echo of a created or updated field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldId>,
    #[serde(flatten)]
    pub echo: FieldPatch,
}
