//! Field store for the placement canvas.
//!
//! Holds every field of the template in z-order (insertion order, last is
//! topmost) together with the active page. All model mutations go through
//! here.

mod operations;
mod types;

pub use operations::percent_rect;
pub use types::{ImageSize, Point, Rect, Size};

use fieldcanvas_core::{Field, FieldId, FieldKey, LocalId, TemplateRecord};

/// Ordered field collection plus page state.
#[derive(Debug, Clone)]
pub struct Canvas {
    fields: Vec<Field>,
    page: u32,
    page_count: u32,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            page: 0,
            page_count: 1,
        }
    }

    pub fn from_template(record: TemplateRecord) -> Self {
        Self {
            fields: record.fields,
            page: 0,
            page_count: record.page_count.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Switches the active page. Returns false when out of range.
    pub fn set_page(&mut self, page: u32) -> bool {
        if page >= self.page_count {
            return false;
        }
        self.page = page;
        true
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields on every page, bottom to top.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields on the active page, bottom to top.
    pub fn page_fields(&self) -> impl DoubleEndedIterator<Item = &Field> {
        let page = self.page;
        self.fields.iter().filter(move |f| f.page == page)
    }

    pub fn get(&self, key: FieldKey) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn get_mut(&mut self, key: FieldKey) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.key == key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.get(key).is_some()
    }

    /// Adds a field on top. Replaces an existing field with the same key.
    pub fn insert(&mut self, field: Field) {
        if let Some(existing) = self.get_mut(field.key) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
    }

    pub fn remove(&mut self, key: FieldKey) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.key == key)?;
        Some(self.fields.remove(index))
    }

    /// Replaces a field in place, keeping its z-order. Returns the old value.
    pub fn replace(&mut self, field: Field) -> Option<Field> {
        let slot = self.get_mut(field.key)?;
        Some(std::mem::replace(slot, field))
    }

    /// Readdresses a local field by its durable id.
    pub fn rekey(&mut self, local: LocalId, id: FieldId) -> bool {
        match self.get_mut(FieldKey::Local(local)) {
            Some(field) => {
                field.key = FieldKey::Remote(id);
                true
            }
            None => false,
        }
    }

    /// Deep copy of the whole model.
    pub fn snapshot(&self) -> Vec<Field> {
        self.fields.clone()
    }

    pub fn restore(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}
