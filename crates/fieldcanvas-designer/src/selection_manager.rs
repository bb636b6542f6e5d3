use fieldcanvas_core::{Field, FieldId, FieldKey, LocalId};

use crate::canvas::{ImageSize, Point, Rect};

/// Current selection.
///
/// Single selection and multi-select mode are mutually exclusive. `Multi`
/// keeps selection order and never holds duplicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    None,
    Single(FieldKey),
    Multi(Vec<FieldKey>),
}

/// Manages field selection state and selection operations.
///
/// `SelectionManager` is responsible for:
/// - Tracking the single selected field
/// - Multi-select membership (tap to toggle, marquee, row/column/group)
/// - Keeping keys current when a local field receives its durable id
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selection: Selection,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected keys in selection order.
    pub fn selected(&self) -> Vec<FieldKey> {
        match &self.selection {
            Selection::None => Vec::new(),
            Selection::Single(key) => vec![*key],
            Selection::Multi(keys) => keys.clone(),
        }
    }

    pub fn single(&self) -> Option<FieldKey> {
        match self.selection {
            Selection::Single(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.selection, Selection::Multi(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.selection, Selection::None)
    }

    pub fn len(&self) -> usize {
        match &self.selection {
            Selection::None => 0,
            Selection::Single(_) => 1,
            Selection::Multi(keys) => keys.len(),
        }
    }

    pub fn is_selected(&self, key: FieldKey) -> bool {
        match &self.selection {
            Selection::None => false,
            Selection::Single(k) => *k == key,
            Selection::Multi(keys) => keys.contains(&key),
        }
    }

    /// Selects exactly one field, leaving multi-select mode.
    pub fn select(&mut self, key: FieldKey) {
        self.selection = Selection::Single(key);
    }

    /// Enters multi-select mode with the given keys.
    ///
    /// An empty list clears the selection.
    pub fn enter_multi(&mut self, keys: impl IntoIterator<Item = FieldKey>) {
        let mut unique: Vec<FieldKey> = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        self.selection = if unique.is_empty() {
            Selection::None
        } else {
            Selection::Multi(unique)
        };
    }

    /// Toggles membership of `key`, entering multi-select mode.
    ///
    /// A single selection is carried over as the first member. Removing the
    /// last member clears the selection.
    pub fn toggle_multi(&mut self, key: FieldKey) {
        let mut keys = self.selected();
        if let Some(index) = keys.iter().position(|k| *k == key) {
            keys.remove(index);
        } else {
            keys.push(key);
        }
        self.enter_multi(keys);
    }

    pub fn clear(&mut self) {
        self.selection = Selection::None;
    }

    /// Drops a key, e.g. after its field was deleted.
    pub fn remove(&mut self, key: FieldKey) {
        let emptied = match &mut self.selection {
            Selection::None => false,
            Selection::Single(k) => *k == key,
            Selection::Multi(keys) => {
                keys.retain(|k| *k != key);
                keys.is_empty()
            }
        };
        if emptied {
            self.selection = Selection::None;
        }
    }

    /// Drops every key not accepted by `keep`.
    pub fn retain(&mut self, keep: impl Fn(FieldKey) -> bool) {
        for key in self.selected() {
            if !keep(key) {
                self.remove(key);
            }
        }
    }

    pub fn rekey(&mut self, local: LocalId, id: FieldId) {
        let from = FieldKey::Local(local);
        let to = FieldKey::Remote(id);
        match &mut self.selection {
            Selection::Single(k) if *k == from => *k = to,
            Selection::Multi(keys) => {
                for k in keys.iter_mut().filter(|k| **k == from) {
                    *k = to;
                }
            }
            _ => {}
        }
    }
}

/// Fields whose center point lies inside a percent-space rectangle.
///
/// The rectangle is normalized first, so corner order does not matter. A
/// field that overlaps the rectangle but has its center outside is not
/// selected.
pub fn fields_in_marquee<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    rect: Rect,
    image: ImageSize,
) -> Vec<FieldKey> {
    let rect = Rect::from_corners(
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.bottom()),
    );
    fields
        .into_iter()
        .filter(|f| {
            let (cx, cy) = f.center_percent(image.height);
            rect.contains(Point::new(cx, cy))
        })
        .map(|f| f.key)
        .collect()
}

/// Fields whose `y` lies within `tolerance` percent of the reference's.
pub fn select_row<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    reference: &Field,
    tolerance: f64,
) -> Vec<FieldKey> {
    fields
        .into_iter()
        .filter(|f| f.page == reference.page && (f.y - reference.y).abs() <= tolerance)
        .map(|f| f.key)
        .collect()
}

/// Fields whose `x` lies within `tolerance` percent of the reference's.
pub fn select_column<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    reference: &Field,
    tolerance: f64,
) -> Vec<FieldKey> {
    fields
        .into_iter()
        .filter(|f| f.page == reference.page && (f.x - reference.x).abs() <= tolerance)
        .map(|f| f.key)
        .collect()
}

/// Fields sharing the reference's `group_id`. Empty when it has none.
pub fn select_group<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    reference: &Field,
) -> Vec<FieldKey> {
    let Some(group) = reference.group_id.as_deref() else {
        return Vec::new();
    };
    fields
        .into_iter()
        .filter(|f| f.group_id.as_deref() == Some(group))
        .map(|f| f.key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64) -> FieldKey {
        FieldKey::Remote(FieldId(id))
    }

    #[test]
    fn test_toggle_carries_single_over() {
        let mut manager = SelectionManager::new();
        manager.select(key(1));
        manager.toggle_multi(key(2));
        assert_eq!(manager.selection(), &Selection::Multi(vec![key(1), key(2)]));

        manager.toggle_multi(key(1));
        manager.toggle_multi(key(2));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_enter_multi_dedups() {
        let mut manager = SelectionManager::new();
        manager.enter_multi([key(1), key(2), key(1)]);
        assert_eq!(manager.len(), 2);
        manager.enter_multi(Vec::new());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_remove_and_rekey() {
        let mut manager = SelectionManager::new();
        let local = LocalId::new();
        manager.enter_multi([key(1), FieldKey::Local(local)]);
        manager.rekey(local, FieldId(5));
        assert!(manager.is_selected(key(5)));
        manager.remove(key(1));
        manager.remove(key(5));
        assert!(manager.is_empty());
    }
}
