/// Bounded undo/redo over whole-model snapshots.
///
/// The caller records the state *before* each committed mutation. Undo and
/// redo trade the current state for a stored one, so every entry is a full
/// snapshot rather than a per-field diff.
#[derive(Debug, Clone)]
pub struct UndoRedoManager<S> {
    undo_stack: Vec<S>,
    redo_stack: Vec<S>,
    max_depth: usize,
}

impl<S: Clone> UndoRedoManager<S> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Records the pre-mutation state. Clears the redo stack.
    pub fn record(&mut self, before: S) {
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Returns the state to restore, stashing `current` for redo.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Returns the state to restore, stashing `current` for undo.
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Rewrites every stored snapshot, e.g. to swap a local key for its id.
    pub fn map_snapshots(&mut self, mut f: impl FnMut(&mut S)) {
        for snapshot in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            f(snapshot);
        }
    }
}
