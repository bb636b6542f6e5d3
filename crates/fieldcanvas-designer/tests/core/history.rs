use fieldcanvas_designer::history::UndoRedoManager;
use proptest::prelude::*;

#[test]
fn test_undo_redo_manager_creation() {
    let manager: UndoRedoManager<u32> = UndoRedoManager::new(20);
    assert!(!manager.can_undo());
    assert!(!manager.can_redo());
    assert_eq!(manager.undo_depth(), 0);
    assert_eq!(manager.redo_depth(), 0);
}

#[test]
fn test_depth_is_bounded() {
    let mut manager = UndoRedoManager::new(3);
    for state in 0..10 {
        manager.record(state);
    }
    assert_eq!(manager.undo_depth(), 3);
    assert_eq!(manager.undo(10), Some(9));
    assert_eq!(manager.undo(9), Some(8));
    assert_eq!(manager.undo(8), Some(7));
    assert_eq!(manager.undo(7), None);
}

#[test]
fn test_map_snapshots_reaches_both_stacks() {
    let mut manager = UndoRedoManager::new(10);
    manager.record(vec![1, 2]);
    manager.record(vec![1, 2, 3]);
    let _ = manager.undo(vec![1, 2, 3, 4]);
    manager.map_snapshots(|s| s.retain(|v| *v != 2));
    assert_eq!(manager.redo(vec![]), Some(vec![1, 3, 4]));
    assert_eq!(manager.undo(vec![]), Some(vec![]));
    assert_eq!(manager.undo(vec![]), Some(vec![1]));
}

proptest! {
    /// Undoing N recorded steps returns the first state; redoing them all
    /// returns the last.
    #[test]
    fn prop_undo_then_redo_round_trips(steps in 1usize..20) {
        let mut manager = UndoRedoManager::new(50);
        let mut current = 0usize;
        for next in 1..=steps {
            manager.record(current);
            current = next;
        }
        let last = current;
        while let Some(previous) = manager.undo(current) {
            current = previous;
        }
        prop_assert_eq!(current, 0);
        while let Some(next) = manager.redo(current) {
            current = next;
        }
        prop_assert_eq!(current, last);
    }
}
