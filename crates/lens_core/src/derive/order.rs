//! Ordering helpers: stepper position and drag-and-reorder.

/// Index of `status` on a canonical progression, `None` when off-path.
pub fn step_index(status: &str, progression: &[&str]) -> Option<usize> {
    progression.iter().position(|step| *step == status)
}

/// True when the stepper should render `step` as reached for `status`.
pub fn step_reached(status: &str, step: &str, progression: &[&str]) -> bool {
    match (step_index(status, progression), step_index(step, progression)) {
        (Some(current), Some(target)) => target <= current,
        _ => false,
    }
}

/// Moves one element from `from` to `to`, shifting the ones in between.
///
/// Returns `false` and leaves `items` untouched when either index is out of
/// range.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{move_item, step_index, step_reached};

    const PERMIT: &[&str] = &["submitted", "under_review", "inspection", "approved"];

    #[test]
    fn stepper_compares_by_index() {
        assert_eq!(step_index("inspection", PERMIT), Some(2));
        assert!(step_reached("inspection", "under_review", PERMIT));
        assert!(!step_reached("under_review", "approved", PERMIT));
        assert!(!step_reached("denied", "submitted", PERMIT));
    }

    #[test]
    fn move_item_shifts_neighbours() {
        let mut items = vec!["a", "b", "c", "d"];
        assert!(move_item(&mut items, 0, 2));
        assert_eq!(items, vec!["b", "c", "a", "d"]);
        assert!(move_item(&mut items, 3, 0));
        assert_eq!(items, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn move_item_rejects_out_of_range() {
        let mut items = vec![1, 2];
        assert!(!move_item(&mut items, 0, 2));
        assert_eq!(items, vec![1, 2]);
    }
}
