//! Drag-and-drop reordering for ordered lists.
//!
//! Indices arrive from UI drop handlers as signed integers; `-1` is the "not found" sentinel and
//! always produces a no-op.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index sentinel reported by drop handlers when the dragged or target item is unknown.
pub const NOT_FOUND: isize = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Side of the drop target the dragged item was released on.
pub enum DropEdge {
    /// Above the target.
    Top,
    /// Left of the target.
    Left,
    /// Below the target.
    Bottom,
    /// Right of the target.
    Right,
}

impl DropEdge {
    /// Returns `true` for edges that place the moved item before the target.
    pub fn inserts_before(self) -> bool {
        matches!(self, Self::Top | Self::Left)
    }

    /// Wire name of the edge.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Left => "left",
            Self::Bottom => "bottom",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for DropEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DropEdge {
    type Err = ReorderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "top" => Ok(Self::Top),
            "left" => Ok(Self::Left),
            "bottom" => Ok(Self::Bottom),
            "right" => Ok(Self::Right),
            other => Err(ReorderError::UnknownEdge(other.to_string())),
        }
    }
}

/// Reorder request failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReorderError {
    /// An index other than [`NOT_FOUND`] fell outside the list.
    #[error("index {index} is out of bounds for a list of {len} items")]
    IndexOutOfBounds {
        /// Offending index.
        index: isize,
        /// List length.
        len: usize,
    },
    /// A drop edge name was not recognized.
    #[error("unknown drop edge `{0}`")]
    UnknownEdge(String),
}

/// Items that carry a stable id and an integer display order.
pub trait Ordered {
    /// Identifier type.
    type Id: PartialEq + Clone;

    /// Stable identifier.
    fn id(&self) -> &Self::Id;

    /// Current display order.
    fn order(&self) -> i64;

    /// Replaces the display order.
    fn set_order(&mut self, order: i64);
}

fn checked_index(index: isize, len: usize) -> Result<usize, ReorderError> {
    usize::try_from(index)
        .ok()
        .filter(|index| *index < len)
        .ok_or(ReorderError::IndexOutOfBounds { index, len })
}

/// Moves or swaps an item and returns the new list.
///
/// With an edge, the item at `from` is removed and reinserted before (`top`/`left`) or after
/// (`bottom`/`right`) the item originally at `to`. Without an edge the two items swap places.
/// Either index being [`NOT_FOUND`], or `from == to`, returns the list unchanged.
///
/// # Errors
///
/// Returns [`ReorderError::IndexOutOfBounds`] for any other index outside `0..list.len()`.
pub fn try_reorder<T: Clone>(
    list: &[T],
    from: isize,
    to: isize,
    edge: Option<DropEdge>,
) -> Result<Vec<T>, ReorderError> {
    if from == NOT_FOUND || to == NOT_FOUND || from == to {
        return Ok(list.to_vec());
    }
    let from = checked_index(from, list.len())?;
    let to = checked_index(to, list.len())?;

    let mut items = list.to_vec();
    match edge {
        None => items.swap(from, to),
        Some(edge) => {
            let item = items.remove(from);
            // `to` shifts left by one when the removed item sat before it.
            let target = if from < to { to - 1 } else { to };
            let insert_at = if edge.inserts_before() {
                target
            } else {
                target + 1
            };
            items.insert(insert_at, item);
        }
    }
    Ok(items)
}

/// Infallible form of [`try_reorder`].
///
/// Out-of-bounds indices are a caller bug: debug builds assert, release builds log and return the
/// list unchanged.
pub fn reorder<T: Clone>(list: &[T], from: isize, to: isize, edge: Option<DropEdge>) -> Vec<T> {
    match try_reorder(list, from, to, edge) {
        Ok(items) => items,
        Err(err) => {
            debug_assert!(false, "reorder called with invalid indices: {err}");
            tracing::warn!(%err, "ignoring reorder with invalid indices");
            list.to_vec()
        }
    }
}

/// Returns a copy of `list` with orders rewritten to `1..=n` by position.
pub fn resequence<T: Ordered + Clone>(list: &[T]) -> Vec<T> {
    let mut items = list.to_vec();
    resequence_in_place(&mut items);
    items
}

/// Rewrites orders to `1..=n` by position.
pub fn resequence_in_place<T: Ordered>(list: &mut [T]) {
    for (item, order) in list.iter_mut().zip(1_i64..) {
        item.set_order(order);
    }
}

/// Stable sort by display order.
pub fn sort_by_order<T: Ordered>(list: &mut [T]) {
    list.sort_by_key(|item| item.order());
}

/// Position of the item with `id`, or [`NOT_FOUND`].
pub fn position_of<T: Ordered>(list: &[T], id: &T::Id) -> isize {
    list.iter()
        .position(|item| item.id() == id)
        .and_then(|index| isize::try_from(index).ok())
        .unwrap_or(NOT_FOUND)
}

/// Ids and new orders of items in `after` whose order differs from `before` or that are new.
///
/// Callers persist only these entries after a reorder.
pub fn changed_orders<T: Ordered>(before: &[T], after: &[T]) -> Vec<(T::Id, i64)> {
    after
        .iter()
        .filter(|item| {
            before
                .iter()
                .find(|previous| previous.id() == item.id())
                .map_or(true, |previous| previous.order() != item.order())
        })
        .map(|item| (item.id().clone(), item.order()))
        .collect()
}

/// Moves the item at `from` in `source` into `target`, returning both lists resequenced.
///
/// `to == NOT_FOUND` appends to `target`. Otherwise the item lands before the target index, or
/// after it for `bottom`/`right` edges. `from == NOT_FOUND` returns both lists unchanged.
///
/// # Errors
///
/// Returns [`ReorderError::IndexOutOfBounds`] for indices outside either list.
pub fn move_between<T: Ordered + Clone>(
    source: &[T],
    target: &[T],
    from: isize,
    to: isize,
    edge: Option<DropEdge>,
) -> Result<(Vec<T>, Vec<T>), ReorderError> {
    if from == NOT_FOUND {
        return Ok((source.to_vec(), target.to_vec()));
    }
    let from = checked_index(from, source.len())?;

    let mut source = source.to_vec();
    let mut target = target.to_vec();
    let insert_at = if to == NOT_FOUND {
        target.len()
    } else {
        let to = checked_index(to, target.len())?;
        match edge {
            Some(edge) if !edge.inserts_before() => to + 1,
            _ => to,
        }
    };

    let item = source.remove(from);
    target.insert(insert_at, item);
    resequence_in_place(&mut source);
    resequence_in_place(&mut target);
    Ok((source, target))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: &'static str,
        order: i64,
    }

    impl Ordered for Item {
        type Id = &'static str;

        fn id(&self) -> &Self::Id {
            &self.id
        }

        fn order(&self) -> i64 {
            self.order
        }

        fn set_order(&mut self, order: i64) {
            self.order = order;
        }
    }

    fn items(ids: &[&'static str]) -> Vec<Item> {
        ids.iter()
            .zip(1_i64..)
            .map(|(id, order)| Item { id, order })
            .collect()
    }

    fn ids(list: &[Item]) -> Vec<&'static str> {
        list.iter().map(|item| item.id).collect()
    }

    const ABCD: [&str; 4] = ["A", "B", "C", "D"];

    #[test]
    fn edge_moves_insert_relative_to_original_target() {
        let list = ABCD.to_vec();
        assert_eq!(reorder(&list, 0, 2, Some(DropEdge::Top)), vec!["B", "A", "C", "D"]);
        assert_eq!(reorder(&list, 0, 2, Some(DropEdge::Bottom)), vec!["B", "C", "A", "D"]);
        assert_eq!(reorder(&list, 3, 0, Some(DropEdge::Left)), vec!["D", "A", "B", "C"]);
        assert_eq!(reorder(&list, 3, 0, Some(DropEdge::Right)), vec!["A", "D", "B", "C"]);
        assert_eq!(reorder(&list, 0, 3, Some(DropEdge::Bottom)), vec!["B", "C", "D", "A"]);
    }

    #[test]
    fn missing_edge_swaps_items() {
        let list = ABCD.to_vec();
        assert_eq!(reorder(&list, 0, 2, None), vec!["C", "B", "A", "D"]);
        assert_eq!(reorder(&list, 3, 1, None), vec!["A", "D", "C", "B"]);
    }

    #[test]
    fn sentinel_and_equal_indices_are_no_ops() {
        let list = ABCD.to_vec();
        assert_eq!(reorder(&list, NOT_FOUND, 1, Some(DropEdge::Top)), list);
        assert_eq!(reorder(&list, 1, NOT_FOUND, None), list);
        assert_eq!(reorder(&list, 2, 2, Some(DropEdge::Bottom)), list);
    }

    #[test]
    fn reorder_preserves_the_element_multiset() {
        let list = ABCD.to_vec();
        for from in 0..4 {
            for to in 0..4 {
                for edge in [None, Some(DropEdge::Top), Some(DropEdge::Bottom)] {
                    let mut moved = reorder(&list, from, to, edge);
                    assert_eq!(moved.len(), list.len());
                    moved.sort_unstable();
                    assert_eq!(moved, list);
                }
            }
        }
    }

    #[test]
    fn try_reorder_reports_out_of_bounds_indices() {
        let list = ABCD.to_vec();
        assert_eq!(
            try_reorder(&list, 4, 0, None),
            Err(ReorderError::IndexOutOfBounds { index: 4, len: 4 })
        );
        assert_eq!(
            try_reorder(&list, 0, -2, Some(DropEdge::Top)),
            Err(ReorderError::IndexOutOfBounds { index: -2, len: 4 })
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reorder called with invalid indices")]
    fn reorder_asserts_on_out_of_bounds_in_debug_builds() {
        let _ = reorder(&ABCD.to_vec(), 0, 9, None);
    }

    #[test]
    fn resequence_yields_orders_from_one() {
        let moved = reorder(&items(&ABCD), 0, 2, Some(DropEdge::Bottom));
        let resequenced = resequence(&moved);
        assert_eq!(ids(&resequenced), vec!["B", "C", "A", "D"]);
        assert_eq!(
            resequenced.iter().map(Ordered::order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn resequence_ignores_duplicate_negative_and_gapped_orders() {
        let list = vec![
            Item { id: "x", order: 7 },
            Item { id: "y", order: -3 },
            Item { id: "z", order: 7 },
        ];
        let resequenced = resequence(&list);
        assert_eq!(ids(&resequenced), vec!["x", "y", "z"]);
        assert_eq!(
            resequenced.iter().map(Ordered::order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn changed_orders_lists_only_moved_items() {
        let before = items(&ABCD);
        let after = resequence(&reorder(&before, 0, 1, Some(DropEdge::Bottom)));
        assert_eq!(ids(&after), vec!["B", "A", "C", "D"]);
        assert_eq!(changed_orders(&before, &after), vec![("B", 1), ("A", 2)]);
    }

    #[test]
    fn sort_by_order_is_stable_and_position_of_uses_ids() {
        let mut list = vec![
            Item { id: "x", order: 2 },
            Item { id: "y", order: 0 },
            Item { id: "z", order: 2 },
        ];
        sort_by_order(&mut list);
        assert_eq!(ids(&list), vec!["y", "x", "z"]);
        assert_eq!(position_of(&list, &"z"), 2);
        assert_eq!(position_of(&list, &"missing"), NOT_FOUND);
    }

    #[test]
    fn move_between_transfers_and_resequences_both_lists() {
        let source = items(&["A", "B", "C"]);
        let target = items(&["X", "Y"]);

        let (source_after, target_after) =
            move_between(&source, &target, 1, 0, Some(DropEdge::Bottom)).expect("move");
        assert_eq!(ids(&source_after), vec!["A", "C"]);
        assert_eq!(ids(&target_after), vec!["X", "B", "Y"]);
        assert_eq!(
            target_after.iter().map(Ordered::order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let (_, appended) = move_between(&source, &target, 0, NOT_FOUND, None).expect("append");
        assert_eq!(ids(&appended), vec!["X", "Y", "A"]);

        assert_eq!(
            move_between(&source, &target, 5, 0, None),
            Err(ReorderError::IndexOutOfBounds { index: 5, len: 3 })
        );
    }

    #[test]
    fn drop_edge_parses_wire_names() {
        assert_eq!("bottom".parse::<DropEdge>(), Ok(DropEdge::Bottom));
        assert_eq!(DropEdge::Left.to_string(), "left");
        assert_eq!(
            "middle".parse::<DropEdge>(),
            Err(ReorderError::UnknownEdge("middle".to_string()))
        );
    }
}
