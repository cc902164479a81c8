//! Manual ordering of a day list.
//!
//! A day list interleaves tasks and sections. Dragging an item splices the
//! list locally; the new positions are then written back as `order` values.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Section,
}

/// Reference to one entry of a day list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: i32,
}

impl ItemRef {
    pub fn task(id: i32) -> Self {
        Self {
            kind: ItemKind::Task,
            id,
        }
    }

    pub fn section(id: i32) -> Self {
        Self {
            kind: ItemKind::Section,
            id,
        }
    }
}

/// Anything that sits in a day list.
pub trait Ordered {
    fn item_ref(&self) -> ItemRef;
    fn order(&self) -> i32;
}

/// Which half of the hovered item the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

/// Moves the element at `drag_index` so it ends up at `hover_index`.
///
/// Other elements keep their relative order. Returns `false` and leaves the
/// list untouched when either index is out of range.
pub fn move_item<T>(items: &mut Vec<T>, drag_index: usize, hover_index: usize) -> bool {
    if drag_index >= items.len() || hover_index >= items.len() {
        return false;
    }
    if drag_index != hover_index {
        let item = items.remove(drag_index);
        items.insert(hover_index, item);
    }
    true
}

/// Upper half of the hovered box means "before", lower half "after".
pub fn drop_position(pointer_y: f64, rect_top: f64, rect_height: f64) -> DropPosition {
    let middle = rect_top + rect_height / 2.0;
    if pointer_y < middle {
        DropPosition::Before
    } else {
        DropPosition::After
    }
}

/// Drag guard: only move once the pointer has crossed the hovered item's
/// midpoint in the direction of travel.
pub fn should_move(drag_index: usize, hover_index: usize, position: DropPosition) -> bool {
    match drag_index.cmp(&hover_index) {
        Ordering::Equal => false,
        Ordering::Less => position == DropPosition::After,
        Ordering::Greater => position == DropPosition::Before,
    }
}

/// Order writes needed so that each item's stored order equals its index.
///
/// Items already in place are skipped.
pub fn assign_orders<T: Ordered>(items: &[T]) -> Vec<(ItemRef, i32)> {
    items
        .iter()
        .enumerate()
        .filter(|(index, item)| item.order() != *index as i32)
        .map(|(index, item)| (item.item_ref(), index as i32))
        .collect()
}

/// Stable sort used for every day list: by order, tasks before sections on
/// ties, then by id.
pub fn sort_day_list<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| {
        let r = item.item_ref();
        (item.order(), r.kind == ItemKind::Section, r.id)
    });
}

/// Returns the first duplicated ref, if any.
pub fn find_duplicate(refs: &[ItemRef]) -> Option<ItemRef> {
    let mut seen = std::collections::HashSet::new();
    refs.iter().copied().find(|r| !seen.insert(*r))
}
