//! Per-user crates: an ordered list of saved music references.
//!
//! `order[i]` holds the 1-based display position of `items[i]`. The two lists
//! always have the same length; after `normalize` the order is exactly
//! `1..=items.len()`.

mod store;

pub use store::CrateStore;

use crate::library::EntityKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrateItem {
    pub kind: EntityKind,
    pub entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crate {
    pub user_id: String,
    pub items: Vec<CrateItem>,
    pub order: Vec<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("order must be a permutation of 1..={expected_len}")]
pub struct InvalidOrder {
    pub expected_len: usize,
}

impl Crate {
    pub fn empty(user_id: String) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Appends the item with display position `max(order) + 1`. Duplicates are
    /// a no-op, reported by the return value.
    pub fn add_item(&mut self, item: CrateItem) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        let next_position = self.order.iter().max().copied().unwrap_or(0) + 1;
        self.items.push(item);
        self.order.push(next_position);
        true
    }

    /// Removes the item and its order entry. Every surviving position strictly
    /// greater than the removed one shifts down by one, preserving relative
    /// order.
    pub fn remove_item(&mut self, item: &CrateItem) -> bool {
        let index = match self.items.iter().position(|i| i == item) {
            Some(index) => index,
            None => return false,
        };
        let removed_position = self.order.remove(index);
        self.items.remove(index);
        for position in self.order.iter_mut() {
            if *position > removed_position {
                *position -= 1;
            }
        }
        true
    }

    /// Replaces the order wholesale. Rejects anything that is not a
    /// permutation of `1..=items.len()`, leaving the crate untouched.
    pub fn reorder(&mut self, new_order: Vec<usize>) -> Result<(), InvalidOrder> {
        if !is_permutation(&new_order, self.items.len()) {
            return Err(InvalidOrder {
                expected_len: self.items.len(),
            });
        }
        self.order = new_order;
        Ok(())
    }

    /// Reprojects `items` into display order and resets `order` to `1..=N`.
    pub fn normalize(&mut self) {
        let mut indexed: Vec<(usize, CrateItem)> = self
            .order
            .iter()
            .copied()
            .zip(self.items.drain(..))
            .collect();
        indexed.sort_by_key(|(position, _)| *position);
        self.items = indexed.into_iter().map(|(_, item)| item).collect();
        self.order = (1..=self.items.len()).collect();
    }

    /// Items in display order, without mutating the crate.
    pub fn items_in_order(&self) -> Vec<&CrateItem> {
        let mut indexed: Vec<(usize, &CrateItem)> = self
            .order
            .iter()
            .copied()
            .zip(self.items.iter())
            .collect();
        indexed.sort_by_key(|(position, _)| *position);
        indexed.into_iter().map(|(_, item)| item).collect()
    }
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &position in order {
        if position < 1 || position > len || seen[position - 1] {
            return false;
        }
        seen[position - 1] = true;
    }
    true
}
