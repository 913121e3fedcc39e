#![deny(missing_docs)]

//! # Reference Counter
//!
//! Tracks how many dereferences of each pointer are currently in flight, so
//! that a `$ref` met again while its target is still being expanded can be
//! reported as circular instead of recursed into.
//!
//! Visits are normally held through a [`RefGuard`], which exits the pointer
//! when dropped. Traversal is strictly nested, so the counts follow a stack
//! discipline and are not meant to be shared between concurrent resolutions.

use std::cell::RefCell;
use std::collections::BTreeMap;

/// In-flight dereference depth per pointer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefCounter {
    counter: BTreeMap<String, usize>,
}

impl RefCounter {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `pointer`.
    pub fn visit(&mut self, pointer: &str) {
        *self.counter.entry(pointer.to_string()).or_insert(0) += 1;
    }

    /// Decrements the count for `pointer`, never going below zero.
    pub fn exit(&mut self, pointer: &str) {
        if let Some(count) = self.counter.get_mut(pointer) {
            *count = count.saturating_sub(1);
        }
    }

    /// Whether `pointer` is currently being dereferenced.
    pub fn visited(&self, pointer: &str) -> bool {
        self.count(pointer) > 0
    }

    /// Current count for `pointer`.
    pub fn count(&self, pointer: &str) -> usize {
        self.counter.get(pointer).copied().unwrap_or(0)
    }

    /// Pointers whose visits were never exited, in pointer order.
    pub fn unbalanced(&self) -> Vec<String> {
        self.counter
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(pointer, _)| pointer.clone())
            .collect()
    }

    /// Clears every count.
    ///
    /// In debug builds, pointers still holding a positive count are logged and
    /// returned; release builds skip the check and always return an empty list.
    pub fn reset(&mut self) -> Vec<String> {
        let pending = if cfg!(debug_assertions) {
            self.unbalanced()
        } else {
            Vec::new()
        };
        for pointer in &pending {
            tracing::warn!("Not exited reference: {}", pointer);
        }
        self.counter.clear();
        pending
    }
}

/// A held visit of one pointer. Dropping the guard exits the pointer.
#[derive(Debug)]
#[must_use = "dropping the guard immediately exits the reference"]
pub struct RefGuard<'a> {
    counter: &'a RefCell<RefCounter>,
    pointer: String,
}

impl<'a> RefGuard<'a> {
    /// Visits `pointer` and returns the guard that will exit it.
    pub fn acquire(counter: &'a RefCell<RefCounter>, pointer: &str) -> Self {
        counter.borrow_mut().visit(pointer);
        Self {
            counter,
            pointer: pointer.to_string(),
        }
    }

    /// The pointer this guard holds.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Keeps the visit open and hands the pointer back; the caller becomes
    /// responsible for exiting it.
    pub fn into_manual(self) -> String {
        let pointer = self.pointer.clone();
        std::mem::forget(self);
        pointer
    }
}

impl Drop for RefGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut counter) = self.counter.try_borrow_mut() {
            counter.exit(&self.pointer);
        }
    }
}
