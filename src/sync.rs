//! An optional, additive concurrency adapter.
//!
//! `SyncIndex<I>` is not a fourth index implementation: it wraps any of
//! the core's single-threaded types in a `parking_lot::RwLock`,
//! serializing writers while admitting concurrent readers, the same
//! layering a production routing-table crate uses to add thread-safety
//! on top of a single-threaded tree rather than rewriting the tree
//! itself to be lock-free.

use parking_lot::RwLock;

/// Thread-safe wrapper around any core index type `I`.
///
/// Readers take the read side of the lock and may run concurrently with
/// each other; writers (`insert`/`delete`) take the write side and
/// exclude everyone else for the duration of the call.
pub struct SyncIndex<I> {
    inner: RwLock<I>,
}

impl<I> SyncIndex<I> {
    pub fn new(index: I) -> Self {
        SyncIndex {
            inner: RwLock::new(index),
        }
    }

    /// Run a read-only closure under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a mutating closure under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut I) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Consume the adapter, returning the inner index.
    pub fn into_inner(self) -> I {
        self.inner.into_inner()
    }
}
