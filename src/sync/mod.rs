//! Category synchronization against the record store.
//!
//! The [`SyncCoordinator`] owns the in-memory category cache and serializes
//! every mutation against it: network calls run outside the cache lock, the
//! cache is updated in one atomic step after the store confirms, and a full
//! reload that raced a local mutation is discarded rather than applied.

mod coordinator;

pub use coordinator::SyncCoordinator;
