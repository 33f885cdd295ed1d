//! Persistent store for execution check-in records.
//!
//! One JSON document holds every `ExecutionRecord`, loaded fully at startup
//! and overwritten wholesale after each mutation. The `StoreBackend` seam
//! keeps production on the file backend and tests on plain memory.

pub mod backend;
pub mod model;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StoreBackend, StoreError};
pub use model::{ExecutionFields, ExecutionRecord};
pub use store::ExecutionStore;

#[cfg(test)]
mod tests;
