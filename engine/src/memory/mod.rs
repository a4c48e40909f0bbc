//! In-process backends.
//!
//! [`MemoryStore`] and [`MemoryCache`] implement the storage seams without
//! any external service. They back the test suites and can be selected at
//! runtime with a `memory://` connection URL.

mod cache;
pub mod filter;
pub mod glob;
mod store;
pub mod update;

pub use cache::MemoryCache;
pub use store::MemoryStore;
