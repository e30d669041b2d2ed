// History module: bounded recency buffer and the shared store built on it.

pub mod buffer;
pub mod store;

pub use store::{HistoryStore, DEFAULT_CAPACITY};
