//! speakdrill-store — attempt history stores.
//!
//! Implements the `HistoryStore` trait over an append-only JSON-lines file
//! and over memory.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlHistoryStore;
pub use memory::MemoryHistoryStore;
