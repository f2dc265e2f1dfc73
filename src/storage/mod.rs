pub mod store;

pub use store::{FileStore, KeyValueStore, read_counter};
#[cfg(test)]
pub use store::MemoryStore;
