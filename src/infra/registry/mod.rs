pub mod in_memory;
pub mod json_store;

pub use in_memory::InMemoryRegistryStore;
pub use json_store::JsonRegistryStore;
