pub mod json_file_store;
pub mod memory_store;

pub use json_file_store::JsonFilePreferenceStore;
pub use memory_store::InMemoryPreferenceStore;
