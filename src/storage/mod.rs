pub mod file_store;
pub mod memory;

use crate::common::Result;

pub use file_store::FileStore;
pub use memory::MemoryStore;

/// Synchronous key-value store used to hand the captured image to the
/// submission step.
pub trait ImageStore {
    /// Insert or overwrite `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}
