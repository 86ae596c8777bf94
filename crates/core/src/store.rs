use crate::Result;

/// String key-value persistence, the same shape as a browser's local storage.
///
/// Implementations must be cheap to call from the poll loop; every successful
/// sample append triggers a write.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}
