//! Persistence backend for the target.
//!
//! The shipping hardware keeps `settings.bin`, the preset slots and the
//! error log on a flash filesystem; that driver is an external collaborator
//! and mounts behind [`StorageBackend`]. Until it is wired in, reads report
//! missing files (the drive boots with validated defaults) and writes are
//! accepted and discarded, so runtime behaviour is unaffected.

use ttdrive::storage::{StorageBackend, StorageError};

// TODO: back this with the flash filesystem driver once it lands.
pub struct FlashStore;

impl FlashStore {
    pub const fn new() -> Self {
        Self
    }
}

impl StorageBackend for FlashStore {
    fn read(&mut self, _name: &str, _buf: &mut [u8]) -> Result<usize, StorageError> {
        Err(StorageError::NotFound)
    }

    fn write(&mut self, _name: &str, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    fn append(&mut self, _name: &str, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    fn size(&mut self, _name: &str) -> Option<usize> {
        None
    }

    fn remove(&mut self, _name: &str) -> Result<(), StorageError> {
        Err(StorageError::NotFound)
    }

    fn rename(&mut self, _from: &str, _to: &str) -> Result<(), StorageError> {
        Err(StorageError::NotFound)
    }

    fn exists(&mut self, _name: &str) -> bool {
        false
    }
}
