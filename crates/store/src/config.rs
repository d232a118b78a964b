//! Store configuration

use std::path::PathBuf;

/// Configuration for the persistent store adapter
#[derive(Clone)]
pub struct StoreConfig {
    /// Directory for store data
    pub data_dir: PathBuf,

    /// Block cache size for fjall (in bytes)
    pub block_cache_size: u64,

    /// Compression type for table partitions
    pub compression: fjall::CompressionType,

    /// Persist mode used when committing batches
    pub persist_mode: fjall::PersistMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        // Use tempfile to create a proper temporary directory.
        // Using .keep() to persist the directory (won't be auto-deleted).
        let temp_dir = tempfile::tempdir()
            .expect("Failed to create temporary directory")
            .keep();

        Self {
            data_dir: temp_dir,
            block_cache_size: 32 * 1024 * 1024, // 32 MB
            compression: fjall::CompressionType::Lz4,
            persist_mode: fjall::PersistMode::Buffer,
        }
    }
}

impl StoreConfig {
    /// Create a new config with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Set block cache size
    pub fn with_block_cache_size(mut self, size: u64) -> Self {
        self.block_cache_size = size;
        self
    }

    /// Set persist mode
    pub fn with_persist_mode(mut self, mode: fjall::PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }
}
