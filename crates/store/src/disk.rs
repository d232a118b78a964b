//! Persistent store adapter backed by fjall
//!
//! One fjall partition per table. Cell keys are laid out qualifier-first
//! (length-prefixed) so a scan over one qualifier is a prefix scan.
//!
//! fjall has no native compare-and-set, so `put_if_absent` serializes
//! through a per-table mutex. That makes the conditional write atomic for
//! every writer in this process; deployments where writers span processes
//! use a store whose backend provides the conditional write natively.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::table::{Store, StoreTable, WriteOp};
use async_trait::async_trait;
use fjall::{Keyspace, Partition, PartitionCreateOptions, PersistMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Persistent store holding all tables inside one fjall keyspace.
pub struct FjallStore {
    keyspace: Keyspace,
    config: StoreConfig,
    tables: Mutex<HashMap<String, Arc<FjallTable>>>,
}

impl FjallStore {
    /// Opens (creating if necessary) a store at the configured directory.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let keyspace = fjall::Config::new(&config.data_dir)
            .cache_size(config.block_cache_size)
            .open()?;

        Ok(Self {
            keyspace,
            config,
            tables: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl Store for FjallStore {
    async fn table(&self, name: &str) -> Result<Arc<dyn StoreTable>> {
        if let Some(table) = self.tables.lock().get(name) {
            return Ok(table.clone());
        }

        let partition = self.keyspace.open_partition(
            name,
            PartitionCreateOptions::default()
                .block_size(32 * 1024)
                .compression(self.config.compression),
        )?;

        let table = Arc::new(FjallTable {
            keyspace: self.keyspace.clone(),
            partition,
            persist_mode: self.config.persist_mode,
            write_guard: Mutex::new(()),
        });
        self.tables
            .lock()
            .insert(name.to_string(), table.clone());
        Ok(table)
    }
}

/// A single fjall-backed table.
pub struct FjallTable {
    keyspace: Keyspace,
    partition: Partition,
    persist_mode: PersistMode,
    write_guard: Mutex<()>,
}

/// Cell key layout: qualifier length (u32 BE) ++ qualifier ++ row key.
fn cell_key(key: &[u8], qualifier: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + qualifier.len() + key.len());
    out.extend_from_slice(&(qualifier.len() as u32).to_be_bytes());
    out.extend_from_slice(qualifier);
    out.extend_from_slice(key);
    out
}

fn qualifier_prefix(qualifier: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + qualifier.len());
    out.extend_from_slice(&(qualifier.len() as u32).to_be_bytes());
    out.extend_from_slice(qualifier);
    out
}

#[async_trait]
impl StoreTable for FjallTable {
    async fn get(&self, key: &[u8], qualifier: &[u8]) -> Result<Option<Vec<u8>>> {
        let cell = cell_key(key, qualifier);
        Ok(self.partition.get(&cell)?.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<()> {
        let cell = cell_key(key, qualifier);
        let _guard = self.write_guard.lock();
        self.partition.insert(&cell, value)?;
        self.keyspace.persist(self.persist_mode)?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<bool> {
        let cell = cell_key(key, qualifier);
        let _guard = self.write_guard.lock();
        if self.partition.get(&cell)?.is_some() {
            return Ok(false);
        }
        self.partition.insert(&cell, value)?;
        self.keyspace.persist(self.persist_mode)?;
        Ok(true)
    }

    async fn delete(&self, key: &[u8], qualifier: &[u8]) -> Result<()> {
        let cell = cell_key(key, qualifier);
        let _guard = self.write_guard.lock();
        self.partition.remove(&cell)?;
        self.keyspace.persist(self.persist_mode)?;
        Ok(())
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> Result<()> {
        let _guard = self.write_guard.lock();
        let mut batch = self.keyspace.batch();
        for op in ops {
            match op {
                WriteOp::Put {
                    key,
                    qualifier,
                    value,
                } => batch.insert(&self.partition, cell_key(&key, &qualifier), value),
                WriteOp::Delete { key, qualifier } => {
                    batch.remove(&self.partition, cell_key(&key, &qualifier))
                }
            }
        }
        batch.commit()?;
        self.keyspace.persist(self.persist_mode)?;
        Ok(())
    }

    async fn scan(&self, qualifier: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = qualifier_prefix(qualifier);
        let mut out = Vec::new();
        for entry in self.partition.prefix(&prefix) {
            let (cell, value) = entry?;
            if cell.len() < prefix.len() {
                return Err(Error::Encoding("cell key shorter than prefix".to_string()));
            }
            out.push((cell[prefix.len()..].to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}
