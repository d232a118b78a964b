//! In-process store adapter
//!
//! Every table is a `BTreeMap` behind a mutex, so conditional writes and
//! batches are trivially atomic. Used by tests and single-node setups.

use crate::error::Result;
use crate::table::{Store, StoreTable, WriteOp};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type CellKey = (Vec<u8>, Vec<u8>);

/// In-memory store holding all tables of one logical cluster.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Arc<MemoryTable>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn table(&self, name: &str) -> Result<Arc<dyn StoreTable>> {
        let mut tables = self.tables.lock();
        let table = tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryTable::default()))
            .clone();
        Ok(table)
    }
}

/// A single in-memory table.
#[derive(Default)]
pub struct MemoryTable {
    cells: Mutex<BTreeMap<CellKey, Vec<u8>>>,
}

#[async_trait]
impl StoreTable for MemoryTable {
    async fn get(&self, key: &[u8], qualifier: &[u8]) -> Result<Option<Vec<u8>>> {
        let cells = self.cells.lock();
        Ok(cells.get(&(key.to_vec(), qualifier.to_vec())).cloned())
    }

    async fn put(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<()> {
        let mut cells = self.cells.lock();
        cells.insert((key.to_vec(), qualifier.to_vec()), value);
        Ok(())
    }

    async fn put_if_absent(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<bool> {
        let mut cells = self.cells.lock();
        let cell = (key.to_vec(), qualifier.to_vec());
        if cells.contains_key(&cell) {
            return Ok(false);
        }
        cells.insert(cell, value);
        Ok(true)
    }

    async fn delete(&self, key: &[u8], qualifier: &[u8]) -> Result<()> {
        let mut cells = self.cells.lock();
        cells.remove(&(key.to_vec(), qualifier.to_vec()));
        Ok(())
    }

    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()> {
        // One lock acquisition makes the whole batch atomic for readers.
        let mut cells = self.cells.lock();
        for op in batch {
            match op {
                WriteOp::Put {
                    key,
                    qualifier,
                    value,
                } => {
                    cells.insert((key, qualifier), value);
                }
                WriteOp::Delete { key, qualifier } => {
                    cells.remove(&(key, qualifier));
                }
            }
        }
        Ok(())
    }

    async fn scan(&self, qualifier: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cells = self.cells.lock();
        Ok(cells
            .iter()
            .filter(|((_, q), _)| q.as_slice() == qualifier)
            .map(|((k, _), v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let table = store.table("t").await.unwrap();

        table.put(b"row", b"q", b"v1".to_vec()).await.unwrap();
        assert_eq!(table.get(b"row", b"q").await.unwrap(), Some(b"v1".to_vec()));

        table.delete(b"row", b"q").await.unwrap();
        assert_eq!(table.get(b"row", b"q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_if_absent_is_first_writer_wins() {
        let store = MemoryStore::new();
        let table = store.table("t").await.unwrap();

        assert!(table.put_if_absent(b"row", b"q", b"a".to_vec()).await.unwrap());
        assert!(!table.put_if_absent(b"row", b"q", b"b".to_vec()).await.unwrap());

        // The losing write left no trace.
        assert_eq!(table.get(b"row", b"q").await.unwrap(), Some(b"a".to_vec()));
    }

    #[tokio::test]
    async fn test_same_table_handle_for_same_name() {
        let store = MemoryStore::new();
        let t1 = store.table("t").await.unwrap();
        let t2 = store.table("t").await.unwrap();

        t1.put(b"row", b"q", b"v".to_vec()).await.unwrap();
        assert_eq!(t2.get(b"row", b"q").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_batch_apply_and_scan() {
        let store = MemoryStore::new();
        let table = store.table("t").await.unwrap();

        table
            .apply(vec![
                WriteOp::Put {
                    key: b"a".to_vec(),
                    qualifier: b"q".to_vec(),
                    value: b"1".to_vec(),
                },
                WriteOp::Put {
                    key: b"b".to_vec(),
                    qualifier: b"q".to_vec(),
                    value: b"2".to_vec(),
                },
                WriteOp::Put {
                    key: b"a".to_vec(),
                    qualifier: b"other".to_vec(),
                    value: b"3".to_vec(),
                },
            ])
            .await
            .unwrap();

        let rows = table.scan(b"q").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (b"a".to_vec(), b"1".to_vec()));
        assert_eq!(rows[1], (b"b".to_vec(), b"2".to_vec()));
    }
}
