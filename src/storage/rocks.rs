use std::sync::Arc;

use anyhow::Result;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};

use crate::traits::{IndexStore, StoreOp};

/// Namespace prefix of index entries inside the database.
const ENTRY_PREFIX: &[u8] = b"idx/";

/// Index entries persisted in RocksDB.
pub struct RocksStorage {
    db: Arc<DB>,
}

impl RocksStorage {
    pub fn open(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Encode db key: prefix || key
    fn encode_key(key: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENTRY_PREFIX.len() + key.len());
        buf.extend_from_slice(ENTRY_PREFIX);
        buf.extend_from_slice(key);
        buf
    }

    fn decode_key(raw: &[u8]) -> Option<&[u8]> {
        raw.strip_prefix(ENTRY_PREFIX)
    }
}

impl IndexStore for RocksStorage {
    fn name(&self) -> &'static str {
        "rocksdb"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(Self::encode_key(key))?)
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(ENTRY_PREFIX, Direction::Forward));

        for item in iter {
            let (raw_key, value) = item?;
            let Some(key) = Self::decode_key(&raw_key) else {
                // Past the entry namespace; stop.
                break;
            };
            out.push((key.to_vec(), value.to_vec()));
        }

        Ok(out)
    }

    fn write(&self, ops: &[StoreOp]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                StoreOp::Put { key, value } => batch.put(Self::encode_key(key), value),
                StoreOp::Delete { key } => batch.delete(Self::encode_key(key)),
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}
