//! RocksDB-backed ledger.
//!
//! Implements [`Ledger`] on an [`OptimisticTransactionDB`]. Point reads go
//! through `get_for_update`, so RocksDB tracks them and refuses the commit
//! if another transaction wrote one of those keys first. Prefix scans use a
//! plain transaction iterator and are not tracked.

use std::path::Path;

use rocksdb::{Direction, ErrorKind as RocksErrorKind, IteratorMode, OptimisticTransactionDB, Options, Transaction};
use tracing::{debug, info};

use vouch_core::error::LedgerError;
use vouch_core::traits::{Ledger, StateTxn};
use vouch_core::types::{Notification, TxContext};

fn backend(e: rocksdb::Error) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

/// Persistent ledger stored in a single RocksDB database.
pub struct RocksLedger {
    db: OptimisticTransactionDB,
}

impl std::fmt::Debug for RocksLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksLedger")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksLedger {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = OptimisticTransactionDB::open(&opts, path.as_ref()).map_err(backend)?;
        info!(path = %path.as_ref().display(), "storage: opened ledger");
        Ok(Self { db })
    }

    /// Committed value of `key`, outside any transaction.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.db.get(key.as_bytes()).map_err(backend)
    }
}

/// Open transaction on a [`RocksLedger`].
pub struct RocksTxn<'a> {
    txn: Transaction<'a, OptimisticTransactionDB>,
    ctx: TxContext,
    pending: Vec<Notification>,
}

impl StateTxn for RocksTxn<'_> {
    fn context(&self) -> &TxContext {
        &self.ctx
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.txn.get_for_update(key.as_bytes(), false).map_err(backend)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.txn.put(key.as_bytes(), value).map_err(backend)
    }

    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        let mut out = Vec::new();
        let iter = self
            .txn
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(backend)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.into_vec())
                .map_err(|e| LedgerError::Codec(format!("non-utf8 key: {e}")))?;
            out.push((key, value.into_vec()));
        }
        Ok(out)
    }

    fn emit(&mut self, notification: Notification) {
        self.pending.push(notification);
    }
}

impl Ledger for RocksLedger {
    type Txn<'a> = RocksTxn<'a>;

    fn begin(&self, ctx: TxContext) -> Result<RocksTxn<'_>, LedgerError> {
        Ok(RocksTxn {
            txn: self.db.transaction(),
            ctx,
            pending: Vec::new(),
        })
    }

    fn commit(&self, txn: RocksTxn<'_>) -> Result<Vec<Notification>, LedgerError> {
        let RocksTxn { txn, ctx, pending } = txn;
        match txn.commit() {
            Ok(()) => Ok(pending),
            Err(e) if matches!(e.kind(), RocksErrorKind::Busy | RocksErrorKind::TryAgain) => {
                debug!(tx = %ctx.tx_id, error = %e, "storage: commit conflict");
                Err(LedgerError::Conflict { key: e.into_string() })
            }
            Err(e) => Err(backend(e)),
        }
    }
}
