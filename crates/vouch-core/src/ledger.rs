//! In-memory optimistic ledger.
//!
//! Keeps a versioned map behind a `parking_lot::Mutex`. Each transaction
//! records the version of every key it reads; commit rejects the transaction
//! if any of those versions moved. No persistence; intended for tests and
//! embedding.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::error::LedgerError;
use crate::traits::{Ledger, StateTxn};
use crate::types::{Notification, TxContext};

/// Version 0 stands for "absent".
const ABSENT: u64 = 0;

#[derive(Debug, Clone)]
struct Versioned {
    value: Vec<u8>,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Versioned>,
    /// Last commit sequence number; every write is stamped with a fresh one.
    clock: u64,
    delivered: Vec<Notification>,
}

impl Inner {
    fn version_of(&self, key: &str) -> u64 {
        self.entries.get(key).map_or(ABSENT, |e| e.version)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed value of `key`, outside any transaction.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.inner.lock().clock
    }

    /// Every notification emitted by a committed transaction, in commit order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().delivered.clone()
    }
}

/// Open transaction on a [`MemoryLedger`].
pub struct MemoryTxn<'a> {
    ledger: &'a MemoryLedger,
    ctx: TxContext,
    reads: HashMap<String, u64>,
    writes: BTreeMap<String, Vec<u8>>,
    pending: Vec<Notification>,
}

impl StateTxn for MemoryTxn<'_> {
    fn context(&self) -> &TxContext {
        &self.ctx
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(v) = self.writes.get(key) {
            return Ok(Some(v.clone()));
        }
        let inner = self.ledger.inner.lock();
        let entry = inner.entries.get(key);
        // The first read pins the version; later reads of the same key must
        // agree with it at commit.
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| entry.map_or(ABSENT, |e| e.version));
        Ok(entry.map(|e| e.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        let mut merged: BTreeMap<String, Vec<u8>> = {
            let inner = self.ledger.inner.lock();
            inner
                .entries
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, e)| (k.clone(), e.value.clone()))
                .collect()
        };
        for (k, v) in self.writes.range(prefix.to_string()..) {
            if !k.starts_with(prefix) {
                break;
            }
            merged.insert(k.clone(), v.clone());
        }
        Ok(merged.into_iter().collect())
    }

    fn emit(&mut self, notification: Notification) {
        self.pending.push(notification);
    }
}

impl Ledger for MemoryLedger {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&self, ctx: TxContext) -> Result<MemoryTxn<'_>, LedgerError> {
        Ok(MemoryTxn {
            ledger: self,
            ctx,
            reads: HashMap::new(),
            writes: BTreeMap::new(),
            pending: Vec::new(),
        })
    }

    fn commit(&self, txn: MemoryTxn<'_>) -> Result<Vec<Notification>, LedgerError> {
        let mut inner = self.inner.lock();

        if let Some((key, _)) = txn
            .reads
            .iter()
            .find(|(key, seen)| inner.version_of(key) != **seen)
        {
            tracing::debug!(key = %key.escape_debug(), tx = %txn.ctx.tx_id, "ledger: read set invalidated");
            return Err(LedgerError::Conflict { key: key.escape_debug().to_string() });
        }

        if txn.writes.is_empty() {
            inner.delivered.extend(txn.pending.iter().cloned());
            return Ok(txn.pending);
        }

        inner.clock += 1;
        let version = inner.clock;
        for (key, value) in txn.writes {
            inner.entries.insert(key, Versioned { value, version });
        }
        inner.delivered.extend(txn.pending.iter().cloned());
        Ok(txn.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(tx: &str) -> TxContext {
        TxContext::new("tester", tx, 1_000)
    }

    fn put(ledger: &MemoryLedger, key: &str, value: &[u8]) {
        let mut txn = ledger.begin(ctx("seed")).unwrap();
        txn.put_state(key, value.to_vec()).unwrap();
        ledger.commit(txn).unwrap();
    }

    #[test]
    fn committed_writes_are_visible() {
        let ledger = MemoryLedger::new();
        put(&ledger, "a", b"1");
        assert_eq!(ledger.get("a"), Some(b"1".to_vec()));
        assert_eq!(ledger.commit_count(), 1);
    }

    #[test]
    fn dropped_txn_discards_writes() {
        let ledger = MemoryLedger::new();
        {
            let mut txn = ledger.begin(ctx("t1")).unwrap();
            txn.put_state("a", b"1".to_vec()).unwrap();
            txn.emit(Notification { topic: "x".into(), payload: vec![] });
        }
        assert!(ledger.is_empty());
        assert!(ledger.notifications().is_empty());
    }

    #[test]
    fn reads_see_own_writes() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin(ctx("t1")).unwrap();
        txn.put_state("a", b"mine".to_vec()).unwrap();
        assert_eq!(txn.get_state("a").unwrap(), Some(b"mine".to_vec()));
    }

    #[test]
    fn concurrent_read_modify_write_conflicts() {
        let ledger = MemoryLedger::new();
        put(&ledger, "stake", b"0");

        let mut t1 = ledger.begin(ctx("t1")).unwrap();
        let mut t2 = ledger.begin(ctx("t2")).unwrap();
        t1.get_state("stake").unwrap();
        t2.get_state("stake").unwrap();
        t1.put_state("stake", b"5".to_vec()).unwrap();
        t2.put_state("stake", b"7".to_vec()).unwrap();

        ledger.commit(t1).unwrap();
        let err = ledger.commit(t2).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
        assert_eq!(ledger.get("stake"), Some(b"5".to_vec()));
    }

    #[test]
    fn read_of_absent_key_conflicts_with_its_creation() {
        let ledger = MemoryLedger::new();
        let mut t1 = ledger.begin(ctx("t1")).unwrap();
        let mut t2 = ledger.begin(ctx("t2")).unwrap();
        assert!(t1.get_state("new").unwrap().is_none());
        assert!(t2.get_state("new").unwrap().is_none());
        t1.put_state("new", b"a".to_vec()).unwrap();
        t2.put_state("new", b"b".to_vec()).unwrap();
        ledger.commit(t1).unwrap();
        assert!(ledger.commit(t2).is_err());
    }

    #[test]
    fn disjoint_keys_commit_in_any_order() {
        let ledger = MemoryLedger::new();
        let mut t1 = ledger.begin(ctx("t1")).unwrap();
        let mut t2 = ledger.begin(ctx("t2")).unwrap();
        t1.get_state("a").unwrap();
        t2.get_state("b").unwrap();
        t1.put_state("a", b"1".to_vec()).unwrap();
        t2.put_state("b", b"2".to_vec()).unwrap();
        ledger.commit(t2).unwrap();
        ledger.commit(t1).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn blind_writes_do_not_conflict() {
        let ledger = MemoryLedger::new();
        let mut t1 = ledger.begin(ctx("t1")).unwrap();
        let mut t2 = ledger.begin(ctx("t2")).unwrap();
        t1.put_state("a", b"1".to_vec()).unwrap();
        t2.put_state("a", b"2".to_vec()).unwrap();
        ledger.commit(t1).unwrap();
        ledger.commit(t2).unwrap();
        assert_eq!(ledger.get("a"), Some(b"2".to_vec()));
    }

    #[test]
    fn scan_merges_pending_writes() {
        let ledger = MemoryLedger::new();
        put(&ledger, "p/1", b"old");
        put(&ledger, "p/2", b"two");
        put(&ledger, "q/1", b"other");

        let mut txn = ledger.begin(ctx("t1")).unwrap();
        txn.put_state("p/1", b"new".to_vec()).unwrap();
        txn.put_state("p/3", b"three".to_vec()).unwrap();
        let rows = txn.scan_prefix("p/").unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p/1", "p/2", "p/3"]);
        assert_eq!(rows[0].1, b"new".to_vec());
    }

    #[test]
    fn notifications_delivered_only_on_commit() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin(ctx("t1")).unwrap();
        txn.put_state("a", b"1".to_vec()).unwrap();
        txn.emit(Notification { topic: "stake".into(), payload: b"{}".to_vec() });
        let delivered = ledger.commit(txn).unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(ledger.notifications()[0].topic, "stake");
    }

    #[test]
    fn failed_commit_drops_notifications() {
        let ledger = MemoryLedger::new();
        put(&ledger, "k", b"0");
        let mut loser = ledger.begin(ctx("t1")).unwrap();
        loser.get_state("k").unwrap();
        loser.put_state("k", b"x".to_vec()).unwrap();
        loser.emit(Notification { topic: "lost".into(), payload: vec![] });
        put(&ledger, "k", b"1");
        assert!(ledger.commit(loser).is_err());
        assert!(ledger.notifications().iter().all(|n| n.topic != "lost"));
    }
}
