//! RocksDB ledger and node bootstrap against a real database directory.

use vouch_core::error::{ErrorKind, LedgerError};
use vouch_core::keys::{KeyKind, kind_prefix, stake_key};
use vouch_core::traits::{Ledger, StateTxn, StateTxnExt};
use vouch_core::types::{Role, Stake, TxContext};
use vouch_engine::Engine;
use vouch_node::{Node, NodeSettings, RocksLedger};

fn ctx(caller: &str) -> TxContext {
    TxContext::new(caller, "tx", 1_700_000_000)
}

fn settings(dir: &tempfile::TempDir) -> NodeSettings {
    NodeSettings {
        data_dir: dir.path().to_path_buf(),
        bootstrap_admins: vec!["CN=Admin,O=Org1".to_string()],
        bootstrap_arbitrators: vec!["x509::CN=Judge,O=Court::CN=ca".to_string()],
        ..NodeSettings::default()
    }
}

#[test]
fn concurrent_writers_on_one_key_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = RocksLedger::open(dir.path()).unwrap();

    let mut first = ledger.begin(ctx("alice")).unwrap();
    let mut second = ledger.begin(ctx("alice")).unwrap();
    assert_eq!(first.get_state("k").unwrap(), None);
    assert_eq!(second.get_state("k").unwrap(), None);

    second.put_state("k", vec![2]).unwrap();
    ledger.commit(second).unwrap();

    first.put_state("k", vec![1]).unwrap();
    let err = ledger.commit(first).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict { .. }), "{err}");
    assert_eq!(ledger.get("k").unwrap(), Some(vec![2]));
}

#[test]
fn disjoint_writers_both_commit() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = RocksLedger::open(dir.path()).unwrap();

    let mut a = ledger.begin(ctx("alice")).unwrap();
    let mut b = ledger.begin(ctx("bob")).unwrap();
    a.get_state("a").unwrap();
    b.get_state("b").unwrap();
    a.put_state("a", vec![1]).unwrap();
    b.put_state("b", vec![2]).unwrap();
    ledger.commit(a).unwrap();
    ledger.commit(b).unwrap();
}

#[test]
fn prefix_scan_selects_one_kind_and_sees_pending_writes() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = RocksLedger::open(dir.path()).unwrap();

    let mut txn = ledger.begin(ctx("alice")).unwrap();
    txn.put_record(&stake_key("bob"), &Stake::empty("bob", 1)).unwrap();
    txn.put_record(&stake_key("alice"), &Stake::empty("alice", 1)).unwrap();
    ledger.commit(txn).unwrap();

    let mut txn = ledger.begin(ctx("alice")).unwrap();
    txn.put_record(&stake_key("carol"), &Stake::empty("carol", 1)).unwrap();
    txn.put_state(&kind_prefix(KeyKind::Rating), vec![0]).unwrap();
    let stakes: Vec<Stake> = txn.scan_records(&kind_prefix(KeyKind::Stake)).unwrap();
    let actors: Vec<&str> = stakes.iter().map(|s| s.actor.as_str()).collect();
    assert_eq!(actors, vec!["alice", "bob", "carol"]);
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = Engine::new(RocksLedger::open(dir.path()).unwrap());
        engine.deposit(ctx("alice"), 1_500.0).unwrap();
    }
    let engine = Engine::new(RocksLedger::open(dir.path()).unwrap());
    let view = engine.get_stake(ctx("x"), "alice").unwrap();
    assert_eq!(view.available, 1_500.0);
}

#[test]
fn node_bootstraps_roles_once() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    {
        let engine = Node::open(&settings).unwrap();
        let config = engine.get_config(ctx("x")).unwrap();
        assert_eq!(config.version, 1);
        assert!(config.has_role(Role::Admin, "admin"));
        assert!(config.has_role(Role::Arbitrator, "judge"));
    }
    assert!(settings.db_path().exists());

    let engine = Node::open(&settings).unwrap();
    assert_eq!(engine.get_config(ctx("x")).unwrap().version, 1);
}

#[test]
fn node_without_bootstrap_admins_leaves_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = NodeSettings {
        data_dir: dir.path().to_path_buf(),
        ..NodeSettings::default()
    };
    let engine = Node::open(&settings).unwrap();
    let config = engine.get_config(ctx("x")).unwrap();
    assert_eq!(config.version, 0);
    assert!(config.admins.is_empty());
}

#[test]
fn dispute_lifecycle_on_rocksdb() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Node::open(&settings(&dir)).unwrap();

    engine.deposit(ctx("alice"), 1_000.0).unwrap();
    engine.deposit(ctx("acme"), 500.0).unwrap();
    let rating_id = engine
        .submit_rating(ctx("alice"), "acme", "quality", 0.1, "", 1_700_000_000)
        .unwrap();
    let dispute_id = engine
        .initiate_dispute(ctx("acme"), &rating_id, "false claim")
        .unwrap();
    assert_eq!(engine.get_stake(ctx("x"), "acme").unwrap().locked, 100.0);

    let resolved = engine
        .resolve_dispute(ctx("CN=Judge,O=Court"), &dispute_id, "OVERTURNED", "no evidence")
        .unwrap();
    assert!((resolved.slashed_amount - 300.0).abs() < 1e-9);
    assert!((engine.get_stake(ctx("x"), "alice").unwrap().available - 700.0).abs() < 1e-9);
    assert_eq!(engine.get_stake(ctx("x"), "acme").unwrap().locked, 0.0);

    let again = engine
        .resolve_dispute(ctx("judge"), &dispute_id, "UPHELD", "")
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::AlreadyResolved);
}
