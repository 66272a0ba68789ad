//! End-to-end scenarios through the engine facade.
//!
//! Each test builds a fresh in-memory ledger, registers an admin and an
//! arbitrator, and drives ratings, stake, and disputes the way a client
//! would.

use std::thread;

use vouch_core::error::{EngineError, ErrorKind, LedgerError};
use vouch_core::ledger::MemoryLedger;
use vouch_core::traits::Ledger;
use vouch_core::types::DisputeStatus;
use vouch_engine::{Engine, stake};
use vouch_tests::helpers::*;

// ---------------------------------------------------------------------------
// Scenario A: a single full-weight positive rating on a (2, 2) prior
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_single_positive_rating() {
    let engine = unit_weight_engine(2.0, 2.0);
    fund(&engine, &["alice"], 1_000.0);

    engine
        .submit_rating(ctx("alice"), "acme", "quality", 1.0, "", NOW)
        .unwrap();

    let view = engine.get_reputation(ctx("x"), "acme", "quality", 0.95).unwrap();
    assert!((view.alpha - 3.0).abs() < 1e-12);
    assert!((view.beta - 2.0).abs() < 1e-12);
    assert!((view.score - 0.6).abs() < 1e-12);
    assert_eq!(view.total_events, 1);
}

// ---------------------------------------------------------------------------
// Scenario B: ten agreeing raters and one outlier
// ---------------------------------------------------------------------------

#[test]
fn scenario_b_prior_absorbs_outlier() {
    let engine = unit_weight_engine(1.0, 1.0);
    let raters: Vec<String> = (0..11).map(|i| format!("rater{i}")).collect();
    let refs: Vec<&str> = raters.iter().map(String::as_str).collect();
    fund(&engine, &refs, 1_000.0);

    for rater in &refs[..10] {
        engine
            .submit_rating(ctx(rater), "acme", "delivery", 0.9, "", NOW)
            .unwrap();
    }
    engine
        .submit_rating(ctx(refs[10]), "acme", "delivery", 0.1, "", NOW)
        .unwrap();

    let view = engine.get_reputation(ctx("x"), "acme", "delivery", 0.95).unwrap();
    let arithmetic: f64 = (10.0 * 0.9 + 0.1) / 11.0;
    assert!(
        (view.score - 0.9).abs() < (arithmetic - 0.9).abs(),
        "score {} should sit closer to 0.9 than the mean {arithmetic}",
        view.score
    );
    assert_eq!(view.total_events, 11);
}

// ---------------------------------------------------------------------------
// Scenario C: an overturned dispute undoes the rating and punishes the rater
// ---------------------------------------------------------------------------

#[test]
fn scenario_c_overturned_dispute() {
    let engine = unit_weight_engine(1.0, 1.0);
    fund(&engine, &["alice"], 1_000.0);
    fund(&engine, &["acme"], 250.0);

    let before = engine.get_reputation(ctx("x"), "acme", "quality", 0.95).unwrap();
    let rating_id = engine
        .submit_rating(ctx("alice"), "acme", "quality", 0.2, "sha256:photo", NOW)
        .unwrap();
    let rated = engine.get_reputation(ctx("x"), "acme", "quality", 0.95).unwrap();
    assert!(rated.beta > before.beta);

    let dispute_id = engine
        .initiate_dispute(ctx("acme"), &rating_id, "shipment arrived intact")
        .unwrap();
    let locked = engine.get_stake(ctx("x"), "acme").unwrap();
    assert_eq!((locked.available, locked.locked), (150.0, 100.0));

    let rater_available = engine.get_stake(ctx("x"), "alice").unwrap().available;
    let later = NOW + 3_600;
    let resolved = engine
        .resolve_dispute(ctx_at(ARBITRATOR, later), &dispute_id, "overturned", "photo disproves claim")
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Overturned);
    assert_eq!(resolved.resolved_at, Some(later));

    let after = engine.get_reputation(ctx_at("x", later), "acme", "quality", 0.95).unwrap();
    assert!((after.alpha - before.alpha).abs() < 1e-9);
    assert!((after.beta - before.beta).abs() < 1e-9);

    let rater = engine.get_stake(ctx("x"), "alice").unwrap();
    let expected_slash = rater_available * 0.30;
    assert!((resolved.slashed_amount - expected_slash).abs() < 1e-9);
    assert!((rater.available - (rater_available - expected_slash)).abs() < 1e-9);

    let initiator = engine.get_stake(ctx("x"), "acme").unwrap();
    assert_eq!((initiator.available, initiator.locked), (250.0, 0.0));

    let stats = engine.get_dispute_stats(ctx("x")).unwrap();
    assert_eq!((stats.resolved, stats.overturned), (1, 1));
    assert!((stats.avg_resolution_secs - 3_600.0).abs() < 1e-9);
}

#[test]
fn upheld_dispute_credits_rater_and_keeps_rating() {
    let engine = unit_weight_engine(1.0, 1.0);
    fund(&engine, &["alice"], 1_000.0);
    fund(&engine, &["acme"], 100.0);

    let rating_id = engine
        .submit_rating(ctx("alice"), "acme", "warranty", 0.3, "", NOW)
        .unwrap();
    let rated = engine.get_reputation(ctx("x"), "acme", "warranty", 0.95).unwrap();
    let dispute_id = engine.initiate_dispute(ctx("acme"), &rating_id, "unfair").unwrap();
    let resolved = engine
        .resolve_dispute(ctx(ARBITRATOR), &dispute_id, "upheld", "")
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Upheld);
    assert_eq!(resolved.slashed_amount, 0.0);

    let kept = engine.get_reputation(ctx("x"), "acme", "warranty", 0.95).unwrap();
    assert_eq!((kept.alpha, kept.beta), (rated.alpha, rated.beta));
    let meta = engine.get_reputation(ctx("x"), "alice", "meta_warranty", 0.95).unwrap();
    assert!(meta.score > 0.5);
    assert_eq!(engine.get_stake(ctx("x"), "alice").unwrap().available, 1_000.0);
    assert_eq!(engine.get_stake(ctx("x"), "acme").unwrap().available, 100.0);
}

#[test]
fn accurate_raters_gain_influence() {
    let engine = engine();
    fund(&engine, &["alice", "acme"], 1_000.0);
    let fresh = engine.simulate_rating_impact(ctx("alice"), "acme", "quality", 0.9).unwrap();

    for i in 0..5 {
        let target = format!("supplier{i}");
        fund(&engine, &[target.as_str()], 100.0);
        let rating_id = engine
            .submit_rating(ctx("alice"), &target, "quality", 0.8, "", NOW)
            .unwrap();
        let dispute_id = engine.initiate_dispute(ctx(&target), &rating_id, "").unwrap();
        engine
            .resolve_dispute(ctx(ARBITRATOR), &dispute_id, "upheld", "")
            .unwrap();
    }

    let trusted = engine.simulate_rating_impact(ctx("alice"), "acme", "quality", 0.9).unwrap();
    assert!(trusted.rater_weight > fresh.rater_weight);
}

#[test]
fn actor_profile_counts_activity() {
    let engine = engine();
    fund(&engine, &["alice", "bob"], 2_000.0);
    fund(&engine, &["acme"], 500.0);

    let r1 = engine.submit_rating(ctx("alice"), "acme", "quality", 0.7, "", NOW).unwrap();
    engine.submit_rating(ctx("bob"), "acme", "delivery", 0.4, "", NOW).unwrap();
    engine.initiate_dispute(ctx("acme"), &r1, "").unwrap();

    let acme = engine.get_actor_profile(ctx("x"), "acme").unwrap();
    assert_eq!(acme.ratings_received, 2);
    assert_eq!(acme.disputes_initiated, 1);
    assert_eq!(acme.stake.locked, 100.0);

    let alice = engine.get_actor_profile(ctx("x"), "CN=Alice,O=Org1").unwrap();
    assert_eq!(alice.ratings_given, 1);
    assert_eq!(alice.disputes_against, 1);
    assert_eq!(alice.reputations.len(), 4);

    let metrics = engine.get_system_metrics(ctx("x")).unwrap();
    assert_eq!(metrics.total_disputes, 1);
    assert_eq!(metrics.total_ratings, 2);
}

// ---------------------------------------------------------------------------
// Scenario D: concurrent deposits for the same actor
// ---------------------------------------------------------------------------

#[test]
fn scenario_d_interleaved_deposits_conflict_then_retry() {
    let ledger = MemoryLedger::new();

    let mut first = ledger.begin(ctx("alice")).unwrap();
    let mut second = ledger.begin(ctx("alice")).unwrap();
    stake::deposit(&mut first, 100.0).unwrap();
    stake::deposit(&mut second, 50.0).unwrap();

    ledger.commit(first).unwrap();
    let err = ledger.commit(second).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict { .. }));

    // Same inputs, fresh transaction.
    let mut retry = ledger.begin(ctx("alice")).unwrap();
    stake::deposit(&mut retry, 50.0).unwrap();
    ledger.commit(retry).unwrap();

    let engine = Engine::new(ledger);
    assert_eq!(engine.get_stake(ctx("x"), "alice").unwrap().available, 150.0);
}

#[test]
fn scenario_d_threaded_deposits_sum_exactly() {
    let engine = Engine::new(MemoryLedger::new());
    let amounts: Vec<f64> = (1..=16).map(f64::from).collect();

    thread::scope(|s| {
        for &amount in &amounts {
            let engine = &engine;
            s.spawn(move || {
                loop {
                    match engine.deposit(ctx("alice"), amount) {
                        Ok(_) => break,
                        Err(e) if e.is_retryable() => continue,
                        Err(e) => panic!("deposit failed: {e}"),
                    }
                }
            });
        }
    });

    let total: f64 = amounts.iter().sum();
    let view = engine.get_stake(ctx("x"), "alice").unwrap();
    assert_eq!(view.available, total);
}

#[test]
fn conflicting_rating_reports_storage_conflict() {
    let engine = engine();
    fund(&engine, &["alice", "bob"], 1_000.0);
    let ledger = engine.ledger();

    let model = vouch_belief::BetaBelief::new();
    let mut a = ledger.begin(ctx("alice")).unwrap();
    let mut b = ledger.begin(ctx("bob")).unwrap();
    vouch_engine::rating::submit_rating(&mut a, &model, "acme", "quality", 0.8, "", NOW).unwrap();
    vouch_engine::rating::submit_rating(&mut b, &model, "acme", "quality", 0.6, "", NOW).unwrap();
    ledger.commit(a).unwrap();

    let err = EngineError::from(ledger.commit(b).unwrap_err());
    assert_eq!(err.kind(), ErrorKind::StorageConflict);
    assert!(err.is_retryable());

    let retried = engine.submit_rating(ctx("bob"), "acme", "quality", 0.6, "", NOW);
    assert!(retried.is_ok());
    let view = engine.get_reputation(ctx("x"), "acme", "quality", 0.95).unwrap();
    assert_eq!(view.total_events, 2);
}
