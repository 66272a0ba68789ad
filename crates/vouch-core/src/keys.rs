//! Composite state keys and content-derived identifiers.
//!
//! Keys follow the `\0KIND\0part\0part\0` layout: a prefix scan over
//! `\0KIND\0` selects exactly one record type, and the trailing separator
//! keeps `\0REP\0bob\0` from matching `\0REP\0bobby\0`.

use sha2::{Digest, Sha256};

use crate::constants::{
    ANOMALY_ID_PREFIX, DISPUTE_ID_PREFIX, ID_HASH_PREFIX_LEN, RATING_ID_PREFIX,
};

const SEP: char = '\0';

/// Record type tag embedded in every composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Reputation,
    Rating,
    Stake,
    Dispute,
    Config,
    Anomaly,
}

impl KeyKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Reputation => "REP",
            Self::Rating => "RAT",
            Self::Stake => "STK",
            Self::Dispute => "DIS",
            Self::Config => "CFG",
            Self::Anomaly => "ANM",
        }
    }
}

/// Build a composite key from a kind and its attribute parts.
pub fn composite(kind: KeyKind, parts: &[&str]) -> String {
    let mut key = String::with_capacity(
        kind.tag().len() + parts.iter().map(|p| p.len() + 1).sum::<usize>() + 2,
    );
    key.push(SEP);
    key.push_str(kind.tag());
    key.push(SEP);
    for part in parts {
        key.push_str(part);
        key.push(SEP);
    }
    key
}

/// Prefix selecting every record of one kind.
pub fn kind_prefix(kind: KeyKind) -> String {
    composite(kind, &[])
}

/// Split a composite key back into its kind tag and parts.
pub fn split(key: &str) -> Option<(&str, Vec<&str>)> {
    let body = key.strip_prefix(SEP)?.strip_suffix(SEP)?;
    let mut fields = body.split(SEP);
    let tag = fields.next()?;
    Some((tag, fields.collect()))
}

pub fn config_key() -> String {
    composite(KeyKind::Config, &["system"])
}

pub fn reputation_key(actor: &str, dimension: &str) -> String {
    composite(KeyKind::Reputation, &[actor, dimension])
}

/// Prefix selecting every dimension of one actor's reputation.
pub fn reputation_prefix(actor: &str) -> String {
    composite(KeyKind::Reputation, &[actor])
}

pub fn stake_key(actor: &str) -> String {
    composite(KeyKind::Stake, &[actor])
}

pub fn rating_key(rating_id: &str) -> String {
    composite(KeyKind::Rating, &[rating_id])
}

pub fn dispute_key(dispute_id: &str) -> String {
    composite(KeyKind::Dispute, &[dispute_id])
}

pub fn anomaly_key(event_id: &str) -> String {
    composite(KeyKind::Anomaly, &[event_id])
}

/// `prefix` followed by the hex of the first bytes of SHA-256(`material`).
pub fn hashed_id(prefix: &str, material: &str) -> String {
    let digest = Sha256::digest(material.as_bytes());
    format!("{prefix}{}", hex::encode(&digest[..ID_HASH_PREFIX_LEN]))
}

/// Deterministic rating id over normalized identities, so a replayed call
/// maps onto the record its first attempt wrote.
pub fn rating_id(rater: &str, target: &str, dimension: &str, timestamp: i64) -> String {
    hashed_id(
        RATING_ID_PREFIX,
        &format!("{rater}:{target}:{dimension}:{timestamp}"),
    )
}

/// One dispute id per (rating, initiator) pair.
pub fn dispute_id(rating_id: &str, initiator: &str) -> String {
    hashed_id(DISPUTE_ID_PREFIX, &format!("{rating_id}:{initiator}"))
}

pub fn anomaly_id(rating_id: &str) -> String {
    hashed_id(ANOMALY_ID_PREFIX, rating_id)
}
