//! Caller identity normalization.
//!
//! Ledger runtimes hand the engine a raw credential string. Depending on the
//! client it may be a plain name, an X.509 distinguished-name bundle such as
//! `x509::CN=Alice,OU=client::CN=ca.org1`, or that bundle base64-encoded.
//! Every comparison between actors goes through [`normalize`], so all of these
//! surface forms collapse to one key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Marker that introduces a Common-Name field inside a distinguished name.
const CN_MARKER: &str = "cn=";

/// Prefix the x509 identity bundle puts in front of the subject DN.
const X509_PREFIX: &str = "x509::";

/// Separator between the subject and issuer sections of a bundle.
const SECTION_SEPARATOR: &str = "::";

/// Upper bound on unwrapping rounds. Every productive round shrinks the key,
/// so only adversarial nesting gets near it.
const MAX_ROUNDS: usize = 64;

/// Prefix of the escaped key returned when unwrapping does not settle.
const UNSETTLED_PREFIX: char = '!';

/// Canonicalize a raw credential string into a stable actor key.
///
/// Total and idempotent: it never fails, and normalizing its own output
/// returns the same string.
///
/// # Examples
///
/// ```
/// use vouch_core::identity::normalize;
///
/// assert_eq!(normalize("x509::CN=Alice,OU=client::CN=ca.org1"), "alice");
/// assert_eq!(normalize("eDUwOTo6Q049QWxpY2UsT1U9Y2xpZW50OjpDTj1jYS5vcmcx"), "alice");
/// assert_eq!(normalize("  Bob "), "bob");
/// assert_eq!(normalize("alice"), normalize(&normalize("alice")));
/// ```
pub fn normalize(raw: &str) -> String {
    // The first round sees the caller's casing so base64 payloads decode;
    // the fixed point is checked on the lowercased form, which is what a
    // second call would start from.
    let mut current = clean(raw);
    for _ in 0..MAX_ROUNDS {
        let next = clean(&unwrap_once(&current)).to_lowercase();
        if next == current {
            return current;
        }
        current = next;
    }
    escape_unsettled(&current)
}

/// Map a key that is still unwrapping to one that cannot unwrap further:
/// `!` is outside the base64 alphabet and without `=` there is no CN marker.
fn escape_unsettled(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len() + 1);
    escaped.push(UNSETTLED_PREFIX);
    escaped.extend(key.chars().filter(|&c| c != '='));
    clean(&escaped)
}

/// One round of unwrapping: base64-decode an encoded bundle, otherwise pull
/// the Common-Name out of a distinguished name.
fn unwrap_once(input: &str) -> String {
    if let Some(decoded) = decode_bundle(input) {
        return decoded;
    }
    extract_common_name(input).unwrap_or_else(|| input.to_string())
}

/// Decode `input` when it is canonical base64 wrapping a distinguished name.
///
/// Plain names that happen to be valid base64 decode to bytes without a CN
/// marker and are left alone.
fn decode_bundle(input: &str) -> Option<String> {
    let bytes = STANDARD.decode(input.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    if text.to_lowercase().contains(CN_MARKER) {
        Some(text)
    } else {
        None
    }
}

/// Take the first `CN=` field of the subject section.
fn extract_common_name(input: &str) -> Option<String> {
    let lowered = input.to_lowercase();
    if !lowered.contains(CN_MARKER) {
        return None;
    }

    let subject = match lowered.strip_prefix(X509_PREFIX) {
        Some(rest) => rest.split(SECTION_SEPARATOR).next().unwrap_or(rest),
        None => lowered.as_str(),
    };

    subject
        .split([',', '/'])
        .map(str::trim)
        .find_map(|field| field.strip_prefix(CN_MARKER))
        .map(|cn| cn.trim().to_string())
        .filter(|cn| !cn.is_empty())
}

/// Trim and drop control characters (composite keys use NUL as a
/// separator). Case is kept so base64 payloads survive until decoded.
fn clean(input: &str) -> String {
    let kept: String = input.chars().filter(|c| !c.is_control()).collect();
    kept.trim().to_string()
}
