// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Salted SHA-256 password hashes in "<nonce>~<digest>" form.

use printhost_core::error::Result;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::random::random_hex;

/// Bytes of randomness in a fresh nonce (32 hex characters).
const NONCE_BYTES: usize = 16;

/// Hash `password`, producing `"<nonce>~<hex sha256(nonce:password)>"`.
///
/// When `prior` is an existing hash (contains `~`), its nonce is reused so the
/// result can be compared against it. Otherwise a fresh random nonce is drawn.
pub fn hash_password(prior: Option<&str>, password: &str) -> Result<String> {
    let nonce = match prior.and_then(reusable_nonce) {
        Some(nonce) => nonce.to_owned(),
        None => random_hex(NONCE_BYTES)?,
    };

    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let digest = hex::encode(hasher.finalize());

    Ok(format!("{nonce}~{digest}"))
}

/// Check `password` against a stored hash in constant time.
///
/// A stored value without a nonce separator never matches.
pub fn verify_password(stored: &str, password: &str) -> bool {
    if !stored.contains('~') {
        return false;
    }

    match hash_password(Some(stored), password) {
        Ok(candidate) => bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())),
        Err(_) => false,
    }
}

fn reusable_nonce(prior: &str) -> Option<&str> {
    let (nonce, _) = prior.split_once('~')?;
    Some(nonce.split(':').next().unwrap_or(nonce))
}
