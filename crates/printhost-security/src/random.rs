// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CSPRNG helpers backed by the OS random source.

use printhost_core::error::{PrinthostError, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// Fill `buf` with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| PrinthostError::Random)
}

/// Return `bytes` random bytes encoded as lowercase hex (`2 * bytes` chars).
pub fn random_hex(bytes: usize) -> Result<String> {
    let mut buf = vec![0u8; bytes];
    fill_random(&mut buf)?;
    Ok(hex::encode(buf))
}

/// Return `count` random 32-bit words.
pub fn random_words(count: usize) -> Result<Vec<u32>> {
    let mut buf = vec![0u8; count * 4];
    fill_random(&mut buf)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
