// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printhost-security — Credential primitives for the system object.
//
// Administrative passwords are stored as salted SHA-256 digests, and web
// forms are protected with a session key that rotates every 24 hours.

pub mod credentials;
pub mod random;
pub mod session;

pub use credentials::{hash_password, verify_password};
pub use random::random_hex;
pub use session::{SESSION_LIFETIME_SECS, SessionKey};
