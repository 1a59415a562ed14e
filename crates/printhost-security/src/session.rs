// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotating session key used to protect web forms against CSRF.

use chrono::{DateTime, TimeDelta, Utc};
use printhost_core::error::Result;
use tracing::debug;

use crate::random::random_words;

/// A session key is valid for this many seconds after issue.
pub const SESSION_LIFETIME_SECS: i64 = 86_400;

/// A 256-bit session key rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    key: String,
    issued_at: DateTime<Utc>,
}

impl SessionKey {
    /// Issue a new key stamped with the current time.
    pub fn generate() -> Result<Self> {
        Self::generate_at(Utc::now())
    }

    /// Issue a new key stamped with `now`.
    pub fn generate_at(now: DateTime<Utc>) -> Result<Self> {
        let key: String = random_words(8)?
            .into_iter()
            .map(|w| format!("{w:08x}"))
            .collect();
        debug!(issued_at = %now, "session key issued");
        Ok(Self { key, issued_at: now })
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Whether the key is still inside its 24-hour window at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at <= TimeDelta::seconds(SESSION_LIFETIME_SECS)
    }

    /// Replace the key if it has expired at `now`. Returns whether it changed.
    pub fn regenerate_at(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if self.is_fresh_at(now) {
            return Ok(false);
        }
        *self = Self::generate_at(now)?;
        Ok(true)
    }
}
