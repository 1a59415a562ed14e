// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MIME filter registry keyed by (source, destination) type pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::callbacks::FilterCallback;

/// Destination meaning "hand the document to the driver's raster interface".
pub const PWG_RASTER: &str = "image/pwg-raster";

/// Ordered set of filters. First registration for a pair wins.
///
/// Keyed by source type, then destination type.
#[derive(Default)]
pub struct FilterRegistry {
    filters: BTreeMap<&'static str, BTreeMap<&'static str, Arc<dyn FilterCallback>>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `src` -> `dst`. Returns `false` if the pair
    /// was already registered (the existing filter is kept).
    pub fn add(
        &mut self,
        src: &'static str,
        dst: &'static str,
        callback: Arc<dyn FilterCallback>,
    ) -> bool {
        let by_dst = self.filters.entry(src).or_default();
        if by_dst.contains_key(dst) {
            return false;
        }
        debug!(src, dst, "adding MIME filter");
        by_dst.insert(dst, callback);
        true
    }

    pub fn find(&self, src: &str, dst: &str) -> Option<Arc<dyn FilterCallback>> {
        self.filters.get(src)?.get(dst).map(Arc::clone)
    }

    /// Registered pairs in (source, destination) order.
    pub fn pairs(&self) -> Vec<(&'static str, &'static str)> {
        self.filters
            .iter()
            .flat_map(|(src, by_dst)| by_dst.keys().map(move |dst| (*src, *dst)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.filters.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
