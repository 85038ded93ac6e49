// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared parse cache for lookup expressions
//!
//! Identical expression strings in different fields share a single parse. Only the
//! parse is shared: every field still gets its own resolution slot.

use super::expression::LookupExpression;
use super::grammar::parse_lookup;
use crate::error::Result;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared parsed expression
pub type SharedExpression = Arc<LookupExpression>;

/// Statistics about the parse cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionCacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of distinct source strings cached
    pub entries: usize,
}

impl ExpressionCacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64) / ((self.hits + self.misses) as f64) * 100.0
        }
    }
}

/// Thread-safe cache keyed by expression source text
pub struct ExpressionCache {
    entries: DashMap<String, Option<SharedExpression>, FxBuildHasher>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExpressionCache {
    /// Create a new enabled cache
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Create a cache; a disabled cache parses every call
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Parse `source`, reusing an earlier parse of the same text
    ///
    /// Errors are not cached; they abort preparation anyway.
    pub fn get_or_parse(&self, source: &str) -> Result<Option<SharedExpression>> {
        if !self.enabled {
            return Ok(parse_lookup(source)?.map(Arc::new));
        }

        if let Some(entry) = self.entries.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.value().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = parse_lookup(source)?.map(Arc::new);
        self.entries.insert(source.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> ExpressionCacheStats {
        ExpressionCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}
