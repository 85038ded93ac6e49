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

//! Function Registry for lookup expressions
//!
//! The registry binds function names to lookup functions and remembers every name
//! referenced by a prepared expression, registered or not, so a host can discover
//! which bindings it still has to supply.

use super::function::{LookupFunction, LookupResult};
use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

/// Shared handle to a bound lookup function
pub type SharedLookup = Arc<dyn LookupFunction>;

/// Thread-safe name to function table
///
/// Registration takes a write lock; resolution takes a read lock and hands out a cloned
/// `Arc`, so a slow lookup never holds the lock while it runs.
pub struct FunctionRegistry {
    functions: RwLock<FxHashMap<String, SharedLookup>>,
    // Names seen in parsed expressions, in first-seen order
    referenced: RwLock<IndexSet<String>>,
}

impl FunctionRegistry {
    /// Create a new empty function registry
    pub fn new() -> Self {
        Self {
            functions: RwLock::new(FxHashMap::default()),
            referenced: RwLock::new(IndexSet::new()),
        }
    }

    /// Bind `name` to a closure, replacing any previous binding
    pub fn register<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(Option<&Value>) -> LookupResult + Send + Sync + 'static,
    {
        self.register_function(name, Arc::new(function));
    }

    /// Bind `name` to an existing lookup function, replacing any previous binding
    pub fn register_function(&self, name: impl Into<String>, function: SharedLookup) {
        let name = name.into();
        let replaced = self.functions.write().insert(name.clone(), function);
        if replaced.is_some() {
            log::debug!("Rebound lookup function '{name}'");
        } else {
            log::debug!("Registered lookup function '{name}'");
        }
    }

    /// Look up the function bound to `name`
    pub fn resolve(&self, name: &str) -> Option<SharedLookup> {
        self.functions.read().get(name).cloned()
    }

    /// Check if a function is bound to `name`
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Names of all bound functions, sorted
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Record that a prepared expression references `name`
    pub(crate) fn note_reference(&self, name: &str) {
        if self.referenced.read().contains(name) {
            return;
        }
        self.referenced.write().insert(name.to_string());
    }

    /// Names referenced by at least one expression, in first-seen order
    pub fn referenced_names(&self) -> Vec<String> {
        self.referenced.read().iter().cloned().collect()
    }

    /// Referenced names that have no binding yet
    pub fn unbound_names(&self) -> Vec<String> {
        let functions = self.functions.read();
        self.referenced
            .read()
            .iter()
            .filter(|name| !functions.contains_key(name.as_str()))
            .cloned()
            .collect()
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let registered = self.functions.read().len();
        let referenced = self.referenced.read().len();
        RegistryStats {
            registered,
            referenced,
            unbound: self.unbound_names().len(),
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("registered", &self.registered_names())
            .field("referenced", &self.referenced_names())
            .finish()
    }
}

/// Statistics about functions in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of bound functions
    pub registered: usize,
    /// Number of distinct names referenced by expressions
    pub referenced: usize,
    /// Referenced names without a binding
    pub unbound: usize,
}

impl RegistryStats {
    /// True when every referenced name has a binding
    pub fn is_ready(&self) -> bool {
        self.unbound == 0
    }
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Registry: {} registered, {} referenced, {} unbound",
            self.registered, self.referenced, self.unbound
        )
    }
}
