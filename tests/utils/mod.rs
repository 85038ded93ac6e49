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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uplook::{LookupError, LookupResult, MapLookup};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Dutch number names, the table used throughout the tests
pub fn dutch_numbers() -> MapLookup {
    MapLookup::new([("one", "een"), ("two", "twee"), ("three", "drie")])
}

/// Lookup function that counts its invocations
#[derive(Clone, Default)]
pub struct Counter {
    calls: Arc<AtomicUsize>,
}

impl Counter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the invocation number, starting at 1
    pub fn sequence(&self) -> impl Fn(Option<&Value>) -> LookupResult + Send + Sync + 'static {
        let calls = self.calls.clone();
        move |_| Ok(json!(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    /// Always signals not-found
    pub fn missing(&self) -> impl Fn(Option<&Value>) -> LookupResult + Send + Sync + 'static {
        let calls = self.calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LookupError::not_found("nothing here"))
        }
    }
}
