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

//! Container configuration options

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What preparation does with a string that starts like a lookup call but does not
/// match the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Fail preparation with `MalformedExpression`
    #[default]
    Reject,
    /// Keep the string as a literal and log a warning
    Literal,
}

/// Configuration for preparation and resolution behavior
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpLookConfig {
    /// Maximum time a single lookup function may take (None waits forever)
    pub lookup_timeout: Option<Duration>,

    /// Handling of malformed lookup expressions
    pub malformed_policy: MalformedPolicy,

    /// Whether identical expression strings share one parse
    pub parse_cache_enabled: bool,

    /// Whether `export()` keeps fields whose value is null
    pub include_null_in_export: bool,
}

impl UpLookConfig {
    /// Create a new configuration with custom settings
    pub fn new(lookup_timeout: Option<Duration>, malformed_policy: MalformedPolicy) -> Self {
        Self {
            lookup_timeout,
            malformed_policy,
            ..Self::default()
        }
    }

    /// Reject malformed expressions and bound every lookup to 30 seconds
    pub fn strict() -> Self {
        Self {
            lookup_timeout: Some(Duration::from_secs(30)),
            malformed_policy: MalformedPolicy::Reject,
            parse_cache_enabled: true,
            include_null_in_export: true,
        }
    }

    /// Keep malformed expressions as literals and never time out
    pub fn lenient() -> Self {
        Self {
            lookup_timeout: None,
            malformed_policy: MalformedPolicy::Literal,
            parse_cache_enabled: true,
            include_null_in_export: true,
        }
    }

    /// Create a configuration for testing
    pub fn testing() -> Self {
        Self {
            lookup_timeout: Some(Duration::from_millis(500)), // Short enough to keep tests fast
            malformed_policy: MalformedPolicy::Reject,
            parse_cache_enabled: false,
            include_null_in_export: true,
        }
    }

    /// Set the lookup timeout
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// Set the malformed-expression policy
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    /// Set whether `export()` keeps null values
    pub fn with_null_in_export(mut self, include: bool) -> Self {
        self.include_null_in_export = include;
        self
    }
}

impl Default for UpLookConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: None,
            malformed_policy: MalformedPolicy::Reject,
            parse_cache_enabled: true,
            include_null_in_export: true,
        }
    }
}
