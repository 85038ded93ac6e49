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

//! Parsed lookup expressions

use serde_json::Value;
use std::fmt;

/// How often an expression is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// `~name(...)`: resolved on the first successful read, then cached
    Once,
    /// `~~name(...)`: resolved on every read
    Always,
}

impl Arity {
    /// The marker that introduces this arity
    pub fn marker(self) -> &'static str {
        match self {
            Arity::Once => "~",
            Arity::Always => "~~",
        }
    }
}

/// Fallback used when the lookup function reports not-found
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSpec {
    /// Quoted default, returned verbatim as a string
    Literal(String),
    /// Unquoted default, already parsed as JSON
    Json {
        /// Source text as written in the expression
        source: String,
        /// Parsed value
        value: Value,
    },
}

impl DefaultSpec {
    /// The value substituted for a missing lookup result
    pub fn to_value(&self) -> Value {
        match self {
            DefaultSpec::Literal(text) => Value::String(text.clone()),
            DefaultSpec::Json { value, .. } => value.clone(),
        }
    }

    /// True for a quoted default
    pub fn is_literal(&self) -> bool {
        matches!(self, DefaultSpec::Literal(_))
    }
}

/// A single deferred function call recognised in a string value
#[derive(Debug, Clone, PartialEq)]
pub struct LookupExpression {
    /// Once or Always
    pub arity: Arity,
    /// Name resolved against the function registry
    pub function: String,
    /// Argument passed to the function, if any
    pub key: Option<Value>,
    /// Fallback for a not-found result
    pub default: Option<DefaultSpec>,
}

impl LookupExpression {
    /// Create an expression without key or default
    pub fn new(arity: Arity, function: impl Into<String>) -> Self {
        Self {
            arity,
            function: function.into(),
            key: None,
            default: None,
        }
    }

    /// Set the key argument
    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the default
    pub fn with_default(mut self, default: DefaultSpec) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether the first successful result is cached
    pub fn is_once(&self) -> bool {
        self.arity == Arity::Once
    }

    /// The key rendered as JSON, for error messages
    pub fn key_display(&self) -> Option<String> {
        self.key.as_ref().map(Value::to_string)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in text.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for LookupExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}(", self.arity.marker(), self.function)?;
        if let Some(key) = &self.key {
            match key {
                Value::String(text) => write_quoted(f, text)?,
                other => write!(f, "{other}")?,
            }
            match &self.default {
                Some(DefaultSpec::Literal(text)) => {
                    f.write_str(", ")?;
                    write_quoted(f, text)?;
                }
                Some(DefaultSpec::Json { source, .. }) => write!(f, ", {source}")?,
                None => {}
            }
        }
        f.write_str(")")
    }
}
