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

//! Resolution slots for prepared expressions

use crate::parser::{Arity, LookupExpression, SharedExpression};
use once_cell::sync::OnceCell;
use serde_json::Value;

/// A parsed expression bound to one field, with its resolution slot
///
/// `Once` expressions own a slot that is filled by the first successful lookup and
/// never emptied again. `Always` expressions have no slot.
#[derive(Debug)]
pub struct PreparedLookup {
    expression: SharedExpression,
    slot: Option<OnceCell<Value>>,
}

impl PreparedLookup {
    /// Allocate the slot required by the expression's arity
    pub fn new(expression: SharedExpression) -> Self {
        let slot = match expression.arity {
            Arity::Once => Some(OnceCell::new()),
            Arity::Always => None,
        };
        Self { expression, slot }
    }

    /// The parsed expression
    pub fn expression(&self) -> &LookupExpression {
        &self.expression
    }

    /// The pinned value of a resolved `Once` expression
    pub fn cached(&self) -> Option<&Value> {
        self.slot.as_ref().and_then(OnceCell::get)
    }

    /// True once a `Once` expression has been resolved successfully
    pub fn is_resolved(&self) -> bool {
        self.cached().is_some()
    }

    pub(crate) fn slot(&self) -> Option<&OnceCell<Value>> {
        self.slot.as_ref()
    }
}
