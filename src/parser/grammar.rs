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

//! nom grammar for lookup expressions
//!
//! ```text
//! expr        := marker funcname "(" ws [ arglist ] ws ")"
//! marker      := "~" | "~~"
//! arglist     := key_arg [ ws "," ws default_arg ]
//! key_arg     := quoted_string | json_scalar
//! default_arg := quoted_string | json_array | json_object | json_scalar
//! ```
//!
//! A string is only treated as an expression when it starts with a call head (a marker,
//! an optional function name and an opening parenthesis). Anything else is a literal.
//! Once the head matched, every deviation from the grammar is an error.

use super::expression::{Arity, DefaultSpec, LookupExpression};
use crate::error::{Result, UpLookError};
use nom::{
    IResult, Offset, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, one_of, satisfy, space0},
    combinator::{cut, eof, map, opt, recognize, value},
    error::{ErrorKind, ParseError},
    sequence::{pair, preceded},
};
use serde_json::Value;

/// Grammar error carrying the remaining input and what was expected there
#[derive(Debug, Clone, Copy, PartialEq)]
struct GrammarError<'a> {
    input: &'a str,
    expected: &'static str,
}

impl<'a> ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        let expected = match kind {
            ErrorKind::Eof => "end of expression",
            ErrorKind::Char => "character",
            ErrorKind::Tag => "marker",
            _ => "valid expression",
        };
        Self { input, expected }
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

type GrammarResult<'a, O> = IResult<&'a str, O, GrammarError<'a>>;

/// Relabel the error of `parser` with a description of what it expects
fn expect<'a, O, P>(
    expected: &'static str,
    mut parser: P,
) -> impl FnMut(&'a str) -> GrammarResult<'a, O>
where
    P: Parser<&'a str, Output = O, Error = GrammarError<'a>>,
{
    move |input| {
        parser
            .parse(input)
            .map_err(|err| err.map(|e| GrammarError { expected, ..e }))
    }
}

#[derive(Debug, PartialEq)]
enum RawKey<'a> {
    Quoted(String),
    Scalar(&'a str),
}

#[derive(Debug, PartialEq)]
enum RawDefault<'a> {
    Quoted(String),
    Json(&'a str),
}

#[derive(Debug, PartialEq)]
struct RawCall<'a> {
    arity: Arity,
    function: &'a str,
    key: Option<RawKey<'a>>,
    default: Option<RawDefault<'a>>,
}

fn ws(input: &str) -> GrammarResult<'_, &str> {
    space0(input)
}

fn marker(input: &str) -> GrammarResult<'_, Arity> {
    alt((value(Arity::Always, tag("~~")), value(Arity::Once, tag("~")))).parse(input)
}

fn function_name(input: &str) -> GrammarResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

/// Marker, optional function name and opening parenthesis, with nothing in between
fn call_head(input: &str) -> GrammarResult<'_, ()> {
    let (input, _) = marker(input)?;
    let (input, _) = opt(function_name).parse(input)?;
    let (input, _) = expect("'('", char('('))(input)?;
    Ok((input, ()))
}

/// Single- or double-quoted string; `\\` and an escaped quote are the only escapes
fn quoted(input: &str) -> GrammarResult<'_, String> {
    let opening: GrammarResult<'_, char> = one_of("\"'").parse(input);
    let (body, quote) = opening?;
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((index, c)) = chars.next() {
        if c == quote {
            return Ok((&body[index + c.len_utf8()..], text));
        }
        if c == '\\' {
            if let Some(next) = body[index + 1..].chars().next() {
                if next == quote || next == '\\' {
                    text.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        text.push(c);
    }
    Err(nom::Err::Failure(GrammarError {
        input,
        expected: "closing quote",
    }))
}

fn scalar_token(input: &str) -> GrammarResult<'_, &str> {
    take_while1(|c: char| c != ',' && c != ')' && !c.is_whitespace()).parse(input)
}

/// Unquoted default: a JSON array or object, or a scalar token
///
/// Arrays and objects end where the JSON reader stops. When they do not parse, the
/// text up to the final closing parenthesis is taken so it can be reported as an
/// invalid default.
fn json_text(input: &str) -> GrammarResult<'_, &str> {
    if input.starts_with(['[', '{']) {
        let mut values = serde_json::Deserializer::from_str(input).into_iter::<Value>();
        let end = match values.next() {
            Some(Ok(_)) => values.byte_offset(),
            _ => input.rfind(')').map_or(input.len(), |end| input[..end].trim_end().len()),
        };
        return Ok((&input[end..], &input[..end]));
    }
    scalar_token(input)
}

fn key_arg(input: &str) -> GrammarResult<'_, RawKey<'_>> {
    alt((map(quoted, RawKey::Quoted), map(scalar_token, RawKey::Scalar))).parse(input)
}

fn default_arg(input: &str) -> GrammarResult<'_, RawDefault<'_>> {
    alt((map(quoted, RawDefault::Quoted), map(json_text, RawDefault::Json))).parse(input)
}

fn arguments(input: &str) -> GrammarResult<'_, (RawKey<'_>, Option<RawDefault<'_>>)> {
    let (input, key) = key_arg(input)?;
    let (input, default) = opt(preceded(
        (ws, char(',')),
        cut(preceded(ws, expect("default value", default_arg))),
    ))
    .parse(input)?;
    Ok((input, (key, default)))
}

fn call(input: &str) -> GrammarResult<'_, RawCall<'_>> {
    let (input, arity) = marker(input)?;
    let (input, function) = expect("function name", function_name)(input)?;
    let (input, _) = expect("'('", char('('))(input)?;
    let (input, _) = ws(input)?;
    let (input, arguments) = opt(arguments).parse(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = expect("')'", char(')'))(input)?;
    let (input, _) = expect("end of expression", eof)(input)?;

    let (key, default) = match arguments {
        Some((key, default)) => (Some(key), default),
        None => (None, None),
    };
    Ok((
        input,
        RawCall {
            arity,
            function,
            key,
            default,
        },
    ))
}

/// Check whether `source` starts with a lookup call head
pub fn looks_like_lookup(source: &str) -> bool {
    source.starts_with('~') && call_head(source).is_ok()
}

/// Parse `source` into a lookup expression
///
/// Returns `Ok(None)` for literals. Strings that start with a call head but do not match
/// the grammar fail with `MalformedExpression`; an unquoted default that is not JSON
/// fails with `InvalidDefaultSyntax`.
pub fn parse_lookup(source: &str) -> Result<Option<LookupExpression>> {
    if !looks_like_lookup(source) {
        return Ok(None);
    }

    let (_, raw) = call(source).map_err(|err| match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => UpLookError::malformed(
            source,
            source.offset(e.input),
            format!("expected {}", e.expected),
        ),
        nom::Err::Incomplete(_) => {
            UpLookError::malformed(source, source.len(), "unexpected end of expression")
        }
    })?;

    let key = match raw.key {
        None => None,
        Some(RawKey::Quoted(text)) => Some(Value::String(text)),
        Some(RawKey::Scalar(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value) if !value.is_object() && !value.is_array() => Some(value),
            _ => {
                return Err(UpLookError::malformed(
                    source,
                    source.offset(text),
                    format!("key '{text}' must be a quoted string or a JSON scalar"),
                ));
            }
        },
    };

    let default = match raw.default {
        None => None,
        Some(RawDefault::Quoted(text)) => Some(DefaultSpec::Literal(text)),
        Some(RawDefault::Json(text)) => {
            let value = serde_json::from_str::<Value>(text).map_err(|e| {
                UpLookError::InvalidDefaultSyntax {
                    expression: source.to_string(),
                    default: text.to_string(),
                    message: e.to_string(),
                }
            })?;
            Some(DefaultSpec::Json {
                source: text.to_string(),
                value,
            })
        }
    };

    Ok(Some(LookupExpression {
        arity: raw.arity,
        function: raw.function.to_string(),
        key,
        default,
    }))
}
