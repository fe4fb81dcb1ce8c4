//! Assertion evaluation against a probe response.
//!
//! Pure: given the response descriptor and the configured assertions,
//! produces a list of human-readable failure reasons. An empty list means
//! the probe passed. Every assertion is evaluated independently so a single
//! probe can report multiple simultaneous violations.

use std::collections::HashMap;

use regex::Regex;

use crate::config::{Assertion, AssertionOp};

/// Evaluate all assertions and collect every failure reason.
///
/// `headers` keys must be lowercase (header lookup is case-insensitive).
/// `body` is `None` when the caller decided no assertion needed the body;
/// a body assertion evaluated against `None` is a caller contract violation
/// and surfaces as a distinct failure reason rather than a panic.
#[must_use]
pub fn evaluate(
    assertions: &[Assertion],
    status_code: Option<u16>,
    headers: &HashMap<String, String>,
    elapsed_ms: u64,
    body: Option<&str>,
) -> Vec<String> {
    let mut failures = Vec::new();

    for assertion in assertions {
        match assertion {
            Assertion::StatusCode { op, expected } => {
                if let Some(reason) = check_status(*op, status_code, *expected) {
                    failures.push(reason);
                }
            }
            Assertion::Header { name, op, expected } => {
                let field = format!("Header \"{name}\"");
                let actual = headers.get(&name.to_ascii_lowercase()).map(String::as_str);
                // Missing headers read as "" for is/is-not, but contains-style
                // operators must never pass against a missing header.
                let actual = match op {
                    AssertionOp::Is | AssertionOp::IsNot => Some(actual.unwrap_or("")),
                    _ => actual,
                };
                if let Some(reason) = check_text(*op, &field, actual, expected) {
                    failures.push(reason);
                }
            }
            Assertion::Body { op, expected } => match body {
                None => failures.push(
                    "Body assertion configured but response body was not captured".to_string(),
                ),
                Some(body) => {
                    if let Some(reason) = check_text(*op, "Body", Some(body), expected) {
                        failures.push(reason);
                    }
                }
            },
            Assertion::ResponseTime { max_ms } => {
                // Strict boundary: equality fails.
                if elapsed_ms >= *max_ms {
                    failures.push(format!(
                        "Response time {elapsed_ms}ms exceeded limit {max_ms}ms"
                    ));
                }
            }
        }
    }

    failures
}

/// Status codes compare as integers for `is`/`is-not`; any other operator
/// compares against the decimal text of the code.
fn check_status(op: AssertionOp, actual: Option<u16>, expected: u16) -> Option<String> {
    match op {
        AssertionOp::Is => match actual {
            Some(code) if code == expected => None,
            Some(code) => Some(format!("Status code is {code}, expected {expected}")),
            None => Some(format!("Status code unavailable, expected {expected}")),
        },
        AssertionOp::IsNot => match actual {
            Some(code) if code == expected => {
                Some(format!("Status code is {code}, expected anything else"))
            }
            _ => None,
        },
        _ => {
            let text = actual.map(|code| code.to_string());
            check_text(op, "Status code", text.as_deref(), &expected.to_string())
        }
    }
}

/// Compare a text field. `actual == None` means the field is missing; that
/// reads as "" for `is`/`is-not` at the call site and is always a failure
/// for the remaining operators.
fn check_text(op: AssertionOp, field: &str, actual: Option<&str>, expected: &str) -> Option<String> {
    let Some(actual) = actual else {
        return Some(match op {
            AssertionOp::Contains => {
                format!("{field} is missing, expected to contain \"{expected}\"")
            }
            AssertionOp::NotContains => {
                format!("{field} is missing, expected to not contain \"{expected}\"")
            }
            AssertionOp::Matches => {
                format!("{field} is missing, expected to match \"{expected}\"")
            }
            _ => format!("{field} is missing"),
        });
    };

    match op {
        AssertionOp::Is => {
            (actual != expected).then(|| format!("{field} is \"{actual}\", expected \"{expected}\""))
        }
        AssertionOp::IsNot => {
            (actual == expected).then(|| format!("{field} is \"{actual}\", expected anything else"))
        }
        AssertionOp::Contains => {
            (!actual.contains(expected)).then(|| format!("{field} does not contain \"{expected}\""))
        }
        AssertionOp::NotContains => {
            actual.contains(expected).then(|| format!("{field} contains \"{expected}\""))
        }
        AssertionOp::Matches => match Regex::new(expected) {
            // Unanchored: substring search semantics.
            Ok(re) => {
                (!re.is_match(actual)).then(|| format!("{field} does not match \"{expected}\""))
            }
            Err(e) => Some(format!("Invalid regex \"{expected}\" for {field}: {e}")),
        },
        AssertionOp::LessThan => {
            let Ok(actual_num) = actual.trim().parse::<i64>() else {
                return Some(format!("{field} value \"{actual}\" is not numeric"));
            };
            let Ok(expected_num) = expected.trim().parse::<i64>() else {
                return Some(format!("{field} expectation \"{expected}\" is not numeric"));
            };
            (actual_num >= expected_num)
                .then(|| format!("{field} is {actual_num}, expected less than {expected_num}"))
        }
    }
}
