// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Placeholder tokenizer and resolver
//!
//! Task text may reference earlier step outputs through the reserved token
//! form `step_N_output`. This module implements the token scanner and the
//! resolver that substitutes stored outputs.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Constrained template language for inter-step data flow
//!
//! Resolution rules for a token referencing step `j`, resolved at step `k`:
//! - `j >= k` is a forward reference and always fails: a step may never
//!   depend on itself or a later step.
//! - `j < k` with no stored entry means the sequencer resolved out of order,
//!   which is an internal invariant breach, not a user error.
//! - Otherwise the stored value is substituted verbatim.
//!
//! Text that merely resembles a token (`step_0_output`, `step_x_output`,
//! `step__output`) does not match the canonical pattern and passes through
//! untouched. Step indices are 1-based, so a leading zero can never name an
//! entry.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::domain::context::ContextStore;

/// Canonical token pattern. Indices are positive integers.
const STEP_OUTPUT_PATTERN: &str = r"step_([1-9][0-9]*)_output";

fn step_output_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Pattern is a checked constant; compilation cannot fail at runtime.
    RE.get_or_init(|| Regex::new(STEP_OUTPUT_PATTERN).expect("canonical step-output pattern"))
}

/// One lexical piece of a scanned task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, emitted unchanged.
    Literal(&'a str),

    /// Canonical reference to a prior step's output.
    StepRef { index: usize, raw: &'a str },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(
        "step {step} references step_{referenced}_output, which is not an earlier step"
    )]
    ForwardReference { step: usize, referenced: usize },

    #[error(
        "step {step} references step_{referenced}_output before that output was written"
    )]
    MissingStepOutput { step: usize, referenced: usize },
}

/// Scan text into literal and step-reference segments.
///
/// The scanner is total: every input produces a segment list, and joining
/// the raw text of all segments reproduces the input byte for byte.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in step_output_regex().captures_iter(text) {
        let whole = caps.get(0).expect("match has a whole-capture");
        if whole.start() > cursor {
            segments.push(Segment::Literal(&text[cursor..whole.start()]));
        }

        let digits = caps.get(1).expect("pattern has an index group").as_str();
        match digits.parse::<usize>() {
            // Canonical reference.
            Ok(index) => segments.push(Segment::StepRef {
                index,
                raw: whole.as_str(),
            }),
            // Index too large for usize: treat as literal text, same as any
            // other non-canonical shape.
            Err(_) => segments.push(Segment::Literal(whole.as_str())),
        }
        cursor = whole.end();
    }

    if cursor < text.len() {
        segments.push(Segment::Literal(&text[cursor..]));
    }

    segments
}

/// Substitute step-output references in `text`, as seen from `step_index`.
///
/// Deterministic and idempotent: resolving the same text against an
/// unchanged store yields byte-identical output every time.
pub fn resolve(
    text: &str,
    step_index: usize,
    store: &ContextStore,
) -> Result<String, ResolveError> {
    let segments = tokenize(text);
    let mut resolved = String::with_capacity(text.len());

    for segment in segments {
        match segment {
            Segment::Literal(literal) => resolved.push_str(literal),
            Segment::StepRef { index, .. } => {
                if index >= step_index {
                    return Err(ResolveError::ForwardReference {
                        step: step_index,
                        referenced: index,
                    });
                }
                match store.get(index) {
                    Some(value) => resolved.push_str(value),
                    None => {
                        return Err(ResolveError::MissingStepOutput {
                            step: step_index,
                            referenced: index,
                        })
                    }
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(usize, &str)]) -> ContextStore {
        let mut store = ContextStore::new();
        for (index, value) in entries {
            store.write(*index, (*value).to_string()).unwrap();
        }
        store
    }

    #[test]
    fn tokenize_splits_literals_and_refs() {
        let segments = tokenize("Summarize step_1_output and step_2_output briefly");
        assert_eq!(
            segments,
            vec![
                Segment::Literal("Summarize "),
                Segment::StepRef {
                    index: 1,
                    raw: "step_1_output"
                },
                Segment::Literal(" and "),
                Segment::StepRef {
                    index: 2,
                    raw: "step_2_output"
                },
                Segment::Literal(" briefly"),
            ]
        );
    }

    #[test]
    fn tokenize_roundtrips_input() {
        let text = "a step_1_output b step_x_output step_12_output";
        let rebuilt: String = tokenize(text)
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => *l,
                Segment::StepRef { raw, .. } => *raw,
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn substitutes_stored_values_verbatim() {
        let store = store_with(&[(1, "42"), (2, "ok")]);
        let resolved = resolve("result=step_1_output status=step_2_output", 3, &store).unwrap();
        assert_eq!(resolved, "result=42 status=ok");
    }

    #[test]
    fn forward_reference_to_later_step_fails() {
        let store = store_with(&[(1, "x")]);
        let err = resolve("needs step_3_output", 2, &store).unwrap_err();
        assert_eq!(
            err,
            ResolveError::ForwardReference {
                step: 2,
                referenced: 3
            }
        );
    }

    #[test]
    fn self_reference_fails_as_forward_reference() {
        let store = store_with(&[(1, "x")]);
        let err = resolve("needs step_2_output", 2, &store).unwrap_err();
        assert_eq!(
            err,
            ResolveError::ForwardReference {
                step: 2,
                referenced: 2
            }
        );
    }

    #[test]
    fn missing_earlier_output_fails() {
        let store = store_with(&[(1, "x")]);
        let err = resolve("needs step_2_output", 3, &store).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingStepOutput {
                step: 3,
                referenced: 2
            }
        );
    }

    #[test]
    fn non_canonical_shapes_pass_through() {
        let store = store_with(&[(1, "42")]);
        let text = "step_0_output step_x_output stepp_1_output step__output";
        assert_eq!(resolve(text, 2, &store).unwrap(), text);
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        let store = ContextStore::new();
        assert_eq!(
            resolve("Compute 2+2", 1, &store).unwrap(),
            "Compute 2+2"
        );
    }

    #[test]
    fn resolve_is_idempotent_over_unchanged_store() {
        let store = store_with(&[(1, "alpha"), (2, "beta")]);
        let text = "combine step_1_output with step_2_output";

        let first = resolve(text, 3, &store).unwrap();
        let second = resolve(text, 3, &store).unwrap();
        assert_eq!(first, second);
    }
}
