//! MSBuild condition parser and evaluator.
//!
//! Parses and evaluates the `Condition` attributes found in `.vcxproj` /
//! `.csproj` property groups and imports, for example:
//!
//! - `'$(Configuration)|$(Platform)'=='Debug|Win32'`
//! - `'$(Platform)'!=''`
//! - `exists('packages.config')`
//!
//! Uses [`chumsky`] for the parsing grammar. Conditions are parsed *after*
//! `$(name)` expansion (see [`crate::property::PropertyStore::expand`]), so
//! the grammar only ever sees plain quoted literals.
//!
//! ## Grammar (keywords case-insensitive)
//!
//! ```text
//! condition  = comparison | exists
//! comparison = quoted ('==' | '!=') quoted
//! exists     = 'exists' '(' quoted ')'
//! quoted     = "'" chars "'"
//! ```
//!
//! This is the entire grammar: no `and`/`or`, no numeric comparison, no
//! escaping inside literals. Build files in the wild only ever emit this
//! subset, and a wider grammar would accept inputs whose semantics are
//! unspecified here.

use std::path::Path;

use chumsky::prelude::*;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed condition expression over already-expanded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `'lhs' == 'rhs'` or `'lhs' != 'rhs'`.
    Compare {
        lhs: String,
        op: CompareOp,
        rhs: String,
    },
    /// `exists('path')` — true iff a filesystem entry exists at the path.
    Exists(String),
}

/// Comparison operator used inside a [`Condition::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the chumsky parser for condition expressions.
fn condition_parser<'a>() -> impl Parser<'a, &'a str, Condition, extra::Err<Simple<'a, char>>> {
    // ── Single-quoted string literal ─────────────────────────────────────
    let quoted = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''))
        .map(str::to_string);

    // ── Comparison operators ─────────────────────────────────────────────
    let cmp_op = just("==")
        .to(CompareOp::Equal)
        .or(just("!=").to(CompareOp::NotEqual));

    // ── Comparison:  'lhs' op 'rhs' ──────────────────────────────────────
    let comparison = quoted
        .clone()
        .padded()
        .then(cmp_op.padded())
        .then(quoted.clone().padded())
        .map(|((lhs, op), rhs)| Condition::Compare { lhs, op, rhs });

    // ── Case-insensitive alphabetic word (for keyword matching) ──────────
    let alpha_word = any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .repeated()
        .at_least(1)
        .to_slice();

    // ── exists('path') ───────────────────────────────────────────────────
    let exists = alpha_word
        .filter(|s: &&str| s.eq_ignore_ascii_case("exists"))
        .ignore_then(just('(').padded())
        .ignore_then(quoted)
        .then_ignore(just(')').padded())
        .map(Condition::Exists);

    choice((comparison, exists)).padded()
}

/// Parse a condition string (already `$(name)`-expanded) into a
/// [`Condition`].
///
/// Any shape outside the supported grammar is a parse error, returned to the
/// caller — never a panic. Callers decide whether a parse error means "skip
/// the subtree" or "keep it".
pub fn parse_condition(input: &str) -> Result<Condition> {
    condition_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            Error::Condition {
                text: input.to_string(),
                detail: messages.join("; "),
            }
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate a parsed condition.
///
/// `exists(…)` consults the real filesystem; the path literal is used as-is.
pub fn evaluate(condition: &Condition) -> bool {
    match condition {
        Condition::Compare { lhs, op, rhs } => match op {
            CompareOp::Equal => lhs == rhs,
            CompareOp::NotEqual => lhs != rhs,
        },
        Condition::Exists(path) => Path::new(path).exists(),
    }
}

/// Parse and evaluate an expanded condition string.
///
/// Empty or whitespace-only text is vacuously true — an element without a
/// meaningful condition is always processed.
pub fn evaluate_text(text: &str) -> Result<bool> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(true);
    }
    parse_condition(trimmed).map(|c| evaluate(&c))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
