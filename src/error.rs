//! Error types shared across the crate.

use std::path::PathBuf;

/// Errors that can occur while parsing descriptors or resolving toolchains.
///
/// Every variant carries the offending path or text so diagnostics stay
/// actionable. None of these are used for ordinary control flow: a false
/// condition or a failed probe mid-search is a value, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A solution or project file could not be read.
    #[error("{}: {source}", path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        source: std::io::Error,
    },

    /// A project file is not well-formed XML. Aborts only that file's read.
    #[error("{}: XML error: {source}", path.display())]
    Xml {
        /// The file whose parse failed.
        path: PathBuf,
        source: roxmltree::Error,
    },

    /// A `Condition` attribute does not match the supported grammar.
    ///
    /// Readers log this and keep processing the subtree; it is fatal only
    /// when the caller evaluates a condition directly.
    #[error("condition `{text}` could not be parsed: {detail}")]
    Condition {
        /// The condition text after `$(name)` expansion.
        text: String,
        detail: String,
    },

    /// More than one candidate solution file with no explicit choice.
    #[error("too many solution files: {}", candidates.join(", "))]
    AmbiguousSolution {
        /// Every candidate found, in sorted order.
        candidates: Vec<String>,
    },

    /// No solution file was given or found.
    #[error("no solution files")]
    NoSolution,

    /// An `Import` chain revisited a file already being loaded.
    #[error("import cycle detected at {}", path.display())]
    ImportCycle {
        /// The canonical path that was imported twice.
        path: PathBuf,
    },

    /// Every applicable toolchain probe failed for this solution.
    #[error("{solution}: no usable Visual Studio installation found")]
    ResolutionExhausted {
        /// The solution whose resolution was abandoned.
        solution: String,
    },
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_offending_identifier() {
        let err = Error::AmbiguousSolution {
            candidates: vec!["a.sln".into(), "b.sln".into()],
        };
        assert_eq!(err.to_string(), "too many solution files: a.sln, b.sln");

        let err = Error::ResolutionExhausted { solution: "x.sln".into() };
        assert!(err.to_string().starts_with("x.sln:"));
    }

    #[test]
    fn condition_error_shows_expanded_text() {
        let err = Error::Condition {
            text: "'a' <> 'b'".into(),
            detail: "unexpected token".into(),
        };
        assert!(err.to_string().contains("'a' <> 'b'"));
    }
}
