//! Assertions for remote API errors and text output
//!
//! # Example
//!
//! ```ignore
//! use stratus::assertions::{assert_error, assert_re_search};
//!
//! let ec2 = stratus::catalog::ec2()?;
//!
//! // Creating the same key pair twice must fail with InvalidKeyPair.Duplicate
//! assert_error(
//!     ec2.get("client.InvalidKeyPair.Duplicate").unwrap(),
//!     client.create_key_pair("test-key").await,
//! )?;
//!
//! assert_re_search(r"Linux version \d+", &console_output)?;
//! ```

use regex::Regex;

use crate::matcher::{MatchFailure, MatcherNode};

/// Error type for assertion failures
#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    #[error("expected a service error matching {0}, but the call succeeded")]
    NotRaised(String),

    #[error("{0}")]
    Mismatch(MatchFailure),

    #[error("assertion failed: {message}")]
    Failed { message: String },

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Assert that `result` is an error matching `expected`
///
/// Returns the error on success so tests can look at its message.
pub fn assert_error<T, E>(expected: &MatcherNode, result: Result<T, E>) -> Result<E, AssertionError>
where
    E: std::error::Error + 'static,
{
    match result {
        Ok(_) => Err(AssertionError::NotRaised(expected.path().to_string())),
        Err(e) => match expected.match_error(&e) {
            None => Ok(e),
            Some(failure) => Err(AssertionError::Mismatch(failure)),
        },
    }
}

fn compile(pattern: &str) -> Result<Regex, AssertionError> {
    Regex::new(pattern).map_err(|e| AssertionError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Regex anchored at the start only, like a prefix match
fn compile_prefix(pattern: &str) -> Result<Regex, AssertionError> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| AssertionError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Assert that `pattern` occurs somewhere in `text`
pub fn assert_re_search(pattern: &str, text: &str) -> Result<(), AssertionError> {
    if compile(pattern)?.is_match(text) {
        Ok(())
    } else {
        Err(AssertionError::Failed {
            message: format!("regexp: '{}' not found in '{}'", pattern, text),
        })
    }
}

/// Assert that `pattern` occurs nowhere in `text`
pub fn assert_not_re_search(pattern: &str, text: &str) -> Result<(), AssertionError> {
    if compile(pattern)?.is_match(text) {
        Err(AssertionError::Failed {
            message: format!("regexp: '{}' found in '{}'", pattern, text),
        })
    } else {
        Ok(())
    }
}

/// Assert that `text` starts with a match for `pattern`
pub fn assert_re_match(pattern: &str, text: &str) -> Result<(), AssertionError> {
    if compile_prefix(pattern)?.is_match(text) {
        Ok(())
    } else {
        Err(AssertionError::Failed {
            message: format!("regexp: '{}' not matches on '{}'", pattern, text),
        })
    }
}

/// Assert that `text` does not start with a match for `pattern`
pub fn assert_not_re_match(pattern: &str, text: &str) -> Result<(), AssertionError> {
    if compile_prefix(pattern)?.is_match(text) {
        Err(AssertionError::Failed {
            message: format!("regexp: '{}' matches on '{}'", pattern, text),
        })
    } else {
        Ok(())
    }
}
