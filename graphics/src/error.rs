//! Render index error types.

use hydrant_core::{PrimPath, Token};
use thiserror::Error;

/// Errors that can occur while tracking changes or syncing rprims.
///
/// None of these are fatal to a sync pass: the render index logs the error,
/// leaves the failing rprim's dirty bits set and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// An operation needed the rprim's topology before it was populated.
    #[error("no topology set for {0}")]
    MissingTopology(PrimPath),
    /// A repr was updated before it was initialized.
    #[error("repr {repr} of {path} used before initialization")]
    ReprNotInitialized {
        /// The rprim.
        path: PrimPath,
        /// The requested repr.
        repr: Token,
    },
    /// The private dirty-bit range has no room for another claim.
    #[error("custom dirty bits exhausted registering {key} ({requested} bits requested)")]
    CustomBitsExhausted {
        /// Configuration key of the rprim type.
        key: String,
        /// Number of bits requested.
        requested: u32,
    },
    /// A buffer source disagrees with the element count of its range.
    #[error("source {name} has {actual} elements, range expects {expected}")]
    SourceSizeMismatch {
        /// Source name.
        name: Token,
        /// Elements the range was sized for.
        expected: usize,
        /// Elements the source produced.
        actual: usize,
    },
    /// A source could not be converted into buffer data.
    #[error("source {name} holds {type_name}, which has no buffer layout")]
    UnsupportedValue {
        /// Source name.
        name: Token,
        /// Held value type.
        type_name: &'static str,
    },
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for render index operations.
pub type Result<T> = std::result::Result<T, GraphicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::MissingTopology(PrimPath::new("/curves"));
        assert_eq!(err.to_string(), "no topology set for /curves");

        let err = GraphicsError::SourceSizeMismatch {
            name: Token::new("points"),
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "source points has 3 elements, range expects 4"
        );
    }
}
