//! Error types for respan.

use thiserror::Error;

/// Result type for respan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for respan operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An annotation's recorded text does not match the passage text at its
    /// recorded offsets. All mismatches of the example are reported together.
    #[error("EID:{eid} | wrong offsets:\n{}", mismatches.join("\n"))]
    Offsets {
        /// Document id.
        eid: String,
        /// One line per inconsistent annotation.
        mismatches: Vec<String>,
    },

    /// An annotation is still glued to adjoining alphanumeric text.
    /// All residues of the example are reported together.
    #[error("EID:{eid} | intra-word mentions:\n{}", mentions.join("\n"))]
    IntraWordMentions {
        /// Document id.
        eid: String,
        /// One line per offending annotation, with a context window.
        mentions: Vec<String>,
    },

    /// An annotation's post-rewrite text could not be located inside the
    /// rewritten span. Indicates an invalid insertion.
    #[error("EID:{eid} | cannot match annotation `{text}` in rewritten span `{span}`")]
    Remap {
        /// Document id.
        eid: String,
        /// Annotation text that failed to match.
        text: String,
        /// The rewritten span text searched.
        span: String,
    },

    /// Sentinel-masked text could not be matched back to annotation text
    /// during sentence segmentation.
    #[error("EID:{eid} | masking failed: {detail}")]
    Masking {
        /// Document id.
        eid: String,
        /// What went wrong.
        detail: String,
    },

    /// A transformation's length accounting is off: the rewritten text is
    /// not the original length plus the characters inserted.
    #[error("EID:{eid} | {transform}: length of text {actual} != original + inserted {expected}")]
    LengthMismatch {
        /// Document id.
        eid: String,
        /// Name of the transformation that failed.
        transform: &'static str,
        /// Character length of the rewritten text.
        actual: usize,
        /// Expected character length.
        expected: usize,
    },

    /// Two distinct annotations produced the same content hash.
    #[error("EID:{eid} | hash collision: {detail}")]
    HashCollision {
        /// Document id.
        eid: String,
        /// The colliding digest or annotation description.
        detail: String,
    },

    /// A transformation was handed an example that was not prepared.
    #[error("EID:{eid} | example is not prepared: call `prepare()` first")]
    NotPrepared {
        /// Document id.
        eid: String,
    },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a masking error.
    pub fn masking(eid: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Masking {
            eid: eid.into(),
            detail: detail.into(),
        }
    }
}
