use std::io;

use thiserror::Error;

/// Errors raised while building, training, loading or applying a tagger model.
#[derive(Debug, Error)]
pub enum Error {
    /// An ambiguity class was met after the class set was frozen.
    #[error("new ambiguity class found for word '{surface}' ({tags}); retrain using an updated dictionary")]
    UnknownAmbiguityClass { surface: String, tags: String },

    /// Tagged and untagged corpora disagree on a surface form.
    #[error("tagged and untagged corpora are not aligned: '{tagged}' -- '{untagged}'")]
    StreamMisalignment { tagged: String, untagged: String },

    #[error("corrupt model: {0}")]
    CorruptModel(String),

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("invalid input at line {line}: {msg}")]
    InvalidInput { line: usize, msg: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Event counts reference tags or classes the model does not have.
    #[error("event counts do not match the model: {0}")]
    CountsMismatch(String),

    #[error("value {0} does not fit a multibyte integer")]
    ValueOutOfRange(u64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
