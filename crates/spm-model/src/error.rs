use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid data id: {0:?}")]
    InvalidDataId(String),
    #[error("unknown file kind: {0:?}")]
    UnknownFileKind(String),
    #[error("unknown channel {channel:?}")]
    UnknownChannel { channel: String },
    #[error("channel {channel:?} has no {direction} data")]
    MissingDirection { channel: String, direction: String },
    #[error("property {key:?} is missing or has the wrong type")]
    BadProperty { key: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
