use thiserror::Error;

use crate::value::Record;

/// All errors produced by the utility helpers and database wrappers
#[derive(Error, Debug)]
pub enum Error {
    #[error("not connected")]
    NotConnected,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("decoded data is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A row scan failed after some records were already read.
    #[error("row scan stopped after {} records: {source}", records.len())]
    Scan {
        records: Vec<Record>,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    MySql(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// Wrap a mid-scan failure, keeping whatever records were read before it.
    ///
    /// With nothing read yet the driver error is returned as-is.
    pub fn scan(records: Vec<Record>, source: impl Into<Error>) -> Self {
        let source = source.into();
        if records.is_empty() {
            source
        } else {
            Error::Scan {
                records,
                source: Box::new(source),
            }
        }
    }

    /// Records collected before a scan failure, if any.
    pub fn partial_records(&self) -> Option<&[Record]> {
        match self {
            Error::Scan { records, .. } => Some(records),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
