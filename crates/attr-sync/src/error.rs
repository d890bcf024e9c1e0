use attr_tree::AttrError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("attribute error: {0}")]
    Attr(#[from] AttrError),

    #[error("delta entry has an empty path")]
    EmptyPath,

    #[error("delta entry for {0} carries an empty payload")]
    EmptyPayload(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
