//! Error types for the xl document model.

use thiserror::Error;

use xl_engine::{EvalError, ParseError, RefError};

/// Errors that can occur while editing or reading a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Reference(#[from] RefError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("a sheet named {0:?} already exists")]
    DuplicateSheet(String),

    #[error("sheet title must not be empty")]
    EmptySheetTitle,
}

pub type Result<T> = std::result::Result<T, XlError>;
