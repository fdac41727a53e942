//! Event bus error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("undeclared event: {0}")]
    Undeclared(String),
}
