pub mod client;
pub mod report;

pub use client::*;
pub use report::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Completion service is not reachable at {0}")]
    Connection(String),

    #[error("Completion request timed out after {0}s")]
    Timeout(u64),

    #[error("Completion service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("No report text to work with")]
    EmptyReport,
}
