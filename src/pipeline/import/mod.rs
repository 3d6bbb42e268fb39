pub mod format;
pub mod staging;

pub use format::*;
pub use staging::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {extension}. Use PDF, DOCX, TXT, or XML")]
    UnsupportedFormat { extension: String },
}
