pub mod types;
pub mod plain_text;
pub mod pdf;
pub mod docx;
pub mod xml;
pub mod normalize;

pub use types::*;
pub use normalize::*;
pub use xml::{flatten_element, parse_xml, XmlElement};

use thiserror::Error;

use crate::pipeline::import::DocumentFormat;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text encoding error: {0}")]
    Decode(String),

    #[error("Invalid XML file: {0}")]
    InvalidXml(String),

    #[error("Could not read {format} file: {reason}")]
    Read {
        format: DocumentFormat,
        reason: String,
    },
}
