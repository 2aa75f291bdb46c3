//! Error types for the finmsg library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during parsing and generation.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed XML markup.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Query expression outside the supported XPath subset.
    #[error("XPath error: {0}")]
    XPathError(String),

    /// Error parsing the SWIFT MT tag grammar.
    #[error("MT parsing error at line {line}: {message}")]
    MtParseError { line: usize, message: String },

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Missing required MT field.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A required XML node was not found.
    #[error("Required node not found: {0}")]
    RequiredNode(String),

    /// Wrong document subtype, unsupported version or illegal field content.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// GVC lookup on a code outside the catalogue.
    #[error("Unknown GVC code: {0}")]
    UnknownGvcCode(String),

    /// Document failed a field constraint check.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Invalid format specified.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// General parsing error.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Conversion error between formats.
    #[error("Conversion error: {0}")]
    ConversionError(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl Error {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
