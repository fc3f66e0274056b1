use std::path::PathBuf;

use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::datetime::TimestampError;

pub type Result<T> = std::result::Result<T, GpxError>;

#[derive(Debug, Error)]
pub enum GpxError {
    /// The XML is malformed or is not a GPX document. Aborts the whole parse.
    #[error("invalid GPX document: {0}")]
    InvalidDocument(#[from] DocumentError),

    /// A point's timestamp could not be parsed when its time was requested.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Structural problems found while building a [`crate::gpx_types::Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unrecognized root element <{name}> (expected <gpx>)")]
    UnrecognizedRoot { name: String },

    #[error("unexpected element <{name}> after the root element")]
    TrailingElement { name: String },

    #[error("unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_display() {
        let err = GpxError::from(DocumentError::MissingAttribute {
            element: "trkpt",
            attribute: "lat",
        });
        assert_eq!(
            err.to_string(),
            "invalid GPX document: Missing attribute 'lat' on <trkpt>"
        );
    }

    #[test]
    fn test_timestamp_error_is_transparent() {
        let err = GpxError::from(TimestampError::UnsupportedFormat { length: 10 });
        assert_eq!(
            err.to_string(),
            TimestampError::UnsupportedFormat { length: 10 }.to_string()
        );
    }

    #[test]
    fn test_io_error_names_path() {
        let err = GpxError::Io {
            path: PathBuf::from("tracks/missing.gpx"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("failed to read tracks/missing.gpx"));
    }
}
