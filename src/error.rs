use thiserror::Error;

/// Main error type for the results report generator.
/// Aggregates errors from the standard library, dependencies and internal modules.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ReportError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ReportError::WithContextError(format!("{}: {}", message, e)))
    }
}
