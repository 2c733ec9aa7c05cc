//! # Spreadsheet Module
//!
//! Reads SpreadsheetML workbooks (`.xlsx`, `.xlsm`) into sparse [`Sheet`] grids.
//! Every cell keeps its raw value together with its style index so that number
//! formats and fill colors can be resolved through [`Styles`] afterwards.
pub mod cell;
pub mod criteria;
mod excel;
pub mod reference;
pub mod sheet;
pub mod styles;
pub(crate) mod xlsx;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::ReportError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format for '{0}'")]
    UnsupportedFormat(String),

    #[error("'{0}' is an encrypted or legacy compound document")]
    CompoundFileError(String),

    #[error("Missing package part '{0}'")]
    FileError(String),

    #[error("Styles unavailable: {0}")]
    StylesError(String),
}

/// A workbook that can yield its worksheets and resolve cell styles.
pub trait Spreadsheet {
    /// Display name of the workbook, usually its file name.
    fn name(&self) -> String;

    /// Reads the worksheets accepted by the criteria, in workbook order.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, ReportError>;

    /// Resolved cell formats, or the reason they could not be loaded.
    fn styles(&self) -> Result<&Styles, SpreadsheetError>;
}

/// Opens a workbook, choosing the reader by file extension.
pub fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, ReportError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => {
            let spreadsheet: Box<dyn Spreadsheet> = Box::new(XlsxSpreadsheet::open(path)?);
            Ok(spreadsheet)
        }
        _ => Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()).into()),
    }
}
