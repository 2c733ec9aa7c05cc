use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::helpers::reader::WorkbookReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::open_archive;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::styles::load_styles;
use crate::spreadsheet::styles::load_theme;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::io::BufRead;
use std::path::Path;
use zip::ZipArchive;

// Matched by local name so prefixed exports (`<x:c>`) read the same
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_RUN: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

/// A SpreadsheetML workbook opened once for both values and styles
pub(crate) struct XlsxSpreadsheet {
    /// File name of the workbook
    name: String,
    /// Package archive
    zip: ZipArchive<WorkbookReader>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// Cell formats, or the message of the failure that prevented loading them
    styles: Result<Styles, String>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(path: &Path) -> Result<XlsxSpreadsheet, ReportError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let reader = WorkbookReader::open(path)?;
        Self::from_reader(name, reader)
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<XlsxSpreadsheet, ReportError> {
        Self::from_reader(name.to_owned(), WorkbookReader::from_bytes(bytes))
    }

    fn from_reader(name: String, reader: WorkbookReader) -> Result<XlsxSpreadsheet, ReportError> {
        let mut zip = open_archive(&name, reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip).with_prefix("Load workbook")?;
        let shared_strings = load_shared_strings(&mut zip).with_prefix("Load shared strings")?;
        // a broken styles part must not prevent reading values
        let styles = load_theme(&mut zip)
            .and_then(|theme| load_styles(&mut zip, &theme, is_1904))
            .map_err(|error| error.to_string());
        Ok(XlsxSpreadsheet {
            name,
            zip,
            sheets,
            shared_strings,
            styles,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// Reads worksheets accepted by the criteria.
    ///
    /// Cells carrying a style but no value are kept as empty cells so that row
    /// fills survive on otherwise blank columns.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, ReportError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(sheet_name);
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut style = 0usize;
            let mut value = String::new();
            let mut reader = self.zip.xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            match_xml_events!(reader => {
                Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                    if let Some(index) = event.get_attribute_value("r")?.and_then(|r| row_to_index(&r)) {
                        row_count = index;
                    }
                    col_count = 0;
                }
                Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                    row_count += 1;
                }
                Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count, col_count));
                    col_count = col + 1;
                    value.clear();
                    kind = cell_kind(event.get_attribute_value("t")?.as_deref());
                    style = event.parse_attribute_value::<usize>("s")?.unwrap_or(0);
                }
                Event::Start(event) if kind != CellType::Empty && event.local_name().as_ref() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if kind != CellType::Empty && event.local_name().as_ref() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                    let mut decimals = None;
                    if value.is_empty() {
                        kind = CellType::Empty;
                    } else if kind == CellType::SharedString {
                        let index = value.trim().parse::<usize>()?;
                        value = self.shared_strings.get(index).cloned().unwrap_or_default();
                    } else if kind == CellType::Number {
                        if let Ok(styles) = &self.styles {
                            let format = styles.format(style);
                            kind = format.kind;
                            decimals = format.decimals;
                        }
                    }
                    if kind != CellType::Empty || style != 0 {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: std::mem::take(&mut value),
                            decimals,
                            style,
                        });
                    }
                    kind = CellType::default();
                    style = 0;
                }
            });
            sheets.push(sheet);
        }

        Ok(sheets)
    }

    fn styles(&self) -> Result<&Styles, SpreadsheetError> {
        self.styles
            .as_ref()
            .map_err(|message| SpreadsheetError::StylesError(message.to_owned()))
    }
}

/// Loads worksheet names and package paths in workbook order, plus the date system
fn load_workbook(zip: &mut ZipArchive<WorkbookReader>) -> Result<(Vec<(String, String)>, bool), ReportError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            // `r:id`, whatever prefix the relationships namespace got
            let relationship = event
                .attributes()
                .flatten()
                .find(|attribute| attribute.key.local_name().as_ref() == b"id")
                .map(|attribute| attribute.get_value())
                .transpose()?;
            let path = relationship.and_then(|id| relationships.get(id.as_ref()));
            if let Some((name, path)) = name.zip(path) {
                sheets.push((name.to_string(), path.to_owned()));
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Cell type from the `t` attribute; absent means a number.
fn cell_kind(t: Option<&str>) -> CellType {
    match t {
        Some("inlineStr") | Some("str") => CellType::InlineString,
        Some("s") => CellType::SharedString,
        Some("d") => CellType::IsoDateTime,
        Some("b") => CellType::Boolean,
        Some("e") => CellType::Error,
        _ => CellType::Number,
    }
}

fn load_shared_strings(zip: &mut ZipArchive<WorkbookReader>) -> Result<Vec<String>, ReportError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads string content up to `end_tag`, skipping phonetic runs
fn read_string_value<R: BufRead>(reader: &mut XmlReader<R>, end_tag: &[u8], is_text_content: bool) -> Result<String, ReportError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_RUN => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_RUN => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
