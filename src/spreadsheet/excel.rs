//! Office Open XML package helpers shared by the workbook loader
use crate::error::ReportError;
use crate::helpers::reader::WorkbookReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of OLE compound files, used by encrypted packages and legacy `.xls`
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Opens the package archive, rejecting compound files up front.
pub(super) fn open_archive(name: &str, mut reader: WorkbookReader) -> Result<ZipArchive<WorkbookReader>, ReportError> {
    if is_compound_file(&mut reader)? {
        Err(SpreadsheetError::CompoundFileError(name.to_owned()))?;
    }
    Ok(ZipArchive::new(reader)?)
}

/// Loads worksheet relationships of a package part
///
/// Returns a mapping of relationship IDs to zip paths.
pub(super) fn load_relationships(zip: &mut ZipArchive<WorkbookReader>, path: &str) -> Result<HashMap<String, String>, ReportError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
pub(crate) fn to_zip_path(path: &str) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Checks for the OLE compound file signature and rewinds the reader
fn is_compound_file(reader: &mut WorkbookReader) -> Result<bool, ReportError> {
    let mut signature = [0u8; 8];
    let matched = match reader.read_exact(&mut signature) {
        Ok(()) => signature == COMPOUND_FILE_SIGNATURE,
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(error) => Err(error)?,
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(matched)
}
