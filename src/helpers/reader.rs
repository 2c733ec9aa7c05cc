use crate::error::ReportError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// Byte source of a workbook package: a file on disk or an in-memory copy
pub(crate) enum WorkbookReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer
    Memory(Cursor<Vec<u8>>),
}

impl WorkbookReader {
    /// Opens a local workbook file
    pub(crate) fn open(path: &Path) -> Result<WorkbookReader, ReportError> {
        let file = File::open(path)?;
        Ok(WorkbookReader::Local(BufReader::new(file)))
    }

    /// Wraps workbook bytes already held in memory
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> WorkbookReader {
        WorkbookReader::Memory(Cursor::new(bytes))
    }
}

impl Read for WorkbookReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            WorkbookReader::Local(reader) => reader.read(buf),
            WorkbookReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for WorkbookReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            WorkbookReader::Local(reader) => reader.seek(pos),
            WorkbookReader::Memory(reader) => reader.seek(pos),
        }
    }
}
