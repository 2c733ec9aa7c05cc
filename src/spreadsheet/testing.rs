//! In-memory `.xlsx` packages for tests.
use crate::helpers::reader::WorkbookReader;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

enum StyleSpec {
    Fill(String),
    NumberFormat(String),
}

#[derive(Default)]
struct SheetSpec {
    name: String,
    cells: BTreeMap<(usize, usize), (Option<String>, Option<usize>)>,
}

/// Builds a minimal SpreadsheetML package.
///
/// Registered styles get `cellXfs` indexes in registration order starting at 1;
/// index 0 is the default format.
#[derive(Default)]
pub(crate) struct WorkbookBuilder {
    sheets: Vec<SheetSpec>,
    styles: Vec<StyleSpec>,
    broken_styles: bool,
    inline_strings: bool,
    date1904: bool,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a solid fill style with an `AARRGGBB` color.
    pub(crate) fn fill(mut self, argb: &str) -> Self {
        self.styles.push(StyleSpec::Fill(argb.to_owned()));
        self
    }

    /// Registers a custom number format style.
    pub(crate) fn number_format(mut self, code: &str) -> Self {
        self.styles.push(StyleSpec::NumberFormat(code.to_owned()));
        self
    }

    /// Writes a styles part that cannot be parsed.
    pub(crate) fn broken_styles(mut self) -> Self {
        self.broken_styles = true;
        self
    }

    /// Writes text as inline strings instead of shared strings.
    pub(crate) fn inline_strings(mut self) -> Self {
        self.inline_strings = true;
        self
    }

    pub(crate) fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Adds a sheet whose rows start at A1; empty strings leave the cell out.
    pub(crate) fn sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let mut sheet = SheetSpec { name: name.to_owned(), ..SheetSpec::default() };
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if !value.is_empty() {
                    sheet.cells.insert((row, col), (Some((*value).to_owned()), None));
                }
            }
        }
        self.sheets.push(sheet);
        self
    }

    /// Sets a value on the last added sheet.
    pub(crate) fn cell(mut self, reference: &str, value: &str) -> Self {
        let key = reference_to_index(reference).expect("valid reference");
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.cells.entry(key).or_default().0 = Some(value.to_owned());
        }
        self
    }

    /// Applies a registered style to one cell of the last added sheet.
    pub(crate) fn styled(mut self, reference: &str, style: usize) -> Self {
        let key = reference_to_index(reference).expect("valid reference");
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.cells.entry(key).or_default().1 = Some(style);
        }
        self
    }

    /// Applies a registered style to every populated cell of a 1-based row.
    pub(crate) fn row_style(mut self, row: usize, style: usize) -> Self {
        if let Some(sheet) = self.sheets.last_mut() {
            for ((cell_row, _), (_, cell_style)) in sheet.cells.iter_mut() {
                if *cell_row + 1 == row {
                    *cell_style = Some(style);
                }
            }
        }
        self
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        let mut shared_strings = Vec::<String>::new();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let part = |writer: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, content: &str| {
            writer.start_file(name, options).expect("start part");
            writer.write_all(content.as_bytes()).expect("write part");
        };

        let mut workbook = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
        workbook.push_str(&format!(r#"<workbookPr date1904="{}"/><sheets>"#, if self.date1904 { 1 } else { 0 }));
        let mut relationships = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for (index, sheet) in self.sheets.iter().enumerate() {
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(sheet.name.as_str()), index + 1, index + 1
            ));
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                index + 1, index + 1
            ));
        }
        workbook.push_str("</sheets></workbook>");
        relationships.push_str("</Relationships>");
        part(&mut writer, "xl/workbook.xml", &workbook);
        part(&mut writer, "xl/_rels/workbook.xml.rels", &relationships);

        for (index, sheet) in self.sheets.iter().enumerate() {
            let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
            let mut current_row = None::<usize>;
            for ((row, col), (value, style)) in &sheet.cells {
                if current_row != Some(*row) {
                    if current_row.is_some() {
                        xml.push_str("</row>");
                    }
                    xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
                    current_row = Some(*row);
                }
                let reference = index_to_reference(*row, *col);
                let style = style.map(|style| format!(r#" s="{style}""#)).unwrap_or_default();
                match value {
                    None => xml.push_str(&format!(r#"<c r="{reference}"{style}/>"#)),
                    Some(value) if value.parse::<f64>().is_ok() => {
                        xml.push_str(&format!(r#"<c r="{reference}"{style}><v>{value}</v></c>"#))
                    }
                    Some(value) if self.inline_strings => xml.push_str(&format!(
                        r#"<c r="{reference}"{style} t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(value.as_str())
                    )),
                    Some(value) => {
                        let id = match shared_strings.iter().position(|string| string == value) {
                            Some(id) => id,
                            None => {
                                shared_strings.push(value.to_owned());
                                shared_strings.len() - 1
                            }
                        };
                        xml.push_str(&format!(r#"<c r="{reference}"{style} t="s"><v>{id}</v></c>"#));
                    }
                }
            }
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            part(&mut writer, &format!("xl/worksheets/sheet{}.xml", index + 1), &xml);
        }

        let mut strings = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
            shared_strings.len()
        );
        for string in &shared_strings {
            strings.push_str(&format!("<si><t>{}</t></si>", escape(string.as_str())));
        }
        strings.push_str("</sst>");
        part(&mut writer, "xl/sharedStrings.xml", &strings);

        part(&mut writer, "xl/styles.xml", &self.styles_xml());
        let cursor = writer.finish().expect("finish package");
        cursor.into_inner()
    }

    fn styles_xml(&self) -> String {
        if self.broken_styles {
            return r#"<styleSheet><cellXfs count="1"><xf numFmtId="not-a-number"/></cellXfs></styleSheet>"#.to_owned();
        }
        let mut formats = String::new();
        let mut fills = String::from(r#"<fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>"#);
        let mut xfs = String::from(r#"<xf numFmtId="0" fillId="0"/>"#);
        let mut fill_id = 2;
        let mut format_id = 164;
        for style in &self.styles {
            match style {
                StyleSpec::Fill(argb) => {
                    fills.push_str(&format!(
                        r#"<fill><patternFill patternType="solid"><fgColor rgb="{argb}"/><bgColor indexed="64"/></patternFill></fill>"#
                    ));
                    xfs.push_str(&format!(r#"<xf numFmtId="0" fillId="{fill_id}" applyFill="1"/>"#));
                    fill_id += 1;
                }
                StyleSpec::NumberFormat(code) => {
                    formats.push_str(&format!(r#"<numFmt numFmtId="{format_id}" formatCode="{}"/>"#, escape(code.as_str())));
                    xfs.push_str(&format!(r#"<xf numFmtId="{format_id}" fillId="0" applyNumberFormat="1"/>"#));
                    format_id += 1;
                }
            }
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts>{formats}</numFmts><fills>{fills}</fills><cellStyleXfs><xf numFmtId="0" fillId="0"/></cellStyleXfs><cellXfs>{xfs}</cellXfs><dxfs><dxf><fill><patternFill><bgColor rgb="FFFF0000"/></patternFill></fill></dxf></dxfs></styleSheet>"#
        )
    }

    pub(crate) fn archive(&self) -> ZipArchive<WorkbookReader> {
        ZipArchive::new(WorkbookReader::from_bytes(self.bytes())).expect("valid package")
    }

    pub(crate) fn write_to(&self, path: &Path) {
        std::fs::write(path, self.bytes()).expect("write workbook");
    }
}
