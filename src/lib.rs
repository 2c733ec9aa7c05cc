//! # Competition Results Report
//!
//! Reads the DMT and Trampoline results sheets of a competition workbook and
//! writes one self-contained, filterable HTML report.
//!
//! ## Pipeline
//!
//! 1. **Load**: the `.xlsx` package is opened once; cell values and cell styles
//!    are parsed separately so a broken styles part only affects highlighting.
//! 2. **Detect**: every worksheet is scanned for header rows, each opening a
//!    table block that runs until the next header.
//! 3. **Classify**: discipline, category and age group come from the row's own
//!    label, the table title or the sheet name, in that order of precedence.
//! 4. **Override**: known layouts carry their final rank and score in fixed
//!    columns, which replace the header-detected values when present.
//! 5. **Annotate**: rows with a green fill flag their records.
//! 6. **Render**: records are sorted, grouped and written as HTML, keeping any
//!    user stylesheet found in the previous report.
pub mod config;
pub mod error;
mod helpers;
pub mod report;
pub mod spreadsheet;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::report::annotate::annotate;
use crate::report::classify::classify;
use crate::report::detect::detect_blocks;
use crate::report::detect::extract_records;
use crate::report::overrides::apply_overrides;
use crate::report::render::extract_preserved_css;
use crate::report::render::render_report;
use crate::report::ReportDataset;
use crate::report::ResultRecord;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::Spreadsheet;
use chrono::Local;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Counts and warnings of one report run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sheets: usize,
    pub blocks: usize,
    pub records: usize,
    pub overridden: usize,
    pub highlighted: usize,
    pub warnings: Vec<String>,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sheets, {} tables, {} records ({} overridden, {} highlighted), {} warnings",
            self.sheets,
            self.blocks,
            self.records,
            self.overridden,
            self.highlighted,
            self.warnings.len()
        )
    }
}

/// Extracts, classifies, overrides and annotates the records of a workbook.
pub fn build_dataset(spreadsheet: &mut dyn Spreadsheet, criteria: &Criteria) -> Result<(ReportDataset, RunSummary), ReportError> {
    let sheets = spreadsheet.read_sheets(criteria).with_prefix("Read worksheets")?;
    if sheets.is_empty() {
        warn!("No results sheets found in {}", spreadsheet.name());
    }
    info!("Loaded {} sheets from {}", sheets.len(), spreadsheet.name());

    let mut summary = RunSummary { sheets: sheets.len(), ..RunSummary::default() };
    let mut records = Vec::<ResultRecord>::new();
    for sheet in &sheets {
        let blocks = detect_blocks(sheet);
        let mut sheet_records: Vec<ResultRecord> = blocks
            .iter()
            .flat_map(|block| extract_records(sheet, block))
            .map(|raw| classify(&raw, &sheet.name))
            .collect();
        let overridden = apply_overrides(sheet, &mut sheet_records);
        debug!("Sheet '{}': {} fixed-column overrides", sheet.name, overridden);
        info!("Sheet '{}': {} tables, {} records", sheet.name, blocks.len(), sheet_records.len());
        summary.blocks += blocks.len();
        summary.overridden += overridden;
        records.extend(sheet_records);
    }

    let annotation = annotate(&mut records, &sheets, spreadsheet.styles());
    summary.highlighted = annotation.highlighted;
    summary.warnings.extend(annotation.warning);
    summary.records = records.len();
    Ok((ReportDataset::new(records), summary))
}

/// Runs the whole pipeline and writes the report.
pub fn generate(config: &ReportConfig) -> Result<RunSummary, ReportError> {
    let mut spreadsheet = open_spreadsheet(&config.input)
        .with_prefix(&format!("Open {}", config.input.display()))?;
    let (dataset, summary) = build_dataset(spreadsheet.as_mut(), &config.criteria)?;

    let preserved_css = read_existing(&config.output)?
        .as_deref()
        .and_then(extract_preserved_css);
    if preserved_css.is_some() {
        debug!("Keeping user stylesheet from {}", config.output.display());
    }
    let html = render_report(&dataset, preserved_css.as_deref(), Local::now().naive_local())
        .with_prefix("Render report")?;

    if let Some(parent) = config.output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config.output, html)?;
    info!("Report written to {}", config.output.display());
    Ok(summary)
}

/// Previous report at the output path, if any.
fn read_existing(path: &Path) -> Result<Option<String>, ReportError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error)?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::testing::WorkbookBuilder;
    use crate::spreadsheet::xlsx::XlsxSpreadsheet;
    use pretty_assertions::assert_eq;

    fn results_workbook() -> WorkbookBuilder {
        WorkbookBuilder::new()
            .fill("FFC6EFCE")
            .sheet("DMT", &[
                &["DMT Women - 14-15yrs"],
                &["Pos", "Name", "Club", "Total"],
                &["2", "Cara Jones", "Flyers", "44.1"],
                &["1", "Beth Smith", "Bouncers", "45.25"],
                &["", "", "Flyers", "12"],
                &[],
                &["DMT Men - 14-15yrs"],
                &["Pos", "Name", "Club", "Total"],
                &["1", "Dan Brown", "Flyers", "41"],
            ])
            .row_style(4, 1)
            .sheet("Summary", &[&["Pos", "Name", "Club", "Total"], &["1", "Nobody", "None", "1"]])
            .sheet("tra", &[
                &["Pos", "Name", "Club", "Total", "Category"],
                &["TRA Women - 14-15yrs", "Eve Green", "Bouncers", "30", "Open"],
            ])
    }

    fn config(directory: &Path) -> Result<ReportConfig, ReportError> {
        let input = directory.join("competition_results.xlsx");
        results_workbook().write_to(&input);
        ReportConfig::new(input, directory.join("reports").join("competition_results.html"))
    }

    #[test]
    fn test_build_dataset() -> Result<(), ReportError> {
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("results.xlsx", results_workbook().bytes())?;
        let criteria = ReportConfig::new("in.xlsx", "out.html")?.criteria;
        let (dataset, summary) = build_dataset(&mut spreadsheet, &criteria)?;

        assert_eq!((summary.sheets, summary.blocks, summary.records, summary.highlighted), (2, 3, 4, 1));
        assert!(summary.warnings.is_empty());
        let names: Vec<&str> = dataset.records.iter().map(|record| record.name.as_str()).collect();
        assert_eq!(names, vec!["Dan Brown", "Beth Smith", "Cara Jones", "Eve Green"]);

        let beth = &dataset.records[1];
        assert_eq!(beth.total_score, "45.250");
        assert_eq!(beth.source_row, 4);
        assert!(beth.is_green);
        assert!(!dataset.records[2].is_green);

        let eve = &dataset.records[3];
        assert_eq!((eve.discipline_code.as_str(), eve.category_part.as_str(), eve.age_group.as_str()), ("TRA", "Women", "14-15yrs"));
        assert_eq!(eve.discipline.label(), "Trampoline");
        Ok(())
    }

    #[test]
    fn test_fixed_columns_in_pipeline() -> Result<(), ReportError> {
        let bytes = WorkbookBuilder::new()
            .sheet("DMT Results", &[&["Pos", "Name", "Club", "Total"], &["5", "Amy", "Flyers", "40"]])
            .cell("AZ2", "3")
            .cell("AY2", "47.5")
            .bytes();
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("results.xlsx", bytes)?;
        let (dataset, summary) = build_dataset(&mut spreadsheet, &Criteria::default())?;
        assert_eq!(summary.overridden, 1);
        assert_eq!(dataset.records[0].position, "3");
        assert_eq!(dataset.records[0].total_score, "47.500");
        Ok(())
    }

    #[test]
    fn test_out_of_range_date_cell_keeps_raw_value() -> Result<(), ReportError> {
        let bytes = WorkbookBuilder::new()
            .number_format("yyyy-mm-dd")
            .sheet("DMT", &[&["Pos", "Name", "Club", "Total"], &["1", "Amy", "Flyers", "1000000000"]])
            .styled("D2", 1)
            .bytes();
        let mut spreadsheet = XlsxSpreadsheet::from_bytes("results.xlsx", bytes)?;
        let (dataset, _) = build_dataset(&mut spreadsheet, &Criteria::default())?;
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.records[0].total_score, "1000000000.000");
        Ok(())
    }

    #[test]
    fn test_generate_writes_report() -> Result<(), ReportError> {
        let directory = tempfile::tempdir()?;
        let config = config(directory.path())?;
        let summary = generate(&config)?;
        assert_eq!(summary.records, 4);

        let html = fs::read_to_string(&config.output)?;
        assert!(html.contains("Beth Smith"));
        assert!(!html.contains("Nobody"));
        Ok(())
    }

    #[test]
    fn test_broken_styles_still_render() -> Result<(), ReportError> {
        let directory = tempfile::tempdir()?;
        let input = directory.path().join("broken.xlsx");
        results_workbook().broken_styles().write_to(&input);
        let config = ReportConfig::new(&input, directory.path().join("report.html"))?;

        let summary = generate(&config)?;
        assert_eq!(summary.highlighted, 0);
        assert_eq!(summary.warnings.len(), 1);
        let html = fs::read_to_string(&config.output)?;
        assert!(html.contains("\"isGreen\":false"));
        assert!(!html.contains("\"isGreen\":true"));
        Ok(())
    }

    #[test]
    fn test_regeneration_keeps_marked_css() -> Result<(), ReportError> {
        let directory = tempfile::tempdir()?;
        let config = config(directory.path())?;
        let block = "<style data-preserved-user-css>\n.result-row td { font-size: 18px; }\n</style>";
        fs::create_dir_all(directory.path().join("reports"))?;
        fs::write(&config.output, format!("<html><head>{block}</head><body>old</body></html>"))?;

        generate(&config)?;
        let html = fs::read_to_string(&config.output)?;
        assert!(html.contains(block));
        assert!(!html.contains("<body>old"));
        Ok(())
    }

    #[test]
    fn test_missing_input_is_an_error() -> Result<(), ReportError> {
        let directory = tempfile::tempdir()?;
        let config = ReportConfig::new(directory.path().join("missing.xlsx"), directory.path().join("out.html"))?;
        assert!(generate(&config).is_err());
        assert!(!config.output.exists());
        Ok(())
    }
}
