use crate::error::ReportError;
use crate::spreadsheet::criteria::Criteria;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "data/competition_results.xlsx";
pub const DEFAULT_OUTPUT: &str = "reports/competition_results.html";

/// Worksheets read from the workbook; matched exactly, ignoring case.
pub const SHEET_PATTERNS: &[&str] = &["dmt", "tra"];

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "results_report", version)]
#[command(about = "Generate a filterable HTML report from a competition results workbook.")]
pub struct Args {
    /// Results workbook (.xlsx or .xlsm).
    #[arg(long = "in", visible_alias = "input", value_name = "PATH", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// HTML report to write; parent directories are created.
    #[arg(long = "out", visible_alias = "output", value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

/// Resolved settings of one report run.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub criteria: Criteria,
}

impl ReportConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Result<Self, ReportError> {
        Ok(ReportConfig {
            input: input.into(),
            output: output.into(),
            criteria: Criteria::with_sheet_names(SHEET_PATTERNS, false)?,
        })
    }
}

impl TryFrom<Args> for ReportConfig {
    type Error = ReportError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        ReportConfig::new(args.input, args.output)
    }
}
