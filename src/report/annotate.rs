use crate::report::model::ResultRecord;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::styles::Rgb;
use crate::spreadsheet::styles::Styles;
use crate::spreadsheet::SpreadsheetError;
use std::collections::HashMap;

/// Green channel floor of a highlight fill.
const HIGHLIGHT_MIN_GREEN: u8 = 150;
/// Margin green must keep over both red and blue.
const HIGHLIGHT_MARGIN: i16 = 20;

/// Whether a fill reads as the green used to flag qualifying results.
pub fn is_highlight_green(rgb: Rgb) -> bool {
    let (red, green, blue) = (rgb.red as i16, rgb.green as i16, rgb.blue as i16);
    rgb.green >= HIGHLIGHT_MIN_GREEN && green - red > HIGHLIGHT_MARGIN && green - blue > HIGHLIGHT_MARGIN
}

/// Highlight flags keyed by sheet name and 1-based row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightIndex {
    rows: HashMap<(String, usize), bool>,
}

impl HighlightIndex {
    /// Flags every row holding at least one green-filled cell.
    pub fn build(sheets: &[Sheet], styles: &Styles) -> Self {
        let mut rows = HashMap::<(String, usize), bool>::new();
        for sheet in sheets {
            for cell in &sheet.cells {
                if styles.fill(cell.style).map(is_highlight_green).unwrap_or(false) {
                    rows.insert((sheet.name.to_owned(), cell.row + 1), true);
                }
            }
        }
        HighlightIndex { rows }
    }

    pub fn is_highlighted(&self, sheet: &str, row: usize) -> bool {
        self.rows.get(&(sheet.to_owned(), row)).copied().unwrap_or(false)
    }

    /// Number of highlighted rows.
    pub fn len(&self) -> usize {
        self.rows.values().filter(|highlighted| **highlighted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of the annotation phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Records flagged green
    pub highlighted: usize,
    /// Reason the phase was skipped, if it was
    pub warning: Option<String>,
}

/// Sets `is_green` on every record whose source row is highlighted.
///
/// Unavailable styles are not fatal: records keep `is_green == false` and the
/// failure comes back as a warning.
pub fn annotate(records: &mut [ResultRecord], sheets: &[Sheet], styles: Result<&Styles, SpreadsheetError>) -> Annotation {
    let styles = match styles {
        Ok(styles) => styles,
        Err(error) => {
            let warning = format!("Row highlighting skipped: {error}");
            tracing::warn!("{}", warning);
            return Annotation { highlighted: 0, warning: Some(warning) };
        }
    };

    let index = HighlightIndex::build(sheets, styles);
    tracing::debug!("{} highlighted rows across {} sheets", index.len(), sheets.len());
    let mut highlighted = 0usize;
    for record in records.iter_mut() {
        record.is_green = index.is_highlighted(&record.source_sheet, record.source_row);
        if record.is_green {
            highlighted += 1;
        }
    }
    Annotation { highlighted, warning: None }
}
