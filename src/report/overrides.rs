use crate::report::model::format_score;
use crate::report::model::ResultRecord;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::sheet::Sheet;

/// Sheet layout whose final rank and score sit in fixed columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FixedLayout {
    /// Lowercase token the sheet name must contain
    pub sheet_token: &'static str,
    pub position_column: &'static str,
    pub total_column: &'static str,
}

pub const FIXED_LAYOUTS: &[FixedLayout] = &[
    FixedLayout { sheet_token: "dmt", position_column: "AZ", total_column: "AY" },
    FixedLayout { sheet_token: "tra", position_column: "AO", total_column: "AN" },
];

/// Fixed layout of a sheet, first match wins.
pub fn layout_for(sheet_name: &str) -> Option<&'static FixedLayout> {
    let name = sheet_name.to_lowercase();
    FIXED_LAYOUTS.iter().find(|layout| name.contains(layout.sheet_token))
}

/// Replaces position and total with the fixed-column values of each record's row.
///
/// An empty fixed cell keeps the header-detected value. Returns the number of
/// records that changed.
pub fn apply_overrides(sheet: &Sheet, records: &mut [ResultRecord]) -> usize {
    let Some(layout) = layout_for(&sheet.name) else {
        return 0;
    };
    let (Some(position_col), Some(total_col)) =
        (col_to_index(layout.position_column), col_to_index(layout.total_column))
    else {
        return 0;
    };

    let mut changed = 0usize;
    for record in records.iter_mut().filter(|record| record.source_sheet == sheet.name) {
        let row = record.source_row.saturating_sub(1);
        let position = sheet.text(row, position_col).trim().to_owned();
        let total = sheet.text(row, total_col).trim().to_owned();
        let before = (record.position.clone(), record.total_score.clone());
        if !position.is_empty() {
            record.position = position;
        }
        if !total.is_empty() {
            record.total_score = format_score(&total);
        }
        if before != (record.position.clone(), record.total_score.clone()) {
            changed += 1;
        }
    }
    changed
}
