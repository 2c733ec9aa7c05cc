use crate::error::ReportError;
use chrono::NaiveDate;
use chrono::TimeDelta;
use std::fmt::Display;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Values resolved from the shared string table
    SharedString,
    /// Error values such as `#DIV/0!`
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: usize, is_1904: bool) -> Option<Self> {
        match id {
            22 => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            14..=17 => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            18..=21 | 45..=47 => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Only date and time tokens outside literals and `[...]` sections count.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Number of fixed decimal places of a number format code such as `0.000` or `#,##0.00`.
///
/// Only the first section of the code is looked at. `General` and codes without a
/// decimal point yield `None` and `Some(0)` respectively.
pub(crate) fn parse_decimal_places(format: &str) -> Option<usize> {
    let section = format.split(';').next().unwrap_or_default();
    if section.eq_ignore_ascii_case("general") || !section.contains(['0', '#']) {
        return None;
    }
    match section.find('.') {
        Some(index) => Some(
            section[index + 1..]
                .chars()
                .take_while(|character| matches!(character, '0' | '#'))
                .count(),
        ),
        None => Some(0),
    }
}

/// Built-in number format IDs with a fixed number of decimal places.
pub(crate) fn builtin_decimal_places(id: usize) -> Option<usize> {
    match id {
        1 | 3 | 37 | 38 => Some(0),
        2 | 4 | 39 | 40 => Some(2),
        _ => None,
    }
}

/// Represents a single cell in a worksheet.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Raw cell value as stored in the package
    pub value: String,
    /// Fixed decimal places from the number format, `None` for General
    pub decimals: Option<usize>,
    /// Index into the workbook cell formats (`cellXfs`)
    pub style: usize,
}

impl Cell {
    /// True when the cell holds no visible value.
    pub fn is_blank(&self) -> bool {
        self.kind == CellType::Empty || self.value.trim().is_empty()
    }

    /// Converts cell value to double-precision floating point.
    pub fn to_double(&self) -> Result<f64, ReportError> {
        Ok(self.value.trim().parse::<f64>()?)
    }

    /// Value as displayed by a spreadsheet application, falling back to the raw value
    /// when a numeric value cannot be decoded.
    pub fn text(&self) -> String {
        self.to_string()
    }

    fn formatted(&self) -> Result<String, ReportError> {
        let value = match self.kind {
            CellType::Boolean => if self.value == "1" { "TRUE" } else { "FALSE" }.to_owned(),
            CellType::Number => match self.decimals {
                Some(decimals) => format!("{:.*}", decimals, self.to_double()?),
                None => format_general(self.to_double()?),
            },
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false)?,
            CellType::NumberDate1900 => to_date_string(&self.value, false)?,
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true)?,
            CellType::NumberDate1904 => to_date_string(&self.value, true)?,
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value)?,
            CellType::IsoDateTime => self.value.replace('T', " "),
            _ => self.value.to_owned(),
        };
        Ok(value)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.formatted() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "{}", self.value),
        }
    }
}

/// Renders a number the way the General format does: integers without a fraction,
/// other values rounded to ten significant digits with trailing zeros removed.
pub(crate) fn format_general(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (9 - magnitude).clamp(0, 15) as usize;
    let text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, ReportError> {
    let days = value.parse::<f64>()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)
        .zip(days.checked_add(offset).and_then(TimeDelta::try_days))
        .and_then(|(epoch, duration)| epoch.checked_add_signed(duration))
        .ok_or_else(|| ReportError::WithContextError(format!("Date serial '{value}' is out of range")))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time (fraction of a day) to a clock string.
fn to_time_string(value: &str) -> Result<String, ReportError> {
    let factor = value.parse::<f64>()?.fract();
    let mut hours = (factor * 86_400_000f64).round() as i64;
    let milliseconds = hours % 1_000; hours /= 1_000;
    let seconds = hours % 60; hours /= 60;
    let minutes = hours % 60; hours /= 60;
    let timestamp = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Ok(timestamp)
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Result<String, ReportError> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Ok(format!("{date} {time}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str, decimals: Option<usize>) -> Cell {
        Cell { row: 0, col: 0, kind, value: value.to_owned(), decimals, style: 0 }
    }

    #[test]
    fn test_parse_custom_number_format() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("0.000", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00\"days\"", false), CellType::Number);
    }

    #[test]
    fn test_parse_decimal_places() {
        assert_eq!(parse_decimal_places("0.000"), Some(3));
        assert_eq!(parse_decimal_places("#,##0.00;[Red]-#,##0.00"), Some(2));
        assert_eq!(parse_decimal_places("0"), Some(0));
        assert_eq!(parse_decimal_places("General"), None);
        assert_eq!(parse_decimal_places("@"), None);
    }

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(3.0), "3");
        assert_eq!(format_general(-12.0), "-12");
        assert_eq!(format_general(12.344999999999999), "12.345");
        assert_eq!(format_general(0.5), "0.5");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell(CellType::Number, "3", None).text(), "3");
        assert_eq!(cell(CellType::Number, "45.2", Some(3)).text(), "45.200");
        assert_eq!(cell(CellType::Boolean, "1", None).text(), "TRUE");
        assert_eq!(cell(CellType::NumberDate1900, "45292", None).text(), "2024-01-01");
        assert_eq!(cell(CellType::NumberTime1900, "0.5", None).text(), "12:00:00");
        assert_eq!(cell(CellType::SharedString, "Amy", None).text(), "Amy");
        // undecodable numbers fall back to the raw value
        assert_eq!(cell(CellType::Number, "n/a", None).text(), "n/a");
    }

    #[test]
    fn test_out_of_range_date_serial() {
        assert!(to_date_string("1000000000", false).is_err());
        assert!(to_date_string("-1e300", true).is_err());
        assert_eq!(cell(CellType::NumberDate1900, "1000000000", None).text(), "1000000000");
        assert_eq!(cell(CellType::NumberDateTime1904, "1e20", None).text(), "1e20");
    }

    #[test]
    fn test_is_blank() {
        assert!(cell(CellType::Empty, "", None).is_blank());
        assert!(cell(CellType::InlineString, "   ", None).is_blank());
        assert!(!cell(CellType::Number, "0", None).is_blank());
    }
}
