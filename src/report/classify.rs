//! Discipline, category and age-group classification of extracted rows.
use crate::report::detect::RawRecord;
use crate::report::model::format_score;
use crate::report::model::Discipline;
use crate::report::model::ResultRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Age group used when nothing else resolves one.
pub const UNKNOWN_AGE_GROUP: &str = "Unknown";

/// Table titles such as `DMT Women - 14-15yrs`.
static TITLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(TRA|TPD|DMT|DMD)\s+(.+?)\s*-\s*(.+)$").expect("Hardcode regex pattern")
});

/// Column A labels such as `TRA Women - 14-15yrs`.
static ROW_LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{3})\s*(.*?)\s*-\s*(.+)$").expect("Hardcode regex pattern"));

/// Any row cell matching one of these marks a disability result.
static DISABILITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)disab", r"(?i)\bdmd\b", r"(?i)\btrd\b"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Hardcode regex pattern"))
        .collect()
});

/// Sheet names that hold deduction-adjusted disability results.
static DEDUCTION_SHEET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)deduct").expect("Hardcode regex pattern"));

/// Discipline code, category and age parsed from a title or a row label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedLabel {
    pub code: String,
    pub category: String,
    pub age: String,
}

fn parse_label(pattern: &Regex, text: &str) -> Option<ParsedLabel> {
    let captures = pattern.captures(text.trim())?;
    Some(ParsedLabel {
        code: captures[1].to_uppercase(),
        category: captures[2].trim().to_owned(),
        age: captures[3].trim().to_owned(),
    })
}

pub fn parse_title(title: &str) -> Option<ParsedLabel> {
    parse_label(&TITLE_PATTERN, title)
}

pub fn parse_row_label(label: &str) -> Option<ParsedLabel> {
    parse_label(&ROW_LABEL_PATTERN, label)
}

fn is_dmt_sheet(sheet_name: &str) -> bool {
    sheet_name.to_lowercase().contains("dmt")
}

/// Display discipline of a code; unknown codes default from the sheet name.
pub fn simplify_discipline(code: &str, sheet_name: &str) -> Discipline {
    match code.to_uppercase().as_str() {
        "TRA" | "TPD" => Discipline::Trampoline,
        "DMT" | "DMD" => Discipline::Dmt,
        _ if is_dmt_sheet(sheet_name) => Discipline::Dmt,
        _ => Discipline::Trampoline,
    }
}

/// True when any cell of the row names a disability category.
pub fn is_disability_row(texts: &[String]) -> bool {
    texts
        .iter()
        .any(|text| DISABILITY_PATTERNS.iter().any(|pattern| pattern.is_match(text)))
}

/// Discipline derived from the sheet name and the row when no title applies.
pub fn fallback_discipline(sheet_name: &str, texts: &[String]) -> Discipline {
    let disability = is_disability_row(texts) || DEDUCTION_SHEET.is_match(sheet_name);
    match (is_dmt_sheet(sheet_name), disability) {
        (true, false) => Discipline::Dmt,
        (true, true) => Discipline::DmtDisability,
        (false, false) => Discipline::Trampoline,
        (false, true) => Discipline::TrampolineDisability,
    }
}

/// Turns an extracted row into a result record.
///
/// The row's own column A label wins over the table title, which wins over the
/// sheet-name fallback.
pub fn classify(raw: &RawRecord, sheet_name: &str) -> ResultRecord {
    let fallback = fallback_discipline(sheet_name, &raw.texts);
    let mut discipline = fallback;
    let mut code = fallback.code().to_owned();
    let mut category = String::new();
    let mut age = String::new();

    let parsed = raw
        .row_label
        .as_deref()
        .and_then(parse_row_label)
        .or_else(|| raw.title.as_deref().and_then(parse_title));
    if let Some(label) = parsed {
        discipline = simplify_discipline(&label.code, sheet_name);
        code = label.code;
        category = label.category;
        age = label.age;
    }

    let age_group = [age.as_str(), raw.working_age.trim()]
        .into_iter()
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_AGE_GROUP)
        .to_owned();

    ResultRecord {
        position: raw.position.trim().to_owned(),
        name: raw.name.to_owned(),
        club: raw.club.trim().to_owned(),
        total_score: format_score(&raw.total),
        discipline,
        discipline_code: code,
        category_part: category,
        age_group,
        source_sheet: sheet_name.to_owned(),
        source_row: raw.row + 1,
        is_green: false,
    }
}
