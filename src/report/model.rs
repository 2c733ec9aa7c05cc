use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Display;

/// Leading numeric part of a position such as `3`, `3=` or `12.5`.
static POSITION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("Hardcode regex pattern"));

/// Top-level competition discipline, serialized by its display label.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Discipline {
    #[default]
    #[serde(rename = "DMT")]
    Dmt,
    #[serde(rename = "DMT Disability - DMD")]
    DmtDisability,
    #[serde(rename = "Trampoline")]
    Trampoline,
    #[serde(rename = "Trampoline Disability - TPD")]
    TrampolineDisability,
}

impl Discipline {
    pub fn label(&self) -> &'static str {
        match self {
            Discipline::Dmt => "DMT",
            Discipline::DmtDisability => "DMT Disability - DMD",
            Discipline::Trampoline => "Trampoline",
            Discipline::TrampolineDisability => "Trampoline Disability - TPD",
        }
    }

    /// Short discipline code.
    pub fn code(&self) -> &'static str {
        match self {
            Discipline::Dmt => "DMT",
            Discipline::DmtDisability => "DMD",
            Discipline::Trampoline => "TRA",
            Discipline::TrampolineDisability => "TPD",
        }
    }
}

impl Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One competitor result extracted from a worksheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub position: String,
    pub name: String,
    pub club: String,
    /// Three decimals when numeric, trimmed text otherwise
    pub total_score: String,
    pub discipline: Discipline,
    pub discipline_code: String,
    pub category_part: String,
    pub age_group: String,
    pub source_sheet: String,
    /// 1-based worksheet row
    pub source_row: usize,
    pub is_green: bool,
}

impl ResultRecord {
    /// Composite key the report groups by.
    pub fn group_key(&self) -> (&str, &str, &str) {
        (self.discipline.label(), &self.category_part, &self.age_group)
    }

    /// Human readable group label, skipping empty parts.
    pub fn group_label(&self) -> String {
        let (discipline, category, age) = self.group_key();
        [discipline, category, age]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

/// Numeric value of a position, `None` for non-numeric positions like `DNF`.
pub fn position_value(position: &str) -> Option<f64> {
    POSITION_NUMBER
        .captures(position)
        .and_then(|captures| captures[1].parse::<f64>().ok())
}

/// Report ordering: group key, then numeric position with non-numeric last, then name.
pub fn compare_records(a: &ResultRecord, b: &ResultRecord) -> Ordering {
    a.group_key()
        .cmp(&b.group_key())
        .then_with(|| match (position_value(&a.position), position_value(&b.position)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Formats a total score with three decimals when it is numeric.
///
/// Applying it to its own output returns the same string.
pub fn format_score(value: &str) -> String {
    let value = value.trim();
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => format!("{number:.3}"),
        _ => value.to_owned(),
    }
}

/// Final record set with the value lists the report filters offer.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDataset {
    pub records: Vec<ResultRecord>,
    pub disciplines: Vec<String>,
    pub categories: Vec<String>,
    pub age_groups: Vec<String>,
    pub clubs: Vec<String>,
}

impl ReportDataset {
    /// Sorts the records into report order and collects the filter values.
    pub fn new(mut records: Vec<ResultRecord>) -> Self {
        records.sort_by(compare_records);
        let values = |field: fn(&ResultRecord) -> &str| -> Vec<String> {
            records
                .iter()
                .map(field)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let disciplines = values(|record| record.discipline.label());
        let categories = values(|record| &record.category_part);
        let age_groups = values(|record| &record.age_group);
        let clubs = values(|record| &record.club);
        ReportDataset {
            records,
            disciplines,
            categories,
            age_groups,
            clubs,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn record(discipline: Discipline, category: &str, age: &str, position: &str, name: &str) -> ResultRecord {
    ResultRecord {
        position: position.to_owned(),
        name: name.to_owned(),
        club: "Flyers".to_owned(),
        total_score: "40.000".to_owned(),
        discipline,
        discipline_code: discipline.code().to_owned(),
        category_part: category.to_owned(),
        age_group: age.to_owned(),
        source_sheet: "DMT".to_owned(),
        source_row: 2,
        is_green: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(" 12.345 "), "12.345");
        assert_eq!(format_score("45.2"), "45.200");
        assert_eq!(format_score("40"), "40.000");
        assert_eq!(format_score(" DNS "), "DNS");
        assert_eq!(format_score("inf"), "inf");
        assert_eq!(format_score(""), "");
    }

    #[test]
    fn test_format_score_is_idempotent() {
        for value in ["12.345", "0.1", "99.9999", "-3", "DNF", "  7 "] {
            let once = format_score(value);
            assert_eq!(format_score(&once), once);
        }
    }

    #[test]
    fn test_position_value() {
        assert_eq!(position_value("3"), Some(3.0));
        assert_eq!(position_value("3="), Some(3.0));
        assert_eq!(position_value(" 12.5"), Some(12.5));
        assert_eq!(position_value("DNF"), None);
    }

    #[test]
    fn test_dataset_sort_order() {
        let dataset = ReportDataset::new(vec![
            record(Discipline::Dmt, "Women", "14-15yrs", "2", "Cara"),
            record(Discipline::Dmt, "Women", "14-15yrs", "DNF", "Abby"),
            record(Discipline::Dmt, "Women", "14-15yrs", "1", "Beth"),
            record(Discipline::Dmt, "Men", "14-15yrs", "1", "Dan"),
        ]);
        let order: Vec<(&str, &str)> = dataset
            .records
            .iter()
            .map(|record| (record.category_part.as_str(), record.position.as_str()))
            .collect();
        assert_eq!(order, vec![("Men", "1"), ("Women", "1"), ("Women", "2"), ("Women", "DNF")]);
        assert_eq!(dataset.categories, vec!["Men", "Women"]);
        assert_eq!(dataset.disciplines, vec!["DMT"]);
    }

    #[test]
    fn test_record_serializes_camel_case() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(record(Discipline::DmtDisability, "Men", "Open", "1", "Eli"))?;
        assert_eq!(value["discipline"], "DMT Disability - DMD");
        assert_eq!(value["disciplineCode"], "DMD");
        assert_eq!(value["sourceRow"], 2);
        assert_eq!(value["isGreen"], false);
        Ok(())
    }

    #[test]
    fn test_group_label_skips_empty_parts() {
        assert_eq!(record(Discipline::Trampoline, "", "Unknown", "1", "Fay").group_label(), "Trampoline - Unknown");
    }
}
