//! Detection of header/data table blocks embedded in sparse worksheets.
use crate::spreadsheet::sheet::Sheet;
use once_cell::sync::Lazy;
use regex::Regex;

/// Rows above a header searched for a table title.
const TITLE_LOOKBACK_ROWS: usize = 5;

/// Most non-empty cells a row may hold and still read as a joined title line.
const TITLE_MAX_CELLS: usize = 3;

/// Shortest synonym matched when embedded inside a longer header word.
const MIN_EMBEDDED_SYNONYM_LEN: usize = 4;

/// `<text> - <text>` on a single line.
static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\r\n]*\S\s+-\s+\S[^\r\n]*$").expect("Hardcode regex pattern"));

static GENDER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(women|men|girls|boys|ladies|female|male)\b").expect("Hardcode regex pattern")
});

/// Role a header cell plays in a table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnRole {
    Position,
    Name,
    Forename,
    Surname,
    Club,
    Total,
    Age,
    Gender,
}

/// Header synonyms per role.
///
/// Exact matches are tried for every role before any containment match, and
/// containment is tried in table order, so the more specific roles come first.
const HEADER_SYNONYMS: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::Forename, &["forename", "first name", "firstname", "given name", "christian name"]),
    (ColumnRole::Surname, &["surname", "last name", "lastname", "family name"]),
    (ColumnRole::Position, &["pos", "position", "place", "placing", "rank", "pl"]),
    (ColumnRole::Total, &["total", "total score", "final score", "score", "overall", "result", "final total"]),
    (ColumnRole::Club, &["club", "team", "club name", "club team", "organisation", "organization"]),
    (ColumnRole::Gender, &["gender", "sex"]),
    (ColumnRole::Age, &["age", "age group", "agegroup", "age category", "category", "age cat", "cat"]),
    (ColumnRole::Name, &["name", "gymnast", "gymnast name", "competitor", "competitor name", "athlete", "full name"]),
];

/// Lowercases and collapses punctuation and whitespace to single spaces.
pub fn normalize_header(text: &str) -> String {
    text.to_lowercase()
        .split(|character: char| !character.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of matching one header cell against the synonym table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeaderMatch {
    pub role: ColumnRole,
    /// Whole-cell synonym match rather than containment
    pub exact: bool,
}

/// Classifies a header cell: exact synonym first, then a synonym contained as whole words,
/// then a longer synonym embedded anywhere in the header.
pub fn classify_header(text: &str) -> Option<HeaderMatch> {
    let header = normalize_header(text);
    if header.is_empty() {
        return None;
    }
    let exact = HEADER_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&header.as_str()))
        .map(|(role, _)| HeaderMatch { role: *role, exact: true });
    if exact.is_some() {
        return exact;
    }
    let padded = format!(" {header} ");
    let compact = header.replace(' ', "");
    HEADER_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|synonym| padded.contains(&format!(" {synonym} "))))
        .or_else(|| {
            // Run-together headers such as `ClubName`; short synonyms must stay whole words
            HEADER_SYNONYMS.iter().find(|(_, synonyms)| {
                synonyms
                    .iter()
                    .map(|synonym| synonym.replace(' ', ""))
                    .any(|synonym| synonym.len() >= MIN_EMBEDDED_SYNONYM_LEN && compact.contains(&synonym))
            })
        })
        .map(|(role, _)| HeaderMatch { role: *role, exact: false })
}

/// 0-based column of each role found in a header row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub position: Option<usize>,
    pub name: Option<usize>,
    pub forename: Option<usize>,
    pub surname: Option<usize>,
    pub club: Option<usize>,
    pub total: Option<usize>,
    pub age: Option<usize>,
    pub gender: Option<usize>,
}

impl ColumnMap {
    fn slot(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Position => &mut self.position,
            ColumnRole::Name => &mut self.name,
            ColumnRole::Forename => &mut self.forename,
            ColumnRole::Surname => &mut self.surname,
            ColumnRole::Club => &mut self.club,
            ColumnRole::Total => &mut self.total,
            ColumnRole::Age => &mut self.age,
            ColumnRole::Gender => &mut self.gender,
        }
    }

    /// A header needs a name (or forename and surname) plus a total or a club.
    pub fn is_header(&self) -> bool {
        let has_name = self.name.is_some() || (self.forename.is_some() && self.surname.is_some());
        has_name && (self.total.is_some() || self.club.is_some())
    }

    /// True when the column holds competitor identity rather than a row label.
    pub fn is_identity_column(&self, col: usize) -> bool {
        [self.name, self.forename, self.surname, self.club].contains(&Some(col))
    }
}

/// Builds the column map of a row; `None` when the row is not a header.
///
/// Per role an exact match beats a containment match, otherwise the leftmost column wins.
pub fn detect_header(texts: &[String]) -> Option<ColumnMap> {
    let mut columns = ColumnMap::default();
    let mut exact = Vec::<ColumnRole>::new();
    for (col, text) in texts.iter().enumerate() {
        let Some(found) = classify_header(text) else { continue };
        let slot = columns.slot(found.role);
        if slot.is_none() || (found.exact && !exact.contains(&found.role)) {
            *slot = Some(col);
            if found.exact {
                exact.push(found.role);
            }
        }
    }
    columns.is_header().then_some(columns)
}

/// One header row and the data rows following it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableBlock {
    /// 0-based header row
    pub header_row: usize,
    pub columns: ColumnMap,
    pub title: Option<String>,
    /// First and last 0-based data rows, inclusive; `start_row > end_row` for an empty block
    pub start_row: usize,
    pub end_row: usize,
}

/// Finds a `<text> - <text>` title in the rows above a header, nearest first.
///
/// Column A alone is preferred; otherwise the non-empty cells of a short row are joined.
pub fn find_title(sheet: &Sheet, header_row: usize, previous_header: Option<usize>) -> Option<String> {
    let lower = header_row
        .saturating_sub(TITLE_LOOKBACK_ROWS)
        .max(previous_header.map(|row| row + 1).unwrap_or(0));
    (lower..header_row).rev().find_map(|row| title_line(sheet, row))
}

/// The `<text> - <text>` title a row holds, from column A alone or a short joined row.
fn title_line(sheet: &Sheet, row: usize) -> Option<String> {
    let first = sheet.text(row, 0);
    let first = first.trim();
    if TITLE_LINE.is_match(first) {
        return Some(first.to_owned());
    }
    let texts: Vec<String> = sheet
        .row_texts(row)
        .into_iter()
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
        .collect();
    let joined = texts.join(" ");
    (texts.len() <= TITLE_MAX_CELLS && TITLE_LINE.is_match(&joined)).then_some(joined)
}

/// Splits a sheet into table blocks.
///
/// Blank rows are skipped and never close a block; a new header closes the
/// current block and opens the next one.
pub fn detect_blocks(sheet: &Sheet) -> Vec<TableBlock> {
    let mut blocks = Vec::<TableBlock>::new();
    let mut last_content_row = None::<usize>;
    for row in sheet.rows() {
        if sheet.is_blank_row(row) {
            continue;
        }
        if let Some(columns) = detect_header(&sheet.row_texts(row)) {
            let previous_header = blocks.last().map(|block| block.header_row);
            if let Some(block) = blocks.last_mut() {
                block.end_row = last_content_row.unwrap_or(block.header_row);
            }
            blocks.push(TableBlock {
                header_row: row,
                title: find_title(sheet, row, previous_header),
                columns,
                start_row: row + 1,
                end_row: row,
            });
        }
        last_content_row = Some(row);
    }
    if let Some(block) = blocks.last_mut() {
        block.end_row = last_content_row.unwrap_or(block.header_row);
    }
    blocks
}

/// Values of one data row before classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 0-based worksheet row
    pub row: usize,
    pub position: String,
    pub name: String,
    pub club: String,
    pub total: String,
    /// Age/category column combined with the gender token
    pub working_age: String,
    /// Column A text when column A is not a name or club column
    pub row_label: Option<String>,
    /// Formatted texts of the whole row
    pub texts: Vec<String>,
    pub title: Option<String>,
}

/// Extracts the data rows of a block.
///
/// Rows without a resolvable name are dropped, as are title lines of a following
/// table that carry no position, club or total.
pub fn extract_records(sheet: &Sheet, block: &TableBlock) -> Vec<RawRecord> {
    let columns = &block.columns;
    let cell = |row: usize, col: Option<usize>| -> String {
        col.map(|col| sheet.text(row, col).trim().to_owned()).unwrap_or_default()
    };
    (block.start_row..=block.end_row)
        .filter(|row| !sheet.is_blank_row(*row))
        .filter_map(|row| {
            let name = resolve_name(&cell(row, columns.name), &cell(row, columns.forename), &cell(row, columns.surname));
            if name.is_empty() {
                return None;
            }
            let scored = [columns.position, columns.club, columns.total]
                .into_iter()
                .any(|col| !cell(row, col).is_empty());
            if !scored && title_line(sheet, row).is_some() {
                return None;
            }
            let row_label = (!columns.is_identity_column(0))
                .then(|| sheet.text(row, 0).trim().to_owned())
                .filter(|text| !text.is_empty());
            Some(RawRecord {
                row,
                position: cell(row, columns.position),
                name,
                club: cell(row, columns.club),
                total: cell(row, columns.total),
                working_age: working_age_group(&cell(row, columns.age), &cell(row, columns.gender)),
                row_label,
                texts: sheet.row_texts(row),
                title: block.title.clone(),
            })
        })
        .collect()
}

/// Name column first, else forename and surname joined.
pub fn resolve_name(name: &str, forename: &str, surname: &str) -> String {
    let name = name.trim();
    if !name.is_empty() {
        return name.to_owned();
    }
    [forename.trim(), surname.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Gender word of a text, normalized to `Women`, `Men`, `Girls` or `Boys`.
///
/// Single-letter `F`/`M` codes are accepted when they make up the whole text.
pub fn detect_gender(text: &str) -> Option<&'static str> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("f") {
        return Some("Women");
    }
    if text.eq_ignore_ascii_case("m") {
        return Some("Men");
    }
    let captures = GENDER_TOKEN.captures(text)?;
    match captures[1].to_lowercase().as_str() {
        "women" | "ladies" | "female" => Some("Women"),
        "men" | "male" => Some("Men"),
        "girls" => Some("Girls"),
        "boys" => Some("Boys"),
        _ => None,
    }
}

/// Age text prefixed with the gender token unless the age text already names a gender.
pub fn working_age_group(age: &str, gender: &str) -> String {
    let age = age.trim();
    if GENDER_TOKEN.is_match(age) {
        return age.to_owned();
    }
    match detect_gender(gender) {
        Some(gender) if age.is_empty() => gender.to_owned(),
        Some(gender) => format!("{gender} {age}"),
        None => age.to_owned(),
    }
}
