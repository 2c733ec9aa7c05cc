use crate::error::ReportError;
use glob::MatchOptions;
use glob::Pattern;

/// Criteria for selecting data from a workbook.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Whether sheet name patterns match case-sensitively.
    pub case_sensitive: bool,
}

impl Criteria {
    /// Builds criteria accepting sheets whose names match any of the glob patterns.
    pub fn with_sheet_names(patterns: &[&str], case_sensitive: bool) -> Result<Self, ReportError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Criteria {
            sheet_name_patterns: Some(patterns),
            case_sensitive,
        })
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: self.case_sensitive,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        match &self.sheet_name_patterns {
            Some(patterns) => patterns
                .iter()
                .any(|pattern| pattern.matches_with(sheet_name.trim(), options)),
            None => true,
        }
    }
}
