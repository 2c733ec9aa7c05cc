//! Static HTML rendering of a [`ReportDataset`].
//!
//! The document is self-contained: the records are inlined as JSON and a small
//! script filters, sorts and groups them in the browser. The initial table body
//! is rendered here in the same order so the file reads fine without scripting.
use crate::error::ReportError;
use crate::report::model::ReportDataset;
use crate::report::model::ResultRecord;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;

/// Attribute marking the style block kept across regenerations.
pub const PRESERVED_CSS_ATTRIBUTE: &str = "data-preserved-user-css";

static MARKED_STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*\bdata-preserved-user-css\b[^>]*>.*?</style\s*>").expect("Hardcode regex pattern")
});

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("Hardcode regex pattern"));

/// Selectors only the generated base stylesheet uses together.
const BASE_STYLE_SELECTORS: [&str; 2] = [".group-header", ".filter-controls"];

/// Table columns as (heading, record field, part of the group key).
const COLUMNS: [(&str, &str, bool); 7] = [
    ("Pos", "position", false),
    ("Name", "name", false),
    ("Club", "club", false),
    ("Total", "totalScore", false),
    ("Discipline", "discipline", true),
    ("Category", "categoryPart", true),
    ("Age group", "ageGroup", true),
];

const BASE_CSS: &str = r##"
:root { --accent: #1f4e79; --green: #c6efce; --border: #d0d7de; }
* { box-sizing: border-box; }
body { margin: 0; padding: 1rem 1.5rem; font-family: system-ui, -apple-system, "Segoe UI", sans-serif; color: #1b1f24; background: #fff; }
.report-header h1 { margin: 0 0 .25rem; font-size: 1.6rem; color: var(--accent); }
.report-meta { margin: 0 0 1rem; color: #57606a; font-size: .9rem; }
.filter-toggle { display: none; margin-bottom: .75rem; padding: .4rem .9rem; border: 1px solid var(--border); border-radius: 6px; background: #f6f8fa; font: inherit; cursor: pointer; }
.filter-controls { display: flex; flex-wrap: wrap; gap: .75rem 1rem; align-items: flex-end; margin-bottom: 1rem; padding: .75rem; border: 1px solid var(--border); border-radius: 8px; background: #f6f8fa; }
.filter-controls label { display: flex; flex-direction: column; gap: .2rem; font-size: .8rem; font-weight: 600; color: #57606a; }
.filter-controls select, .filter-controls input { min-width: 10rem; padding: .35rem .5rem; border: 1px solid var(--border); border-radius: 6px; font: inherit; font-weight: 400; color: #1b1f24; }
.filter-controls button { padding: .4rem .9rem; border: 1px solid var(--border); border-radius: 6px; background: #fff; font: inherit; cursor: pointer; }
table.results { width: 100%; border-collapse: collapse; font-size: .92rem; }
table.results th, table.results td { padding: .4rem .6rem; border-bottom: 1px solid var(--border); text-align: left; }
table.results thead th { position: sticky; top: 0; background: var(--accent); color: #fff; }
.group-header th { padding-top: 1rem; background: #eef3f8; color: var(--accent); font-size: 1rem; }
.result-row.is-green td { background: var(--green); }
@media (max-width: 720px) {
  body { padding: .75rem; }
  .filter-toggle { display: inline-block; }
  .filter-controls:not(.open) { display: none; }
  .filter-controls label, .filter-controls select, .filter-controls input { width: 100%; }
  table.results thead { display: none; }
  table.results, table.results tbody, table.results tr, table.results td, table.results th { display: block; width: 100%; }
  .group-header th { border-bottom: 2px solid var(--accent); }
  .result-row { margin: .5rem 0; padding: .4rem .6rem; border: 1px solid var(--border); border-radius: 8px; }
  .result-row td { display: flex; justify-content: space-between; padding: .15rem 0; border: 0; }
  .result-row td::before { content: attr(data-label); font-weight: 600; color: #57606a; }
  .result-row td.group-field { display: none; }
}
"##;

const SCRIPT: &str = r##"
(function () {
  "use strict";
  var records = JSON.parse(document.getElementById("report-data").textContent);
  var body = document.getElementById("results-body");
  var count = document.getElementById("visible-count");
  var toggle = document.getElementById("filter-toggle");
  var panel = document.getElementById("filters");
  var search = document.getElementById("filter-name");
  var filters = [
    { element: document.getElementById("filter-discipline"), field: "discipline" },
    { element: document.getElementById("filter-category"), field: "categoryPart" },
    { element: document.getElementById("filter-age"), field: "ageGroup" },
    { element: document.getElementById("filter-club"), field: "club" }
  ];
  var columns = JSON.parse(document.getElementById("report-columns").textContent);

  function positionValue(position) {
    var match = /^\s*(\d+(?:\.\d+)?)/.exec(position || "");
    return match ? parseFloat(match[1]) : null;
  }

  function groupKey(record) {
    return [record.discipline, record.categoryPart, record.ageGroup];
  }

  function groupLabel(record) {
    return groupKey(record).filter(function (part) { return part; }).join(" - ");
  }

  function compareText(a, b) {
    return a < b ? -1 : a > b ? 1 : 0;
  }

  function compareRecords(a, b) {
    var left = groupKey(a), right = groupKey(b);
    for (var i = 0; i < left.length; i++) {
      var order = compareText(left[i], right[i]);
      if (order !== 0) return order;
    }
    var x = positionValue(a.position), y = positionValue(b.position);
    if (x !== null && y !== null && x !== y) return x - y;
    if (x === null && y !== null) return 1;
    if (x !== null && y === null) return -1;
    return compareText(a.name, b.name);
  }

  function matches(record) {
    var needle = search.value.trim().toLowerCase();
    if (needle && record.name.toLowerCase().indexOf(needle) < 0) return false;
    return filters.every(function (filter) {
      return !filter.element.value || record[filter.field] === filter.element.value;
    });
  }

  function groupRow(label) {
    var row = document.createElement("tr");
    row.className = "group-header";
    var cell = document.createElement("th");
    cell.colSpan = columns.length;
    cell.scope = "colgroup";
    cell.textContent = label;
    row.appendChild(cell);
    return row;
  }

  function recordRow(record) {
    var row = document.createElement("tr");
    row.className = record.isGreen ? "result-row is-green" : "result-row";
    columns.forEach(function (column) {
      var cell = document.createElement("td");
      cell.setAttribute("data-label", column[0]);
      if (column[2]) cell.className = "group-field";
      cell.textContent = record[column[1]];
      row.appendChild(cell);
    });
    return row;
  }

  function render() {
    var visible = records.filter(matches).sort(compareRecords);
    var fragment = document.createDocumentFragment();
    var current = null;
    visible.forEach(function (record) {
      var key = JSON.stringify(groupKey(record));
      if (key !== current) {
        fragment.appendChild(groupRow(groupLabel(record)));
        current = key;
      }
      fragment.appendChild(recordRow(record));
    });
    body.replaceChildren(fragment);
    count.textContent = String(visible.length);
  }

  toggle.addEventListener("click", function () {
    var open = panel.classList.toggle("open");
    toggle.setAttribute("aria-expanded", open ? "true" : "false");
  });
  filters.forEach(function (filter) { filter.element.addEventListener("change", render); });
  search.addEventListener("input", render);
  document.getElementById("filter-reset").addEventListener("click", function () {
    filters.forEach(function (filter) { filter.element.value = ""; });
    search.value = "";
    render();
  });
  render();
})();
"##;

/// Finds the user stylesheet of a previously generated report.
///
/// A block carrying [`PRESERVED_CSS_ATTRIBUTE`] is returned verbatim. Failing
/// that, the last non-empty `<style>` block that is not the generated base
/// stylesheet is wrapped in a marked block. `None` when neither exists.
pub fn extract_preserved_css(html: &str) -> Option<String> {
    if let Some(found) = MARKED_STYLE_BLOCK.find(html) {
        return Some(found.as_str().to_owned());
    }
    STYLE_BLOCK
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str())
        .filter(|body| !body.trim().is_empty())
        .filter(|body| !BASE_STYLE_SELECTORS.iter().all(|selector| body.contains(selector)))
        .last()
        .map(|body| format!("<style {PRESERVED_CSS_ATTRIBUTE}>{body}</style>"))
}

fn empty_preserved_block() -> String {
    format!("<style {PRESERVED_CSS_ATTRIBUTE}>\n/* Custom CSS placed here is kept when the report is regenerated. */\n</style>")
}

/// Renders the complete report document.
pub fn render_report(
    dataset: &ReportDataset,
    preserved_css: Option<&str>,
    generated_at: NaiveDateTime,
) -> Result<String, ReportError> {
    // `<` is escaped so record text can never close the script element
    let data = serde_json::to_string(&dataset.records)?.replace('<', "\\u003c");
    let columns = serde_json::to_string(&COLUMNS)?;
    let preserved = preserved_css
        .map(str::to_owned)
        .unwrap_or_else(empty_preserved_block);
    let total = dataset.len();

    let mut html = String::with_capacity(16 * 1024 + data.len() * 2);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Competition Results</title>\n");
    html.push_str(&format!("<style>{BASE_CSS}</style>\n"));
    html.push_str(&preserved);
    html.push_str("\n</head>\n<body>\n");

    html.push_str("<header class=\"report-header\">\n<h1>Competition Results</h1>\n");
    html.push_str(&format!(
        "<p class=\"report-meta\"><span id=\"visible-count\">{total}</span> of {total} results, generated {}</p>\n</header>\n",
        generated_at.format("%Y-%m-%d %H:%M")
    ));

    html.push_str("<button id=\"filter-toggle\" class=\"filter-toggle\" type=\"button\" aria-expanded=\"false\" aria-controls=\"filters\">Filters</button>\n");
    html.push_str("<section id=\"filters\" class=\"filter-controls\">\n");
    html.push_str(&render_select("filter-discipline", "Discipline", &dataset.disciplines));
    html.push_str(&render_select("filter-category", "Category", &dataset.categories));
    html.push_str(&render_select("filter-age", "Age group", &dataset.age_groups));
    html.push_str(&render_select("filter-club", "Club", &dataset.clubs));
    html.push_str("<label for=\"filter-name\">Name<input id=\"filter-name\" type=\"search\" placeholder=\"Search names\" autocomplete=\"off\"></label>\n");
    html.push_str("<button id=\"filter-reset\" type=\"button\">Reset</button>\n</section>\n");

    html.push_str("<table class=\"results\">\n<thead><tr>");
    for (heading, _, _) in COLUMNS {
        html.push_str(&format!("<th scope=\"col\">{heading}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody id=\"results-body\">\n");
    html.push_str(&render_rows(&dataset.records));
    html.push_str("</tbody>\n</table>\n");

    html.push_str(&format!("<script id=\"report-data\" type=\"application/json\">{data}</script>\n"));
    html.push_str(&format!("<script id=\"report-columns\" type=\"application/json\">{columns}</script>\n"));
    html.push_str(&format!("<script>{SCRIPT}</script>\n</body>\n</html>\n"));
    Ok(html)
}

fn render_select(id: &str, label: &str, values: &[String]) -> String {
    let mut html = format!("<label for=\"{id}\">{label}<select id=\"{id}\"><option value=\"\">All</option>");
    for value in values {
        let value = escape(value.as_str());
        html.push_str(&format!("<option value=\"{value}\">{value}</option>"));
    }
    html.push_str("</select></label>\n");
    html
}

/// Table rows with a group header wherever the group key changes.
fn render_rows(records: &[ResultRecord]) -> String {
    let mut html = String::new();
    let mut current = None::<(&str, &str, &str)>;
    for record in records {
        let key = record.group_key();
        if current != Some(key) {
            html.push_str(&format!(
                "<tr class=\"group-header\"><th colspan=\"{}\" scope=\"colgroup\">{}</th></tr>\n",
                COLUMNS.len(),
                escape(record.group_label().as_str())
            ));
            current = Some(key);
        }
        let class = if record.is_green { "result-row is-green" } else { "result-row" };
        let values = [
            record.position.as_str(),
            record.name.as_str(),
            record.club.as_str(),
            record.total_score.as_str(),
            record.discipline.label(),
            record.category_part.as_str(),
            record.age_group.as_str(),
        ];
        html.push_str(&format!("<tr class=\"{class}\">"));
        for ((heading, _, group_field), value) in COLUMNS.iter().zip(values) {
            let class = if *group_field { " class=\"group-field\"" } else { "" };
            html.push_str(&format!("<td data-label=\"{heading}\"{class}>{}</td>", escape(value)));
        }
        html.push_str("</tr>\n");
    }
    html
}
