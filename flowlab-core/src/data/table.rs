//! HTML table extraction and positional column selection.
//!
//! A raw export is an HTML document whose first `<table>` carries the data.
//! The first row is the header. Columns are selected by position, not by
//! header name, because the export has never had stable header text; an
//! optional header check can be switched on through [`ColumnMapping`].

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Largest `colspan` honoured when expanding cells.
const MAX_COLSPAN: usize = 64;

/// Positions (0-based) of the entity, buy and sell columns in a raw table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub entity: usize,
    pub buy: usize,
    pub sell: usize,
    /// Header names expected at `[entity, buy, sell]`. `None` disables the check.
    pub expected_headers: Option<[String; 3]>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            entity: 3,
            buy: 4,
            sell: 5,
            expected_headers: None,
        }
    }
}

impl ColumnMapping {
    /// Minimum number of columns a table needs for this mapping.
    pub fn required_columns(&self) -> usize {
        self.entity.max(self.buy).max(self.sell) + 1
    }

    /// True when two roles point at the same column.
    pub fn has_overlap(&self) -> bool {
        self.entity == self.buy || self.entity == self.sell || self.buy == self.sell
    }

    /// Compare header cells against `expected_headers`.
    ///
    /// Returns the first mismatch as `(position, expected, found)`.
    pub fn check_header(&self, header: &[String]) -> Option<(usize, String, String)> {
        let expected = self.expected_headers.as_ref()?;
        let positions = [self.entity, self.buy, self.sell];
        positions
            .iter()
            .zip(expected.iter())
            .find_map(|(&pos, want)| {
                let found = header.get(pos).map(String::as_str).unwrap_or("");
                (found.trim() != want.trim()).then(|| (pos, want.clone(), found.to_string()))
            })
    }
}

/// One candidate row pulled out of a raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Entity name, trimmed. May be empty; the snapshot builder drops those.
    pub entity: String,
    /// `f64::NAN` when the cell is empty or unparseable.
    pub buy: f64,
    pub sell: f64,
}

/// Cell text of the first table in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse the first `<table>` of an HTML document. `None` when there is no
    /// table or the table has no rows.
    pub fn from_html(html: &str) -> Option<RawTable> {
        let table_sel = Selector::parse("table").ok()?;
        let row_sel = Selector::parse("tr").ok()?;
        let cell_sel = Selector::parse("th, td").ok()?;

        let document = Html::parse_document(html);
        let table = document.select(&table_sel).next()?;

        let mut rows = table
            .select(&row_sel)
            .map(|tr| expand_cells(tr, &cell_sel))
            .filter(|cells| !cells.is_empty());

        let header = rows.next()?;
        Some(RawTable {
            header,
            rows: rows.collect(),
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Width of the widest row, header included.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Select entity/buy/sell cells from every data row.
    ///
    /// Short rows yield an empty entity and missing amounts rather than an error.
    pub fn extract(&self, mapping: &ColumnMapping) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|cells| {
                let cell = |pos: usize| cells.get(pos).map(String::as_str).unwrap_or("");
                RawRow {
                    entity: cell(mapping.entity).trim().to_string(),
                    buy: clean_amount(cell(mapping.buy)),
                    sell: clean_amount(cell(mapping.sell)),
                }
            })
            .collect()
    }
}

/// Strip thousands separators and whitespace, then parse.
///
/// Anything that is not a finite number becomes `f64::NAN`.
pub fn clean_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => f64::NAN,
    }
}

fn expand_cells(row: ElementRef<'_>, cell_sel: &Selector) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in row.select(cell_sel) {
        let text = cell.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        for _ in 0..span {
            cells.push(text.clone());
        }
    }
    cells
}
