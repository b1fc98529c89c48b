use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::normalize::{is_provenance_column, NormalizedTable, PROVENANCE_FILE, PROVENANCE_SHEET};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic kind of a merged column, used to pick chart axis candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Datetime,
}

/// The outer-union concatenation of the tables selected in one wizard pass.
///
/// Row order is input order with each table's rows in their original order;
/// a cell missing from a table for a column present elsewhere is an
/// explicit [`CellValue::Empty`], never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Date formats the coercion pass understands, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Datetime formats reduced to their date part.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Concatenate normalized tables into one dataset.
///
/// The result's column set is the union of all input column sets: data
/// columns in first-seen order, then the two provenance columns. After
/// concatenation, each non-provenance column goes through the type
/// coercion pass (dates for date-marked names, decimal-comma numerics
/// otherwise), all-or-nothing per column.
///
/// # Errors
///
/// [`SheetError::NothingToMerge`] when `tables` is empty.
pub fn merge(tables: &[NormalizedTable]) -> Result<Dataset> {
    if tables.is_empty() {
        return Err(SheetError::NothingToMerge);
    }

    let mut data_columns: IndexSet<String> = IndexSet::new();
    for table in tables {
        for column in table.columns() {
            if !is_provenance_column(column) {
                data_columns.insert(column.clone());
            }
        }
    }

    let columns: Vec<String> = data_columns
        .into_iter()
        .chain([PROVENANCE_FILE.to_string(), PROVENANCE_SHEET.to_string()])
        .collect();

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for table in tables {
        let col_idx: HashMap<&str, usize> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        for row in table.rows() {
            rows.push(
                columns
                    .iter()
                    .map(|column| {
                        col_idx
                            .get(column.as_str())
                            .and_then(|&i| row.get(i))
                            .cloned()
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect(),
            );
        }
    }

    let mut dataset = Dataset { columns, rows };
    dataset.coerce_columns();
    Ok(dataset)
}

impl Dataset {
    /// Column names, provenance columns last.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Merged rows in concatenation order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of merged rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Classify every non-provenance column for chart-axis selection.
    ///
    /// A column is `Numeric` or `Datetime` only when all its non-empty
    /// values agree; anything mixed (or entirely empty) is `Text`.
    #[must_use]
    pub fn classify(&self) -> IndexMap<String, ColumnKind> {
        let mut kinds = IndexMap::new();
        for (col, name) in self.columns.iter().enumerate() {
            if is_provenance_column(name) {
                continue;
            }

            let mut numbers = 0usize;
            let mut dates = 0usize;
            let mut texts = 0usize;
            for row in &self.rows {
                match &row[col] {
                    CellValue::Empty => {}
                    CellValue::Number(_) => numbers += 1,
                    CellValue::Date(_) => dates += 1,
                    CellValue::Text(_) => texts += 1,
                }
            }

            let kind = if numbers > 0 && dates == 0 && texts == 0 {
                ColumnKind::Numeric
            } else if dates > 0 && numbers == 0 && texts == 0 {
                ColumnKind::Datetime
            } else {
                ColumnKind::Text
            };
            kinds.insert(name.clone(), kind);
        }
        kinds
    }

    /// Run the per-column coercion pass over all non-provenance columns.
    fn coerce_columns(&mut self) {
        for col in 0..self.columns.len() {
            let name = self.columns[col].clone();
            if is_provenance_column(&name) {
                continue;
            }
            if has_date_token(&name) {
                self.coerce_date_column(col);
            } else {
                self.coerce_numeric_column(col);
            }
        }
    }

    /// All-or-nothing date pass: one unparseable value leaves the whole
    /// column untouched.
    fn coerce_date_column(&mut self, col: usize) {
        let mut parsed: Vec<(usize, NaiveDate)> = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            match &row[col] {
                CellValue::Empty | CellValue::Date(_) => {}
                CellValue::Text(s) => match parse_date(s) {
                    Some(date) => parsed.push((idx, date)),
                    None => return,
                },
                CellValue::Number(_) => return,
            }
        }
        for (idx, date) in parsed {
            self.rows[idx][col] = CellValue::Date(date);
        }
    }

    /// All-or-nothing numeric pass with `,` as the decimal separator.
    fn coerce_numeric_column(&mut self, col: usize) {
        // Only textual columns are candidates; already-numeric ones are done.
        if !self
            .rows
            .iter()
            .any(|row| matches!(&row[col], CellValue::Text(_)))
        {
            return;
        }

        let mut parsed: Vec<(usize, f64)> = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            match &row[col] {
                CellValue::Empty | CellValue::Number(_) => {}
                CellValue::Text(s) => match parse_decimal(s) {
                    Some(n) => parsed.push((idx, n)),
                    None => return,
                },
                CellValue::Date(_) => return,
            }
        }
        for (idx, n) in parsed {
            self.rows[idx][col] = CellValue::Number(n);
        }
    }
}

/// Column names carrying a date marker token get the date pass.
fn has_date_token(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("data") || lower.contains("date")
}

/// Parse a number treating `,` as the decimal separator.
fn parse_decimal(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse().ok()
}

/// Parse a date from the known formats, reducing datetimes to dates.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts.date());
        }
    }
    None
}
