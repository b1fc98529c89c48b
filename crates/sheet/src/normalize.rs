use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::workbook::Workbook;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Provenance column recording the source workbook filename.
pub const PROVENANCE_FILE: &str = "Ficheiro";
/// Provenance column recording the source sheet name.
pub const PROVENANCE_SHEET: &str = "Folha";

/// Check whether a column is one of the two provenance columns.
///
/// Provenance columns are excluded from type classification and from the
/// chart candidate lists.
#[must_use]
pub fn is_provenance_column(name: &str) -> bool {
    name == PROVENANCE_FILE || name == PROVENANCE_SHEET
}

/// Pattern spreadsheet readers use for columns with a blank header cell.
/// Files that went through pandas once carry literal "Unnamed: N" headers.
fn unnamed_pattern() -> &'static Regex {
    static UNNAMED: OnceLock<Regex> = OnceLock::new();
    UNNAMED.get_or_init(|| Regex::new("^Unnamed").expect("static pattern"))
}

/// One sheet after header detection and column cleanup.
///
/// Invariants: column names are unique, the last two columns are
/// [`PROVENANCE_FILE`] and [`PROVENANCE_SHEET`], and every row has exactly
/// one (possibly empty) cell per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl NormalizedTable {
    /// Assemble a table from already-normalized parts.
    ///
    /// Rows shorter than the column list are padded with empty cells; longer
    /// rows are truncated.
    #[must_use]
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        NormalizedTable { columns, rows }
    }

    /// Column names, provenance columns last.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows in sheet order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows (the header is not a row).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Read `sheet_name` from `workbook` and normalize it.
///
/// Steps:
/// 1. Read the sheet as a raw grid with no header assumption.
/// 2. The first row with any non-blank cell is the header row; everything
///    above it is skipped.
/// 3. Header names are trimmed and internal whitespace becomes `_`.
/// 4. Columns with a blank header cell, or an `Unnamed` synthetic header,
///    are dropped.
/// 5. `Ficheiro` (workbook filename) and `Folha` (sheet name) are appended
///    to every row.
///
/// # Errors
///
/// [`SheetError::EmptySheet`] when every row is blank,
/// [`SheetError::AmbiguousColumns`] when two headers normalize to the same
/// name or a header collides with a provenance column, and
/// [`SheetError::SheetReadFailure`] for malformed cell data. All are
/// per-sheet; the caller skips the sheet and keeps going.
pub fn normalize(workbook: &mut Workbook, sheet_name: &str) -> Result<NormalizedTable> {
    let grid = workbook.raw_grid(sheet_name)?;

    let offset = grid
        .iter()
        .position(|row| row.iter().any(|cell| !cell.is_blank()))
        .ok_or_else(|| SheetError::EmptySheet {
            sheet: sheet_name.to_string(),
        })?;

    // Decide which header cells become real columns.
    let mut keep: Vec<usize> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    for (idx, cell) in grid[offset].iter().enumerate() {
        if cell.is_blank() {
            continue;
        }
        let original = cell.to_string();
        let original = original.trim();
        if unnamed_pattern().is_match(original) {
            continue;
        }
        keep.push(idx);
        names.push(normalize_column_name(original));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for name in &names {
        if is_provenance_column(name) || !seen.insert(name.as_str()) {
            return Err(SheetError::AmbiguousColumns {
                sheet: sheet_name.to_string(),
                name: name.clone(),
            });
        }
    }

    let file_tag = CellValue::Text(workbook.filename().to_string());
    let sheet_tag = CellValue::Text(sheet_name.to_string());

    let rows: Vec<Vec<CellValue>> = grid[offset + 1..]
        .iter()
        .map(|row| {
            let mut out: Vec<CellValue> = keep
                .iter()
                .map(|&idx| row.get(idx).cloned().unwrap_or(CellValue::Empty))
                .collect();
            out.push(file_tag.clone());
            out.push(sheet_tag.clone());
            out
        })
        .collect();

    let mut columns = names;
    columns.push(PROVENANCE_FILE.to_string());
    columns.push(PROVENANCE_SHEET.to_string());

    Ok(NormalizedTable { columns, rows })
}

/// Trim a header cell and collapse internal whitespace into underscores.
fn normalize_column_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Valor Total  "), "Valor_Total");
        assert_eq!(normalize_column_name("Data"), "Data");
        assert_eq!(normalize_column_name("a  b\tc"), "a_b_c");
    }

    #[test]
    fn test_provenance_columns() {
        assert!(is_provenance_column(PROVENANCE_FILE));
        assert!(is_provenance_column(PROVENANCE_SHEET));
        assert!(!is_provenance_column("Valor"));
    }

    #[test]
    fn test_unnamed_pattern() {
        assert!(unnamed_pattern().is_match("Unnamed: 0"));
        assert!(unnamed_pattern().is_match("Unnamed: 12"));
        assert!(!unnamed_pattern().is_match("Named"));
    }

    #[test]
    fn test_from_parts_pads_rows() {
        let table = NormalizedTable::from_parts(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![CellValue::Number(1.0)]],
        );
        assert_eq!(table.rows()[0], vec![CellValue::Number(1.0), CellValue::Empty]);
    }
}
