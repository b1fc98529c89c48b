use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// File extensions accepted for uploaded workbooks.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Check an upload filename against the supported workbook extensions.
#[must_use]
pub fn is_supported_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// An opened workbook plus the display name its rows are tagged with.
///
/// `filename` is the name the user uploaded, not the staging path; it is
/// what ends up in the `Ficheiro` provenance column.
pub struct Workbook {
    filename: String,
    reader: Sheets<BufReader<File>>,
}

impl Workbook {
    /// Open a staged workbook file.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::WorkbookUnreadable`] when the bytes cannot be
    /// parsed as any supported spreadsheet format. Callers treat this as
    /// "exclude the file, report it", never as a batch-fatal condition.
    pub fn open<P: AsRef<Path>>(path: P, filename: &str) -> Result<Self> {
        let reader = open_workbook_auto(path.as_ref()).map_err(|e| SheetError::WorkbookUnreadable {
            file: filename.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Workbook {
            filename: filename.to_string(),
            reader,
        })
    }

    /// The upload filename used for row provenance.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Sheet names in the workbook's native order, without loading cell data.
    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.reader.sheet_names().to_vec()
    }

    /// Read one sheet as a raw grid with no header assumption.
    pub(crate) fn raw_grid(&mut self, sheet_name: &str) -> Result<Vec<Vec<CellValue>>> {
        let range = self
            .reader
            .worksheet_range(sheet_name)
            .map_err(|e| SheetError::SheetReadFailure {
                sheet: sheet_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect())
    }
}

/// Convert a calamine cell into the closed [`CellValue`] variant set.
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => CellValue::Date(ts.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#ERROR: {e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("vendas.xlsx"));
        assert!(is_supported_extension("VENDAS.XLSX"));
        assert!(is_supported_extension("legacy.xls"));
        assert!(!is_supported_extension("dados.csv"));
        assert!(!is_supported_extension("notas.txt"));
        assert!(!is_supported_extension("sem_extensao"));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a spreadsheet").unwrap();

        let result = Workbook::open(&path, "broken.xlsx");
        assert!(matches!(
            result,
            Err(SheetError::WorkbookUnreadable { file, .. }) if file == "broken.xlsx"
        ));
    }

    #[test]
    fn test_cell_from_data_variants() {
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_from_data(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_from_data(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(
            cell_from_data(&Data::Bool(true)),
            CellValue::Text("true".to_string())
        );
        assert_eq!(
            cell_from_data(&Data::String("abc".to_string())),
            CellValue::Text("abc".to_string())
        );
    }
}
