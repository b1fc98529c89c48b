//! Workbook ingestion and dataset assembly for folio.
//!
//! The pipeline mirrors the upload wizard's steps:
//!
//! 1. [`Workbook::open`] + [`Workbook::sheet_names`] catalog an uploaded
//!    file's sheets without loading cell data.
//! 2. [`normalize`] reads one selected sheet, finds the real header row,
//!    cleans up column names, drops synthetic unnamed columns, and tags
//!    every row with its source file and sheet.
//! 3. [`merge`] stacks the normalized tables into a single [`Dataset`]
//!    (outer union of columns, missing cells stay empty) and runs the
//!    per-column type coercion pass.
//!
//! # Examples
//!
//! ```
//! use folio_sheet::{merge, CellValue, NormalizedTable, PROVENANCE_FILE, PROVENANCE_SHEET};
//!
//! let table = NormalizedTable::from_parts(
//!     vec![
//!         "Valor".to_string(),
//!         PROVENANCE_FILE.to_string(),
//!         PROVENANCE_SHEET.to_string(),
//!     ],
//!     vec![vec![
//!         CellValue::Text("1,5".to_string()),
//!         CellValue::Text("vendas.xlsx".to_string()),
//!         CellValue::Text("Folha1".to_string()),
//!     ]],
//! );
//!
//! let dataset = merge(&[table]).unwrap();
//! assert_eq!(dataset.rows()[0][0], CellValue::Number(1.5));
//! ```

mod cell;
mod error;
mod merge;
mod normalize;
mod workbook;

/// Re-export the cell value type.
pub use cell::CellValue;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export the merged dataset and column classification.
pub use merge::{merge, ColumnKind, Dataset};
/// Re-export normalization types and the provenance column names.
pub use normalize::{
    is_provenance_column, normalize, NormalizedTable, PROVENANCE_FILE, PROVENANCE_SHEET,
};
/// Re-export workbook access.
pub use workbook::{is_supported_extension, Workbook, SUPPORTED_EXTENSIONS};
