use thiserror::Error;

/// Errors that can occur while reading, normalizing, and merging sheets.
///
/// All of these are per-file or per-sheet except [`SheetError::NothingToMerge`];
/// callers collect them into a batch report instead of aborting sibling
/// sheets.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("workbook '{file}' could not be read as a spreadsheet: {reason}")]
    WorkbookUnreadable { file: String, reason: String },

    #[error("sheet '{sheet}' contains no non-empty rows")]
    EmptySheet { sheet: String },

    #[error("sheet '{sheet}' has ambiguous column name '{name}' after normalization")]
    AmbiguousColumns { sheet: String, name: String },

    #[error("sheet '{sheet}' could not be read: {reason}")]
    SheetReadFailure { sheet: String, reason: String },

    #[error("nothing to merge: no sheet was selected and normalized successfully")]
    NothingToMerge,
}

pub type Result<T> = std::result::Result<T, SheetError>;
