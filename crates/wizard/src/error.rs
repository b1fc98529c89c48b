use folio_sheet::SheetError;
use folio_viz::VizError;
use thiserror::Error;

/// Errors surfaced by wizard transitions.
///
/// Per-file and per-sheet problems never show up here — those are collected
/// into the step reports. A `WizardError` means the whole step could not
/// happen and the session kept its pre-step state.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("none of the uploaded files could be used; upload at least one .xlsx or .xls workbook")]
    NoUsableWorkbooks,

    #[error("no workbooks are staged; upload files first")]
    NoWorkbooksStaged,

    #[error("no merged dataset; select sheets first")]
    NoDataset,

    #[error("no generated charts to clear")]
    NoCharts,

    #[error("chart artifact '{id}' not found")]
    ArtifactNotFound { id: String },

    #[error("{0}")]
    Sheet(#[from] SheetError),

    #[error("{0}")]
    Chart(#[from] VizError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("artifact serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WizardError>;
