//! # folio-wizard
//!
//! The session-scoped upload → select sheets → chart → export wizard.
//!
//! [`Wizard`] is the facade the transport layer calls: it owns the session
//! registry, the workbook staging area, the chart artifact store, and the
//! renderer collaborator. Each public method is one wizard step; a step
//! either commits completely or leaves the session in its pre-step state,
//! and per-file/per-sheet problems are collected into the step report
//! instead of failing the batch.
//!
//! Authentication happens before the wizard: callers verify credentials
//! through a [`CredentialCheck`] implementation and pass the account id as
//! the `principal` of every call.

mod artifacts;
mod auth;
mod error;
mod session;
mod staging;
mod store;

pub use artifacts::{ArtifactStore, StoredArtifact};
pub use auth::{CredentialCheck, Utilizador};
pub use error::{Result, WizardError};
pub use session::{ChartArtifact, SessionView, StagedSummary, WizardSession, WizardState};
pub use staging::{sanitize_filename, StagedWorkbook, Staging};
pub use store::SessionStore;

use folio_sheet::{is_supported_extension, merge, normalize, Workbook};
use folio_viz::{build_specs, chart_data, ChartKind, ExportFormat, Renderer};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// One uploaded file, as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A file the staging step refused, with a plain-language reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub filename: String,
    pub reason: String,
}

/// Outcome of staging a batch of uploads.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Accepted workbooks with their sheet catalogs, for the selection page.
    pub staged: Vec<StagedSummary>,
    /// Files skipped over, reported alongside the successes.
    pub rejected: Vec<Rejection>,
}

/// A sheet the selection step skipped, reported alongside the merge result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetFailure {
    pub filename: String,
    /// `None` when the whole workbook failed rather than one sheet.
    pub sheet: Option<String>,
    pub reason: String,
}

/// Outcome of sheet selection and merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub skipped: Vec<SheetFailure>,
}

/// Outcome of one chart-generation step.
#[derive(Debug, Clone, Serialize)]
pub struct ChartReport {
    /// Ids of the new batch, in requested kind order.
    pub artifact_ids: Vec<String>,
}

/// The wizard facade.
pub struct Wizard {
    store: SessionStore,
    staging: Staging,
    artifacts: ArtifactStore,
    renderer: Arc<dyn Renderer>,
}

impl Wizard {
    /// Create a wizard with its staging and artifact directories.
    pub fn new(
        staging_root: impl Into<PathBuf>,
        artifact_root: impl Into<PathBuf>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self> {
        Ok(Wizard {
            store: SessionStore::new(),
            staging: Staging::new(staging_root)?,
            artifacts: ArtifactStore::new(artifact_root)?,
            renderer,
        })
    }

    fn lock(handle: &Arc<Mutex<WizardSession>>) -> MutexGuard<'_, WizardSession> {
        handle.lock().expect("wizard session poisoned")
    }

    /// Stage uploaded workbooks and catalog their sheets.
    ///
    /// Invalid extensions, unsanitizable names, and unreadable files are
    /// rejected per-file; the step only fails when nothing usable remains.
    pub fn stage_files(&self, principal: &str, uploads: Vec<Upload>) -> Result<StageReport> {
        let mut staged: Vec<StagedWorkbook> = Vec::new();
        let mut rejected: Vec<Rejection> = Vec::new();

        for upload in uploads {
            if !is_supported_extension(&upload.filename) {
                rejected.push(Rejection {
                    filename: upload.filename,
                    reason: "unsupported file extension; expected .xlsx or .xls".to_string(),
                });
                continue;
            }
            let Some(key) = sanitize_filename(&upload.filename) else {
                rejected.push(Rejection {
                    filename: upload.filename,
                    reason: "filename has no usable characters".to_string(),
                });
                continue;
            };

            let path = self.staging.stage(principal, &key, &upload.bytes)?;
            match Workbook::open(&path, &upload.filename) {
                Ok(workbook) => {
                    let sheets = workbook.sheet_names();
                    if sheets.is_empty() {
                        self.staging.discard(principal, &key);
                        rejected.push(Rejection {
                            filename: upload.filename,
                            reason: "workbook has no sheets".to_string(),
                        });
                        continue;
                    }
                    staged.push(StagedWorkbook {
                        filename: upload.filename,
                        key,
                        path,
                        sheets,
                    });
                }
                Err(e) => {
                    tracing::warn!(file = %upload.filename, error = %e, "upload rejected");
                    self.staging.discard(principal, &key);
                    rejected.push(Rejection {
                        filename: upload.filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if staged.is_empty() {
            return Err(WizardError::NoUsableWorkbooks);
        }

        let handle = self.store.session(principal);
        let mut session = Self::lock(&handle);
        session.commit_stage(staged);
        tracing::info!(
            principal,
            staged = session.staged().len(),
            rejected = rejected.len(),
            "files staged"
        );

        Ok(StageReport {
            staged: session.view().staged,
            rejected,
        })
    }

    /// Normalize the chosen sheets and merge them into the session dataset.
    ///
    /// `selection` maps staging keys to chosen sheet names. Sheets that
    /// fail normalization are skipped and reported; the step fails only
    /// when no sheet survives.
    pub fn select_sheets(
        &self,
        principal: &str,
        selection: &IndexMap<String, Vec<String>>,
    ) -> Result<MergeReport> {
        let handle = self.store.session(principal);
        let mut session = Self::lock(&handle);

        if session.staged().is_empty() {
            return Err(WizardError::NoWorkbooksStaged);
        }

        let mut tables = Vec::new();
        let mut skipped: Vec<SheetFailure> = Vec::new();

        for (key, sheet_names) in selection {
            let Some(entry) = session.staged().get(key) else {
                skipped.push(SheetFailure {
                    filename: key.clone(),
                    sheet: None,
                    reason: "not a staged workbook".to_string(),
                });
                continue;
            };

            let mut workbook = match Workbook::open(&entry.path, &entry.filename) {
                Ok(workbook) => workbook,
                Err(e) => {
                    tracing::warn!(file = %entry.filename, error = %e, "staged workbook unreadable");
                    skipped.push(SheetFailure {
                        filename: entry.filename.clone(),
                        sheet: None,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for sheet_name in sheet_names {
                match normalize(&mut workbook, sheet_name) {
                    Ok(table) => tables.push(table),
                    Err(e) => {
                        tracing::warn!(
                            file = %entry.filename,
                            sheet = %sheet_name,
                            error = %e,
                            "sheet skipped"
                        );
                        skipped.push(SheetFailure {
                            filename: entry.filename.clone(),
                            sheet: Some(sheet_name.clone()),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        // NothingToMerge covers both "no sheet chosen" and "all failed";
        // the session keeps its pre-step state either way.
        let dataset = merge(&tables)?;
        let classification = dataset.classify();

        let report = MergeReport {
            rows: dataset.row_count(),
            columns: dataset.columns().to_vec(),
            skipped,
        };
        session.commit_dataset(dataset, classification);
        tracing::info!(principal, rows = report.rows, "dataset merged");

        Ok(report)
    }

    /// Generate one chart per requested kind from the merged dataset.
    ///
    /// The previous "recent" batch rotates into history, each new artifact
    /// gets a fresh id from the monotonic counter, and every backing file
    /// is written before the session commits.
    pub fn build_chart(
        &self,
        principal: &str,
        x_column: &str,
        y_column: &str,
        kinds: &[ChartKind],
    ) -> Result<ChartReport> {
        let handle = self.store.session(principal);
        let mut session = Self::lock(&handle);

        let dataset = session.dataset().ok_or(WizardError::NoDataset)?;
        let specs = build_specs(dataset, session.classification(), x_column, y_column, kinds)?;

        let mut counter = session.counter();
        let mut pending: Vec<(String, StoredArtifact)> = Vec::new();
        for spec in specs {
            let data = chart_data(dataset, &spec)?;
            let rendered = self.renderer.render(&spec, &data)?;
            counter += 1;
            pending.push((
                format!("chart_{counter}"),
                StoredArtifact {
                    spec,
                    data,
                    markup: rendered.markup,
                },
            ));
        }

        // Persist backing files before mutating the session; roll back the
        // ones already written if a later write fails.
        let mut saved: Vec<String> = Vec::new();
        for (id, stored) in &pending {
            if let Err(e) = self.artifacts.save(principal, id, stored) {
                for written in &saved {
                    self.artifacts.remove(principal, written);
                }
                return Err(e);
            }
            saved.push(id.clone());
        }

        let charts: Vec<ChartArtifact> = pending
            .into_iter()
            .map(|(id, stored)| ChartArtifact {
                id,
                spec: stored.spec,
                markup: stored.markup,
            })
            .collect();
        let artifact_ids: Vec<String> = charts.iter().map(|c| c.id.clone()).collect();

        session.commit_charts(charts, counter);
        tracing::info!(principal, charts = artifact_ids.len(), "charts generated");

        Ok(ChartReport { artifact_ids })
    }

    /// Delete every generated chart and reset the id counter.
    pub fn clear_charts(&self, principal: &str) -> Result<()> {
        let handle = self.store.session(principal);
        let mut session = Self::lock(&handle);

        if session.state() != WizardState::ChartsGenerated {
            return Err(WizardError::NoCharts);
        }

        self.artifacts.clear(principal);
        session.commit_clear_charts();
        tracing::info!(principal, "charts cleared");
        Ok(())
    }

    /// Drop staged files, dataset, and artifacts; back to an empty session.
    pub fn reset(&self, principal: &str) -> Result<()> {
        let handle = self.store.session(principal);
        let mut session = Self::lock(&handle);

        self.staging.clear(principal);
        self.artifacts.clear(principal);
        session.commit_reset();
        tracing::info!(principal, "session reset");
        Ok(())
    }

    /// Reset and forget the session entirely (logout).
    pub fn end_session(&self, principal: &str) -> Result<()> {
        self.reset(principal)?;
        self.store.remove(principal);
        Ok(())
    }

    /// Export one artifact as raw bytes plus the matching MIME type.
    ///
    /// # Errors
    ///
    /// [`WizardError::ArtifactNotFound`] when the id is unknown to the
    /// session or its backing store entry has disappeared.
    pub fn export(
        &self,
        principal: &str,
        artifact_id: &str,
        format: ExportFormat,
    ) -> Result<(Vec<u8>, &'static str)> {
        let handle = self.store.session(principal);
        let session = Self::lock(&handle);

        if session.artifact(artifact_id).is_none() {
            return Err(WizardError::ArtifactNotFound {
                id: artifact_id.to_string(),
            });
        }
        let stored = self.artifacts.load(principal, artifact_id)?.ok_or_else(|| {
            WizardError::ArtifactNotFound {
                id: artifact_id.to_string(),
            }
        })?;

        let bytes = self.renderer.export(&stored.spec, &stored.data, format)?;
        Ok((bytes, format.mime_type()))
    }

    /// Read-only snapshot of a principal's session.
    #[must_use]
    pub fn view(&self, principal: &str) -> SessionView {
        let handle = self.store.session(principal);
        let session = Self::lock(&handle);
        session.view()
    }
}
