use crate::staging::StagedWorkbook;
use folio_sheet::{ColumnKind, Dataset};
use folio_viz::ChartSpec;
use indexmap::IndexMap;
use serde::Serialize;

/// Wizard steps a session can be observed in between requests.
///
/// Sheet selection is transient — a successful `select_sheets` lands the
/// session directly in `DatasetReady` within one request, so there is no
/// observable in-between state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Empty,
    FilesStaged,
    DatasetReady,
    ChartsGenerated,
}

/// A chart the session generated, with its embeddable markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartArtifact {
    pub id: String,
    pub spec: ChartSpec,
    pub markup: String,
}

/// Per-principal wizard state.
///
/// All mutation goes through the `commit_*` transitions; the service layer
/// finishes every fallible computation first, so a session is only ever
/// observed before or after a full step, never mid-mutation.
#[derive(Debug)]
pub struct WizardSession {
    state: WizardState,
    staged: IndexMap<String, StagedWorkbook>,
    dataset: Option<Dataset>,
    classification: IndexMap<String, ColumnKind>,
    artifacts: IndexMap<String, ChartArtifact>,
    recent: Vec<String>,
    previous: Vec<String>,
    counter: u64,
}

impl WizardSession {
    #[must_use]
    pub fn new() -> Self {
        WizardSession {
            state: WizardState::Empty,
            staged: IndexMap::new(),
            dataset: None,
            classification: IndexMap::new(),
            artifacts: IndexMap::new(),
            recent: Vec::new(),
            previous: Vec::new(),
            counter: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Staged workbooks keyed by their staging key.
    #[must_use]
    pub fn staged(&self) -> &IndexMap<String, StagedWorkbook> {
        &self.staged
    }

    #[must_use]
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    #[must_use]
    pub fn classification(&self) -> &IndexMap<String, ColumnKind> {
        &self.classification
    }

    /// Look up a generated chart by id.
    #[must_use]
    pub fn artifact(&self, id: &str) -> Option<&ChartArtifact> {
        self.artifacts.get(id)
    }

    /// Ids of the newest chart batch.
    #[must_use]
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    /// Ids of every batch before the newest.
    #[must_use]
    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    pub(crate) fn counter(&self) -> u64 {
        self.counter
    }

    // ===== Transitions =====

    /// Commit freshly staged workbooks.
    ///
    /// Any earlier staging and dataset are superseded; generated charts
    /// survive until `clear_charts` or `reset`.
    pub(crate) fn commit_stage(&mut self, staged: Vec<StagedWorkbook>) {
        self.staged = staged.into_iter().map(|w| (w.key.clone(), w)).collect();
        self.dataset = None;
        self.classification = IndexMap::new();
        self.state = WizardState::FilesStaged;
    }

    /// Commit the merged dataset and its classification.
    pub(crate) fn commit_dataset(
        &mut self,
        dataset: Dataset,
        classification: IndexMap<String, ColumnKind>,
    ) {
        self.dataset = Some(dataset);
        self.classification = classification;
        self.state = WizardState::DatasetReady;
    }

    /// Rotate the recent ids into history and append the new batch.
    pub(crate) fn commit_charts(&mut self, charts: Vec<ChartArtifact>, counter: u64) {
        let rotated: Vec<String> = self.recent.drain(..).collect();
        self.previous.extend(rotated);
        self.recent = charts.iter().map(|c| c.id.clone()).collect();
        for chart in charts {
            self.artifacts.insert(chart.id.clone(), chart);
        }
        self.counter = counter;
        self.state = WizardState::ChartsGenerated;
    }

    /// Drop every artifact and reset the id counter.
    pub(crate) fn commit_clear_charts(&mut self) {
        self.artifacts = IndexMap::new();
        self.recent = Vec::new();
        self.previous = Vec::new();
        self.counter = 0;
        self.state = WizardState::DatasetReady;
    }

    /// Back to a blank session.
    pub(crate) fn commit_reset(&mut self) {
        *self = WizardSession::new();
    }

    /// Read-only view for the page layer.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let collect = |ids: &[String]| -> Vec<ChartArtifact> {
            ids.iter().filter_map(|id| self.artifacts.get(id).cloned()).collect()
        };

        SessionView {
            state: self.state,
            staged: self
                .staged
                .values()
                .map(|w| StagedSummary {
                    filename: w.filename.clone(),
                    key: w.key.clone(),
                    sheets: w.sheets.clone(),
                })
                .collect(),
            columns: self
                .dataset
                .as_ref()
                .map(|d| d.columns().to_vec())
                .unwrap_or_default(),
            row_count: self.dataset.as_ref().map_or(0, Dataset::row_count),
            x_candidates: self
                .dataset
                .as_ref()
                .map(folio_viz::x_candidates)
                .unwrap_or_default(),
            y_candidates: folio_viz::y_candidates(&self.classification),
            recent: collect(&self.recent),
            previous: collect(&self.previous),
        }
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

/// One staged workbook as shown on the sheet-selection page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedSummary {
    pub filename: String,
    pub key: String,
    pub sheets: Vec<String>,
}

/// Serializable snapshot of a session for the page layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub state: WizardState,
    pub staged: Vec<StagedSummary>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub x_candidates: Vec<String>,
    pub y_candidates: Vec<String>,
    pub recent: Vec<ChartArtifact>,
    pub previous: Vec<ChartArtifact>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_viz::{Aggregation, ChartKind};
    use std::path::PathBuf;

    fn staged(key: &str) -> StagedWorkbook {
        StagedWorkbook {
            filename: format!("{key}.xlsx"),
            key: key.to_string(),
            path: PathBuf::from(format!("/tmp/{key}")),
            sheets: vec!["Folha1".to_string()],
        }
    }

    fn chart(id: &str) -> ChartArtifact {
        ChartArtifact {
            id: id.to_string(),
            spec: ChartSpec {
                kind: ChartKind::Bar,
                x_column: "Data".to_string(),
                y_column: "Valor".to_string(),
                aggregation: Aggregation::Identity,
                title: String::new(),
            },
            markup: String::new(),
        }
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = WizardSession::new();
        assert_eq!(session.state(), WizardState::Empty);
        assert!(session.staged().is_empty());
        assert!(session.dataset().is_none());
    }

    #[test]
    fn test_stage_supersedes_dataset() {
        let mut session = WizardSession::new();
        session.commit_stage(vec![staged("a")]);
        session.commit_dataset(
            folio_sheet::merge(&[folio_sheet::NormalizedTable::from_parts(
                vec![
                    "v".to_string(),
                    folio_sheet::PROVENANCE_FILE.to_string(),
                    folio_sheet::PROVENANCE_SHEET.to_string(),
                ],
                vec![],
            )])
            .unwrap(),
            IndexMap::new(),
        );
        assert_eq!(session.state(), WizardState::DatasetReady);

        session.commit_stage(vec![staged("b")]);
        assert_eq!(session.state(), WizardState::FilesStaged);
        assert!(session.dataset().is_none());
        assert!(session.staged().contains_key("b"));
        assert!(!session.staged().contains_key("a"));
    }

    #[test]
    fn test_chart_batches_rotate_recent_into_previous() {
        let mut session = WizardSession::new();

        session.commit_charts(vec![chart("chart_1"), chart("chart_2")], 2);
        assert_eq!(session.recent(), &["chart_1", "chart_2"]);
        assert!(session.previous().is_empty());

        session.commit_charts(vec![chart("chart_3")], 3);
        assert_eq!(session.recent(), &["chart_3"]);
        assert_eq!(session.previous(), &["chart_1", "chart_2"]);
        assert!(session.artifact("chart_1").is_some());
    }

    #[test]
    fn test_clear_charts_resets_counter_and_lists() {
        let mut session = WizardSession::new();
        session.commit_charts(vec![chart("chart_1")], 1);

        session.commit_clear_charts();
        assert_eq!(session.state(), WizardState::DatasetReady);
        assert_eq!(session.counter(), 0);
        assert!(session.recent().is_empty());
        assert!(session.previous().is_empty());
        assert!(session.artifact("chart_1").is_none());
    }
}
