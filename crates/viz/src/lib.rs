//! # folio-viz
//!
//! Chart specification building for folio.
//!
//! This crate turns a user's column/kind selection into declarative
//! [`ChartSpec`]s, extracts the labels/values a chart needs from the merged
//! dataset, and defines the [`Renderer`] seam an output backend implements:
//! - self-contained Chart.js documents (bundled, [`ChartJsRenderer`])
//! - image/PDF export (an image-capable collaborator)

mod render;

pub use render::{ChartJsRenderer, ExportFormat, RenderedChart, Renderer};

use folio_sheet::{is_provenance_column, ColumnKind, Dataset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from chart spec building and rendering.
#[derive(Debug, Error)]
pub enum VizError {
    #[error("column '{column}' is not available for charting")]
    UnknownColumn { column: String },

    #[error("no chart kind selected")]
    NoChartKindSelected,

    #[error("export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, VizError>;

/// Chart families the wizard can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    /// Chart.js type string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
        }
    }
}

/// How y values are combined when x values repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// One point per row, in row order.
    Identity,
    /// Group rows by x and sum their y values, first-seen x order.
    SumByX,
}

/// Declarative chart description consumed by a [`Renderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
    pub aggregation: Aggregation,
    pub title: String,
}

/// Labels and values extracted from the dataset for one spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Columns offered for the x axis: everything except provenance.
#[must_use]
pub fn x_candidates(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| !is_provenance_column(c))
        .cloned()
        .collect()
}

/// Columns offered for the y axis: numeric columns only.
#[must_use]
pub fn y_candidates(classification: &IndexMap<String, ColumnKind>) -> Vec<String> {
    classification
        .iter()
        .filter(|(_, kind)| **kind == ColumnKind::Numeric)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Build one spec per requested kind, in request order.
///
/// Line charts always carry the group-by-x/sum-y aggregation so repeated x
/// values collapse into one point.
///
/// # Errors
///
/// [`VizError::NoChartKindSelected`] for an empty kind list, and
/// [`VizError::UnknownColumn`] when either column is absent from the
/// candidate lists — provenance columns are never chart-selectable even
/// though they exist in the dataset.
pub fn build_specs(
    dataset: &Dataset,
    classification: &IndexMap<String, ColumnKind>,
    x_column: &str,
    y_column: &str,
    kinds: &[ChartKind],
) -> Result<Vec<ChartSpec>> {
    if kinds.is_empty() {
        return Err(VizError::NoChartKindSelected);
    }
    if !x_candidates(dataset).iter().any(|c| c == x_column) {
        return Err(VizError::UnknownColumn {
            column: x_column.to_string(),
        });
    }
    if !y_candidates(classification).iter().any(|c| c == y_column) {
        return Err(VizError::UnknownColumn {
            column: y_column.to_string(),
        });
    }

    Ok(kinds
        .iter()
        .map(|&kind| ChartSpec {
            kind,
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            aggregation: if kind == ChartKind::Line {
                Aggregation::SumByX
            } else {
                Aggregation::Identity
            },
            title: format!("{y_column} by {x_column}"),
        })
        .collect())
}

/// Extract the labels and values a spec charts from the dataset.
///
/// Empty y cells count as zero; empty x cells label as the empty string.
///
/// # Errors
///
/// [`VizError::UnknownColumn`] when the spec references a column the
/// dataset no longer has.
pub fn chart_data(dataset: &Dataset, spec: &ChartSpec) -> Result<ChartData> {
    let x = dataset
        .column_index(&spec.x_column)
        .ok_or_else(|| VizError::UnknownColumn {
            column: spec.x_column.clone(),
        })?;
    let y = dataset
        .column_index(&spec.y_column)
        .ok_or_else(|| VizError::UnknownColumn {
            column: spec.y_column.clone(),
        })?;

    match spec.aggregation {
        Aggregation::Identity => {
            let mut labels = Vec::with_capacity(dataset.row_count());
            let mut values = Vec::with_capacity(dataset.row_count());
            for row in dataset.rows() {
                labels.push(row[x].to_string());
                values.push(row[y].as_number().unwrap_or(0.0));
            }
            Ok(ChartData { labels, values })
        }
        Aggregation::SumByX => {
            let mut groups: IndexMap<String, f64> = IndexMap::new();
            for row in dataset.rows() {
                *groups.entry(row[x].to_string()).or_insert(0.0) +=
                    row[y].as_number().unwrap_or(0.0);
            }
            Ok(ChartData {
                labels: groups.keys().cloned().collect(),
                values: groups.values().copied().collect(),
            })
        }
    }
}
