use crate::{ChartData, ChartSpec, Result, VizError};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Embeddable output produced by a renderer for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedChart {
    /// Self-contained markup a page can inline or iframe.
    pub markup: String,
}

/// Byte encodings the export endpoint can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// MIME type for the export response.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(VizError::Export(format!(
                "unsupported export format '{other}', expected png or pdf"
            ))),
        }
    }
}

/// Turns a declarative chart spec plus its extracted data into output.
///
/// Rendering internals live behind this trait: the wizard core never knows
/// how pixels are produced, and tests swap in a stub.
pub trait Renderer: Send + Sync {
    /// Produce embeddable markup for one chart.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::Export`] when the backend cannot render the spec.
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<RenderedChart>;

    /// Produce raw bytes in the requested format for download.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::Export`] when the backend cannot produce the
    /// requested format.
    fn export(&self, spec: &ChartSpec, data: &ChartData, format: ExportFormat) -> Result<Vec<u8>>;
}

/// Renders charts as self-contained Chart.js documents.
///
/// Rasterization happens client-side in the browser; PNG/PDF bytes must
/// come from an image-capable renderer instead.
pub struct ChartJsRenderer;

/// Escape HTML special characters to prevent XSS.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

impl Renderer for ChartJsRenderer {
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<RenderedChart> {
        // Escape the title for HTML context and the payload for script context.
        let title = escape_html(&spec.title);
        let payload = json!({
            "labels": data.labels,
            "datasets": [{
                "label": spec.y_column,
                "data": data.values,
            }],
        });
        let payload = serde_json::to_string(&payload)
            .map_err(|e| VizError::Export(e.to_string()))?
            .replace("</", "<\\/"); // Prevent script tag breakout

        let markup = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
</head>
<body>
    <canvas id="chart"></canvas>
    <script>
        const data = {payload};
        const ctx = document.getElementById('chart').getContext('2d');
        new Chart(ctx, {{
            type: '{kind}',
            data: data,
            options: {{
                responsive: true,
                plugins: {{
                    title: {{
                        display: true,
                        text: '{title}'
                    }}
                }}
            }}
        }});
    </script>
</body>
</html>"#,
            title = title,
            payload = payload,
            kind = spec.kind.as_str(),
        );

        Ok(RenderedChart { markup })
    }

    fn export(&self, _spec: &ChartSpec, _data: &ChartData, format: ExportFormat) -> Result<Vec<u8>> {
        Err(VizError::Export(format!(
            "{} export needs an image-capable renderer",
            format.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aggregation, ChartKind};

    fn sample_spec(kind: ChartKind) -> (ChartSpec, ChartData) {
        (
            ChartSpec {
                kind,
                x_column: "Data".to_string(),
                y_column: "Valor".to_string(),
                aggregation: Aggregation::Identity,
                title: "Valor by Data".to_string(),
            },
            ChartData {
                labels: vec!["2024-01-02".to_string(), "2024-01-03".to_string()],
                values: vec![1.5, 3.0],
            },
        )
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("png".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("svg".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(ExportFormat::Png.mime_type(), "image/png");
        assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
    }

    #[test]
    fn test_chartjs_markup() {
        let (spec, data) = sample_spec(ChartKind::Pie);
        let rendered = ChartJsRenderer.render(&spec, &data).unwrap();

        assert!(rendered.markup.contains("chart.js"));
        assert!(rendered.markup.contains("type: 'pie'"));
        assert!(rendered.markup.contains("Valor by Data"));
        assert!(rendered.markup.contains("2024-01-02"));
    }

    #[test]
    fn test_chartjs_escapes_title() {
        let (mut spec, data) = sample_spec(ChartKind::Bar);
        spec.title = "<script>alert(1)</script>".to_string();
        let rendered = ChartJsRenderer.render(&spec, &data).unwrap();

        assert!(!rendered.markup.contains("<script>alert"));
        assert!(rendered.markup.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_chartjs_cannot_export_bytes() {
        let (spec, data) = sample_spec(ChartKind::Bar);
        let result = ChartJsRenderer.export(&spec, &data, ExportFormat::Png);
        assert!(matches!(result, Err(VizError::Export(_))));
    }
}
