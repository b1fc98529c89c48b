//! # folio-server
//!
//! Thin HTTP shell over the wizard: a health check and the chart export
//! endpoint. Upload and page transport for the full wizard belong to the
//! hosting application; nothing here touches wizard logic beyond calling
//! the facade.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use folio_viz::{ChartJsRenderer, ExportFormat};
use folio_wizard::{Wizard, WizardError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct Health {
    /// Server status ("ok" when healthy).
    pub status: String,
    /// Server version from Cargo.toml.
    pub version: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub wizard: Arc<Wizard>,
}

/// Query string for the export endpoint.
#[derive(Deserialize)]
pub struct ExportQuery {
    format: String,
}

/// Health check endpoint handler.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Export one chart artifact as raw bytes with its MIME type.
///
/// Unknown artifact ids (or ids whose backing file is gone) are a plain
/// 404; a bad `format` value is a 400.
pub async fn export_artifact(
    State(state): State<AppState>,
    Path((principal, artifact_id)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let format: ExportFormat = match query.format.parse() {
        Ok(format) => format,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.wizard.export(&principal, &artifact_id, format) {
        Ok((bytes, mime)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        Err(e @ WizardError::ArtifactNotFound { .. }) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(%principal, %artifact_id, error = %e, "export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/sessions/:principal/artifacts/:artifact_id/export",
            get(export_artifact),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_root = std::env::var("FOLIO_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("folio"));
    let wizard = Wizard::new(
        data_root.join("staging"),
        data_root.join("charts"),
        Arc::new(ChartJsRenderer),
    )?;
    let state = AppState {
        wizard: Arc::new(wizard),
    };

    let addr = std::env::var("FOLIO_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let app = create_router(state);

    tracing::info!(%addr, "folio-server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use folio_viz::{ChartData, ChartKind, ChartSpec, RenderedChart, Renderer};
    use folio_wizard::Upload;
    use indexmap::IndexMap;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct StubRenderer;

    impl Renderer for StubRenderer {
        fn render(&self, _spec: &ChartSpec, _data: &ChartData) -> folio_viz::Result<RenderedChart> {
            Ok(RenderedChart {
                markup: "<div></div>".to_string(),
            })
        }

        fn export(
            &self,
            _spec: &ChartSpec,
            _data: &ChartData,
            format: ExportFormat,
        ) -> folio_viz::Result<Vec<u8>> {
            Ok(format!("{}-bytes", format.as_str()).into_bytes())
        }
    }

    fn test_state(dir: &TempDir) -> AppState {
        let wizard = Wizard::new(
            dir.path().join("staging"),
            dir.path().join("charts"),
            Arc::new(StubRenderer),
        )
        .unwrap();
        AppState {
            wizard: Arc::new(wizard),
        }
    }

    /// Drive the wizard to the point where "u1" owns chart_1.
    fn generate_chart(state: &AppState, dir: &TempDir) {
        let path = dir.path().join("vendas.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Folha1").unwrap();
        worksheet.write_string(0, 0, "Data").unwrap();
        worksheet.write_string(0, 1, "Valor").unwrap();
        worksheet.write_string(1, 0, "2024-01-02").unwrap();
        worksheet.write_string(1, 1, "1,5").unwrap();
        workbook.save(&path).unwrap();

        state
            .wizard
            .stage_files(
                "u1",
                vec![Upload {
                    filename: "vendas.xlsx".to_string(),
                    bytes: std::fs::read(&path).unwrap(),
                }],
            )
            .unwrap();

        let mut selection = IndexMap::new();
        selection.insert("vendas.xlsx".to_string(), vec!["Folha1".to_string()]);
        state.wizard.select_sheets("u1", &selection).unwrap();
        state
            .wizard
            .build_chart("u1", "Data", "Valor", &[ChartKind::Bar])
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_export_returns_bytes_and_mime() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        generate_chart(&state, &dir);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/u1/artifacts/chart_1/export?format=png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"png-bytes");
    }

    #[tokio::test]
    async fn test_export_pdf_mime() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        generate_chart(&state, &dir);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/u1/artifacts/chart_1/export?format=pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
    }

    #[tokio::test]
    async fn test_export_unknown_artifact_is_404() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/u1/artifacts/chart_9/export?format=png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_bad_format_is_400() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        generate_chart(&state, &dir);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/u1/artifacts/chart_1/export?format=svg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_found_route() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
