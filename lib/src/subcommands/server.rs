use std::{path::PathBuf, sync::Arc};

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
  routing::get,
  Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info, instrument};

use crate::{
  capabilities::Capabilities,
  dashboard::{price_trend, DashboardView, Selection, SelectionOptions, SelectionQuery, TrendPoint},
  error::DataError,
  model::{EvaluationReport, TrainingParams},
  pipeline::{run_pipeline, PipelineOutput},
};

pub const DEFAULT_PORT: u16 = 8501;

#[derive(Debug, Error)]
pub enum ServerError {
  #[error(transparent)]
  Data(#[from] DataError),
  #[error("pipeline worker failed: {0}")]
  Worker(#[from] JoinError),
  #[error("failed to serve: {0}")]
  Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
  fn into_response(self) -> Response {
    error!(error = %self, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
  }
}

#[derive(Debug)]
struct AppState {
  data: PathBuf,
  caps: Capabilities,
  params: TrainingParams,
}

/// One full pipeline run on a blocking worker. Only loading is cached between runs.
async fn run_blocking(state: &Arc<AppState>) -> Result<PipelineOutput, ServerError> {
  let state = Arc::clone(state);
  let output =
    tokio::task::spawn_blocking(move || run_pipeline(&state.data, &state.caps, &state.params)).await??;
  Ok(output)
}

/// The dashboard web server.
pub struct Server {
  port: u16,
  state: Arc<AppState>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
  selection: Option<Selection>,
  prediction: Option<f64>,
}

impl Server {
  pub fn new(data: PathBuf, port: u16, caps: Capabilities, params: TrainingParams) -> Self {
    Self {
      port,
      state: Arc::new(AppState { data, caps, params }),
    }
  }

  pub fn router(&self) -> Router {
    Router::new()
      .route("/", get(Self::dashboard))
      .route("/api/predict", get(Self::predict))
      .route("/api/trend", get(Self::trend))
      .route("/api/evaluation", get(Self::evaluation))
      .with_state(Arc::clone(&self.state))
  }

  /// Runs the pipeline once so a bad data file stops startup, then serves.
  #[instrument(skip(self), fields(port = self.port, data = %self.state.data.display()))]
  pub async fn run(self) -> Result<(), ServerError> {
    run_blocking(&self.state).await?;

    let server_addr = format!("0.0.0.0:{}", self.port);
    let app = self.router();
    let tcp_listener = tokio::net::TcpListener::bind(&server_addr).await?;
    info!(%server_addr, "dashboard listening");
    axum::serve(tcp_listener, app).await?;
    Ok(())
  }

  async fn dashboard(
    State(state): State<Arc<AppState>>,
    query: Option<Query<SelectionQuery>>,
  ) -> Result<Html<String>, ServerError> {
    let output = run_blocking(&state).await?;
    let query = query.map(|Query(q)| q).unwrap_or_default();
    Ok(Html(DashboardView::build(&output, &state.caps, &query).render()))
  }

  async fn predict(
    State(state): State<Arc<AppState>>,
    query: Option<Query<SelectionQuery>>,
  ) -> Result<Json<PredictResponse>, ServerError> {
    let output = run_blocking(&state).await?;
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let selection = SelectionOptions::from_table(&output.table).resolve(&query);
    let prediction = match (&selection, &output.model) {
      (Some(selection), Some(model)) => {
        let row = output.features.encoder.encode_row(&selection.feature_input(&output.table));
        Some(model.predict_one(row.view()))
      }
      _ => None,
    };
    Ok(Json(PredictResponse { selection, prediction }))
  }

  async fn trend(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TrendPoint>>, ServerError> {
    let output = run_blocking(&state).await?;
    Ok(Json(price_trend(&output.table)))
  }

  async fn evaluation(
    State(state): State<Arc<AppState>>,
  ) -> Result<Json<Option<EvaluationReport>>, ServerError> {
    let output = run_blocking(&state).await?;
    Ok(Json(output.evaluation))
  }
}
