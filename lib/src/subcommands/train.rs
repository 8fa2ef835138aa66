use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::{
  capabilities::Capabilities,
  error::DataError,
  model::{EvaluationReport, TrainingParams},
  pipeline::run_pipeline,
};

#[derive(Debug, Error)]
pub enum TrainError {
  #[error(transparent)]
  Data(#[from] DataError),
  #[error("cannot format training summary: {0}")]
  Format(#[from] serde_json::Error),
}

/// Runs the pipeline once and prints what training produced.
pub struct Train {
  data: PathBuf,
  caps: Capabilities,
  params: TrainingParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainSummary {
  pub features: Vec<String>,
  pub train_rows: usize,
  pub test_rows: usize,
  pub epochs_run: Option<usize>,
  pub restored_epoch: Option<usize>,
  pub evaluation: Option<EvaluationReport>,
}

impl TrainSummary {
  /// Pretty JSON, followed by a notice when no model was trained.
  pub fn render(&self) -> Result<String, TrainError> {
    let mut text = serde_json::to_string_pretty(self)?;
    if self.epochs_run.is_none() {
      text.push_str("\nModel training is not available. Training and evaluation were skipped.");
    }
    Ok(text)
  }
}

impl Train {
  pub fn new(data: PathBuf, caps: Capabilities, params: TrainingParams) -> Self {
    Self { data, caps, params }
  }

  #[instrument(skip(self), fields(data = %self.data.display()))]
  pub fn summary(&self) -> Result<TrainSummary, TrainError> {
    let output = run_pipeline(&self.data, &self.caps, &self.params)?;
    let history = output.model.as_ref().map(|m| m.history());
    Ok(TrainSummary {
      features: output.features.encoder.columns().to_vec(),
      train_rows: output.features.train.len(),
      test_rows: output.features.test.len(),
      epochs_run: history.map(|h| h.epochs.len()),
      restored_epoch: history.and_then(|h| h.restored_epoch),
      evaluation: output.evaluation,
    })
  }

  pub fn run(self) -> Result<(), TrainError> {
    println!("{}", self.summary()?.render()?);
    Ok(())
  }
}
