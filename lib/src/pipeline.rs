use std::path::Path;

use tracing::{info, instrument, warn};

use crate::{
  capabilities::Capabilities,
  data::{self, features::TEST_RATIO, CleanTable, FeatureSet},
  error::Result,
  model::{self, EvaluationReport, TrainedModel, TrainingParams},
};

/// Everything one run produces. `model` and `evaluation` are absent when training is
/// unavailable or there is nothing to train on.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
  pub table: CleanTable,
  pub features: FeatureSet,
  pub model: Option<TrainedModel>,
  pub evaluation: Option<EvaluationReport>,
}

/// Load (memoized), clean, encode and split, then train and evaluate when allowed.
#[instrument(skip(caps, params), fields(training = caps.training, seed = params.seed))]
pub fn run_pipeline(path: &Path, caps: &Capabilities, params: &TrainingParams) -> Result<PipelineOutput> {
  let raw = data::load_data(path)?;
  let table = data::clean(&raw)?;
  let features = data::build_features(&table, TEST_RATIO, params.seed)?;

  let model = if !caps.training {
    None
  } else if features.train.is_empty() {
    warn!("training partition is empty, no model will be fitted");
    None
  } else {
    Some(model::fit(&features.train.x, &features.train.y, params))
  };

  let evaluation = match &model {
    Some(model) => {
      let report = EvaluationReport::compute(model, &features.test);
      if report.is_none() {
        warn!("test partition is empty, evaluation skipped");
      }
      report
    }
    None => None,
  };

  info!(
    rows = table.len(),
    trained = model.is_some(),
    evaluated = evaluation.is_some(),
    "pipeline finished"
  );
  Ok(PipelineOutput {
    table,
    features,
    model,
    evaluation,
  })
}
