use std::path::PathBuf;

use tracing::instrument;

use crate::{
  capabilities::Capabilities,
  dashboard::{PredictionPanel, Selection},
  error::Result,
  model::TrainingParams,
  pipeline::run_pipeline,
};

/// One prediction from the command line. Unlike the dashboard the values are used
/// as given, so a region the data never showed is encoded as the baseline.
pub struct Predict {
  data: PathBuf,
  caps: Capabilities,
  params: TrainingParams,
  region: String,
  year: i32,
  month: u32,
}

impl Predict {
  pub fn new(
    data: PathBuf,
    caps: Capabilities,
    params: TrainingParams,
    region: String,
    year: i32,
    month: u32,
  ) -> Self {
    Self {
      data,
      caps,
      params,
      region,
      year,
      month,
    }
  }

  #[instrument(skip(self), fields(region = %self.region, year = self.year, month = self.month))]
  pub fn prediction(&self) -> Result<PredictionPanel> {
    let output = run_pipeline(&self.data, &self.caps, &self.params)?;
    let selection = Selection {
      region: self.region.clone(),
      year: self.year,
      month: self.month,
    };
    let input = selection.feature_input(&output.table);
    Ok(PredictionPanel::new(output.model.as_ref(), &output.features.encoder, &input))
  }

  pub fn run(self) -> Result<()> {
    println!("{}", self.prediction()?.message());
    Ok(())
  }
}
