use serde::Serialize;

/// Seed used for the split, weight initialization and epoch shuffling.
pub const DEFAULT_SEED: u64 = 42;

/// Training schedule. The defaults are the only schedule the dashboard uses; tests
/// shorten it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingParams {
  pub epochs: usize,
  pub batch_size: usize,
  /// Trailing share of the training rows used for validation.
  pub validation_split: f64,
  /// Epochs without validation improvement before stopping.
  pub patience: usize,
  pub learning_rate: f64,
  pub seed: u64,
}

impl Default for TrainingParams {
  fn default() -> Self {
    Self {
      epochs: 200,
      batch_size: 32,
      validation_split: 0.2,
      patience: 10,
      learning_rate: 1e-3,
      seed: DEFAULT_SEED,
    }
  }
}

impl TrainingParams {
  pub fn with_seed(self, seed: u64) -> Self {
    Self { seed, ..self }
  }
}

/// Loss and MAE for one pass over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
  pub loss: f64,
  pub mae: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochRecord {
  pub epoch: usize,
  pub loss: f64,
  pub mae: f64,
  pub val_loss: Option<f64>,
  pub val_mae: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
  pub epochs: Vec<EpochRecord>,
  /// Epoch whose weights the model ended up with when early stopping fired.
  pub restored_epoch: Option<usize>,
}

impl History {
  pub fn stopped_early(&self) -> bool {
    self.restored_epoch.is_some()
  }
}
