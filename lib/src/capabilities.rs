use serde::Serialize;
use tracing::warn;

/// Optional functionality, resolved once at startup.
///
/// The compiled cargo features set the upper bound; configuration may only switch
/// things off. Every consumer branches on these flags instead of probing for a model
/// or a chart backend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
  /// Model training and evaluation.
  pub training: bool,
  /// Historical trend chart rendering.
  pub charts: bool,
}

impl Capabilities {
  /// What this build supports.
  pub fn detect() -> Self {
    Self {
      training: cfg!(feature = "training"),
      charts: cfg!(feature = "charts"),
    }
  }

  /// Narrows the detected set with optional overrides (`None` keeps the detected value).
  pub fn restrict(self, training: Option<bool>, charts: Option<bool>) -> Self {
    Self {
      training: self.training && training.unwrap_or(true),
      charts: self.charts && charts.unwrap_or(true),
    }
  }

  /// Logs one warning per missing capability.
  pub fn report(&self) {
    if !self.training {
      warn!("Model training is not available. Training and evaluation will be skipped.");
    }
    if !self.charts {
      warn!("Charting is not available. The historical trend chart will be skipped.");
    }
  }
}

impl Default for Capabilities {
  fn default() -> Self {
    Self::detect()
  }
}
