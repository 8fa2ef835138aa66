use ndarray::ArrayView1;
use serde::Serialize;
use tracing::info;

use super::TrainedModel;
use crate::data::Split;

pub fn mean_absolute_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
  (&y_true - &y_pred).mapv(f64::abs).mean().unwrap_or(f64::NAN)
}

pub fn mean_squared_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
  (&y_true - &y_pred).mapv(|e| e * e).mean().unwrap_or(f64::NAN)
}

/// Coefficient of determination. Negative when the predictions do worse than the
/// mean of `y_true`; with a constant `y_true` it is 1.0 for a perfect fit, else 0.0.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
  let Some(mean) = y_true.mean() else {
    return f64::NAN;
  };
  let ss_res = (&y_true - &y_pred).mapv(|e| e * e).sum();
  let ss_tot = y_true.mapv(|v| (v - mean) * (v - mean)).sum();
  if ss_tot == 0.0 {
    return if ss_res == 0.0 { 1.0 } else { 0.0 };
  }
  1.0 - ss_res / ss_tot
}

/// Test-partition numbers: the model's own loss/MAE plus independently computed
/// MAE, MSE and R².
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
  pub loss: f64,
  pub mae: f64,
  pub mean_absolute_error: f64,
  pub mean_squared_error: f64,
  pub r_squared: f64,
  pub test_rows: usize,
}

impl EvaluationReport {
  /// `None` for an empty partition.
  pub fn compute(model: &TrainedModel, test: &Split) -> Option<Self> {
    if test.is_empty() {
      return None;
    }
    let own = model.evaluate(&test.x, &test.y);
    let predicted = model.predict(&test.x);
    let report = Self {
      loss: own.loss,
      mae: own.mae,
      mean_absolute_error: mean_absolute_error(test.y.view(), predicted.view()),
      mean_squared_error: mean_squared_error(test.y.view(), predicted.view()),
      r_squared: r2_score(test.y.view(), predicted.view()),
      test_rows: test.len(),
    };
    info!(
      loss = report.loss,
      mae = report.mae,
      mse = report.mean_squared_error,
      r2 = report.r_squared,
      "model evaluation"
    );
    Some(report)
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  #[test]
  fn errors() {
    let t = array![1.0, 2.0, 3.0];
    let p = array![2.0, 2.0, 1.0];
    assert!((mean_absolute_error(t.view(), p.view()) - 1.0).abs() < 1e-12);
    assert!((mean_squared_error(t.view(), p.view()) - 5.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn r2_perfect_and_mean_baseline() {
    let t = array![1.0, 2.0, 3.0];
    assert_eq!(r2_score(t.view(), t.view()), 1.0);
    let mean = array![2.0, 2.0, 2.0];
    assert!(r2_score(t.view(), mean.view()).abs() < 1e-12);
  }

  #[test]
  fn r2_can_be_negative() {
    let t = array![1.0, 2.0, 3.0];
    let p = array![3.0, 2.0, 1.0];
    assert!((r2_score(t.view(), p.view()) - (-3.0)).abs() < 1e-12);
  }

  #[test]
  fn r2_constant_target() {
    let t = array![4.0, 4.0];
    assert_eq!(r2_score(t.view(), t.view()), 1.0);
    assert_eq!(r2_score(t.view(), array![4.0, 5.0].view()), 0.0);
  }
}
