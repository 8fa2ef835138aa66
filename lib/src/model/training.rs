use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info, instrument, warn};

use super::{adam::Adam, Network};
use super::{EpochRecord, Evaluation, History, TrainingParams};

/// Outcome of the early stopping check after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
  Continue,
  Stop,
}

/// Stops training once the monitored loss has not improved for `patience` epochs,
/// remembering the weights of the best epoch.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
  patience: usize,
  min_delta: f64,
  best_value: Option<f64>,
  best_epoch: usize,
  best_weights: Option<Network>,
  epochs_without_improvement: usize,
}

impl EarlyStopping {
  pub fn new(patience: usize) -> Self {
    Self {
      patience,
      min_delta: 0.0,
      best_value: None,
      best_epoch: 0,
      best_weights: None,
      epochs_without_improvement: 0,
    }
  }

  fn is_improvement(&self, current: f64) -> bool {
    match self.best_value {
      None => !current.is_nan(),
      Some(best) => current < best - self.min_delta,
    }
  }

  pub fn after_epoch(&mut self, epoch: usize, current: f64, network: &Network) -> StopAction {
    if self.is_improvement(current) {
      debug!(epoch, from = ?self.best_value, to = current, "monitored loss improved");
      self.best_value = Some(current);
      self.best_epoch = epoch;
      self.best_weights = Some(network.clone());
      self.epochs_without_improvement = 0;
      return StopAction::Continue;
    }

    self.epochs_without_improvement += 1;
    if self.epochs_without_improvement >= self.patience {
      info!(
        epoch,
        best_epoch = self.best_epoch,
        "stopping early, no improvement for {} epochs",
        self.patience
      );
      StopAction::Stop
    } else {
      StopAction::Continue
    }
  }

  pub fn best_epoch(&self) -> usize {
    self.best_epoch
  }

  /// Weights of the best epoch seen so far, handing them over.
  pub fn take_best_weights(&mut self) -> Option<Network> {
    self.best_weights.take()
  }
}

/// A fitted regressor together with how it was trained.
#[derive(Debug, Clone)]
pub struct TrainedModel {
  network: Network,
  history: History,
}

impl TrainedModel {
  pub fn network(&self) -> &Network {
    &self.network
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
    self.network.predict(x)
  }

  pub fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
    self.network.predict_one(row)
  }

  pub fn evaluate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Evaluation {
    evaluate(&self.network, x, y)
  }
}

pub fn evaluate(network: &Network, x: &Array2<f64>, y: &Array1<f64>) -> Evaluation {
  let error = network.predict(x) - y;
  let n = error.len() as f64;
  Evaluation {
    loss: error.mapv(|e| e * e).sum() / n,
    mae: error.mapv(f64::abs).sum() / n,
  }
}

/// Mini-batch Adam on mean squared error.
///
/// The trailing `validation_split` share of the rows is held out (not shuffled) and
/// drives early stopping; when it would be empty the training loss is monitored.
#[instrument(skip_all, fields(rows = x.nrows(), features = x.ncols()))]
pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &TrainingParams) -> TrainedModel {
  let mut rng = StdRng::seed_from_u64(params.seed);
  let mut network = Network::new(x.ncols(), &mut rng);

  let rows = x.nrows();
  let split_at = (rows as f64 * (1.0 - params.validation_split)).floor() as usize;
  let (fit_x, fit_y, validation) = if split_at == 0 || split_at >= rows {
    warn!(rows, "no validation rows, early stopping watches the training loss");
    (x.to_owned(), y.to_owned(), None)
  } else {
    (
      x.slice(s![..split_at, ..]).to_owned(),
      y.slice(s![..split_at]).to_owned(),
      Some((x.slice(s![split_at.., ..]).to_owned(), y.slice(s![split_at..]).to_owned())),
    )
  };

  let mut optimizers: Vec<(Adam, Adam)> = network
    .layers()
    .iter()
    .map(|_| (Adam::new(params.learning_rate), Adam::new(params.learning_rate)))
    .collect();
  let mut stopper = EarlyStopping::new(params.patience);
  let mut history = History::default();
  let mut order: Vec<usize> = (0..fit_x.nrows()).collect();
  let batch_size = params.batch_size.max(1);

  for epoch in 1..=params.epochs {
    order.shuffle(&mut rng);
    let (mut loss_sum, mut mae_sum) = (0.0, 0.0);
    for batch in order.chunks(batch_size) {
      let bx = fit_x.select(Axis(0), batch);
      let by = fit_y.select(Axis(0), batch);
      let (outcome, grads) = network.backward(&bx, &by);
      loss_sum += outcome.loss * batch.len() as f64;
      mae_sum += outcome.mae * batch.len() as f64;
      for ((layer, grad), (w_opt, b_opt)) in network
        .layers_mut()
        .iter_mut()
        .zip(&grads)
        .zip(optimizers.iter_mut())
      {
        w_opt.apply_gradients(layer.weights.iter_mut(), grad.weights.iter());
        b_opt.apply_gradients(layer.bias.iter_mut(), grad.bias.iter());
      }
    }

    let n = fit_x.nrows().max(1) as f64;
    let val = validation
      .as_ref()
      .map(|(vx, vy)| evaluate(&network, vx, vy));
    let record = EpochRecord {
      epoch,
      loss: loss_sum / n,
      mae: mae_sum / n,
      val_loss: val.map(|v| v.loss),
      val_mae: val.map(|v| v.mae),
    };
    debug!(?record, "epoch done");
    history.epochs.push(record);

    let monitored = record.val_loss.unwrap_or(record.loss);
    if stopper.after_epoch(epoch, monitored, &network) == StopAction::Stop {
      if let Some(best) = stopper.take_best_weights() {
        network = best;
        history.restored_epoch = Some(stopper.best_epoch());
      }
      break;
    }
  }

  info!(
    epochs = history.epochs.len(),
    restored_epoch = ?history.restored_epoch,
    "training finished"
  );
  TrainedModel { network, history }
}

#[cfg(test)]
mod tests {
  use ndarray::{Array1, Array2};
  use rand::{rngs::StdRng, Rng, SeedableRng};

  use super::*;
  use crate::utils;

  fn linear_data(rows: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(7);
    let x = Array2::from_shape_fn((rows, 2), |_| rng.gen_range(-1.0..1.0));
    let y = x.rows().into_iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 1.0).collect();
    (x, y)
  }

  #[test]
  fn patience_counts_epochs_without_improvement() {
    let net = Network::new(1, &mut StdRng::seed_from_u64(0));
    let mut stopper = EarlyStopping::new(3);
    let losses = [5.0, 4.0, 4.5, 4.2, 4.0];
    let actions: Vec<_> = losses
      .iter()
      .enumerate()
      .map(|(i, l)| stopper.after_epoch(i + 1, *l, &net))
      .collect();
    assert_eq!(
      actions,
      vec![
        StopAction::Continue,
        StopAction::Continue,
        StopAction::Continue,
        StopAction::Continue,
        StopAction::Stop
      ]
    );
    assert_eq!(stopper.best_epoch(), 2);
    assert!(stopper.take_best_weights().is_some());
  }

  #[test]
  fn learns_a_linear_target() {
    let _scope = utils::init_logging_tests();
    let (x, y) = linear_data(200);
    let params = TrainingParams {
      epochs: 150,
      learning_rate: 1e-2,
      ..TrainingParams::default()
    };
    let model = fit(&x, &y, &params);
    let first = model.history().epochs[0].loss;
    let eval = model.evaluate(&x, &y);
    assert!(eval.loss < first / 10.0, "loss went from {first} to {}", eval.loss);
    assert!(model.history().epochs.iter().all(|e| e.val_loss.is_some()));
  }

  #[test]
  fn restores_best_weights_when_stopping() {
    let (x, y) = linear_data(50);
    let params = TrainingParams {
      epochs: 200,
      patience: 1,
      ..TrainingParams::default()
    };
    let model = fit(&x, &y, &params);
    let history = model.history();
    if let Some(best) = history.restored_epoch {
      let best_val = history.epochs[best - 1].val_loss.unwrap();
      assert!(history.epochs.iter().all(|e| e.val_loss.unwrap() >= best_val));
      let vx = x.slice(s![40.., ..]).to_owned();
      let vy = y.slice(s![40..]).to_owned();
      assert!((model.evaluate(&vx, &vy).loss - best_val).abs() < 1e-9);
    } else {
      assert_eq!(history.epochs.len(), params.epochs);
    }
  }

  #[test]
  fn single_row_trains_without_validation() {
    let x = Array2::from_elem((1, 3), 1.0);
    let y = Array1::from_elem(1, 2.0);
    let params = TrainingParams {
      epochs: 5,
      ..TrainingParams::default()
    };
    let model = fit(&x, &y, &params);
    assert!(model.history().epochs.iter().all(|e| e.val_loss.is_none()));
    assert!(model.predict_one(x.row(0)).is_finite());
  }

  #[test]
  fn same_seed_same_model() {
    let (x, y) = linear_data(40);
    let params = TrainingParams {
      epochs: 3,
      ..TrainingParams::default()
    };
    assert_eq!(fit(&x, &y, &params).network(), fit(&x, &y, &params).network());
  }
}
