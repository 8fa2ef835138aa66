use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{distributions::Uniform, Rng};

use super::Evaluation;

/// Hidden layer widths; the output layer is a single linear unit.
pub const HIDDEN_UNITS: [usize; 2] = [64, 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
  Relu,
  Linear,
}

impl Activation {
  fn apply(self, z: &Array2<f64>) -> Array2<f64> {
    match self {
      Activation::Relu => z.mapv(|v| v.max(0.0)),
      Activation::Linear => z.clone(),
    }
  }

  fn derivative(self, z: &Array2<f64>) -> Array2<f64> {
    match self {
      Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
      Activation::Linear => Array2::ones(z.raw_dim()),
    }
  }
}

/// Fully connected layer computing `act(x W + b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
  /// `[in_features, out_features]`
  pub weights: Array2<f64>,
  /// `[out_features]`
  pub bias: Array1<f64>,
  pub activation: Activation,
}

impl Dense {
  /// Glorot-uniform weights, zero bias.
  pub fn new<R: Rng>(in_features: usize, out_features: usize, activation: Activation, rng: &mut R) -> Self {
    let limit = (6.0 / (in_features + out_features) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Self {
      weights: Array2::from_shape_fn((in_features, out_features), |_| rng.sample(&dist)),
      bias: Array1::zeros(out_features),
      activation,
    }
  }

  fn pre_activation(&self, x: &Array2<f64>) -> Array2<f64> {
    x.dot(&self.weights) + &self.bias
  }
}

/// Gradients for one layer, same shapes as its parameters.
#[derive(Debug, Clone)]
pub struct LayerGradients {
  pub weights: Array2<f64>,
  pub bias: Array1<f64>,
}

/// The regressor: `input -> dense(64, relu) -> dense(32, relu) -> dense(1, linear)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
  layers: Vec<Dense>,
}

impl Network {
  pub fn new<R: Rng>(input_dim: usize, rng: &mut R) -> Self {
    let mut layers = Vec::with_capacity(HIDDEN_UNITS.len() + 1);
    let mut fan_in = input_dim;
    for units in HIDDEN_UNITS {
      layers.push(Dense::new(fan_in, units, Activation::Relu, rng));
      fan_in = units;
    }
    layers.push(Dense::new(fan_in, 1, Activation::Linear, rng));
    Self { layers }
  }

  pub fn input_dim(&self) -> usize {
    self.layers[0].weights.nrows()
  }

  pub fn layers(&self) -> &[Dense] {
    &self.layers
  }

  pub fn layers_mut(&mut self) -> &mut [Dense] {
    &mut self.layers
  }

  /// Predictions for a `[batch, input_dim]` matrix.
  pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
    let out = self
      .layers
      .iter()
      .fold(x.to_owned(), |a, layer| layer.activation.apply(&layer.pre_activation(&a)));
    out.column(0).to_owned()
  }

  pub fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
    let x = row.insert_axis(Axis(0)).to_owned();
    self.predict(&x)[0]
  }

  /// Loss and MAE over the batch, plus the loss gradient for every layer.
  pub fn backward(&self, x: &Array2<f64>, y: &Array1<f64>) -> (Evaluation, Vec<LayerGradients>) {
    let n = x.nrows().max(1) as f64;

    // forward pass, keeping inputs and pre-activations per layer
    let mut inputs = Vec::with_capacity(self.layers.len());
    let mut pre = Vec::with_capacity(self.layers.len());
    let mut a = x.to_owned();
    for layer in &self.layers {
      let z = layer.pre_activation(&a);
      let next = layer.activation.apply(&z);
      inputs.push(a);
      pre.push(z);
      a = next;
    }

    let error = &a.column(0) - y;
    let loss = error.mapv(|e| e * e).sum() / n;
    let mae = error.mapv(f64::abs).sum() / n;

    // d loss / d output, shape [batch, 1]
    let mut delta = (error * (2.0 / n)).insert_axis(Axis(1));
    let mut grads = Vec::with_capacity(self.layers.len());
    for (i, layer) in self.layers.iter().enumerate().rev() {
      delta = delta * layer.activation.derivative(&pre[i]);
      grads.push(LayerGradients {
        weights: inputs[i].t().dot(&delta),
        bias: delta.sum_axis(Axis(0)),
      });
      if i > 0 {
        delta = delta.dot(&layer.weights.t());
      }
    }
    grads.reverse();
    (Evaluation { loss, mae }, grads)
  }
}

#[cfg(test)]
mod tests {
  use ndarray::{array, Array1, Array2};
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;

  #[test]
  fn topology_is_fixed() {
    let net = Network::new(7, &mut StdRng::seed_from_u64(0));
    let shapes: Vec<_> = net.layers().iter().map(|l| l.weights.dim()).collect();
    assert_eq!(shapes, vec![(7, 64), (64, 32), (32, 1)]);
    assert_eq!(net.layers()[2].activation, Activation::Linear);
    assert!(net.layers().iter().all(|l| l.bias.iter().all(|b| *b == 0.0)));
  }

  #[test]
  fn predict_shape() {
    let net = Network::new(3, &mut StdRng::seed_from_u64(0));
    let x = Array2::ones((5, 3));
    assert_eq!(net.predict(&x).len(), 5);
    let single = net.predict_one(array![1.0, 1.0, 1.0].view());
    assert!((single - net.predict(&x)[0]).abs() < 1e-12);
  }

  #[test]
  fn gradients_match_finite_differences() {
    let mut net = Network::new(2, &mut StdRng::seed_from_u64(3));
    let x = array![[0.5, -1.0], [1.5, 2.0], [-0.3, 0.7]];
    let y: Array1<f64> = array![1.0, -2.0, 0.5];
    let (_, grads) = net.backward(&x, &y);

    let eps = 1e-6;
    for (layer, (r, c)) in [(0usize, (1usize, 3usize)), (1, (10, 5)), (2, (4, 0))] {
      let original = net.layers()[layer].weights[[r, c]];
      net.layers_mut()[layer].weights[[r, c]] = original + eps;
      let up = net.backward(&x, &y).0.loss;
      net.layers_mut()[layer].weights[[r, c]] = original - eps;
      let down = net.backward(&x, &y).0.loss;
      net.layers_mut()[layer].weights[[r, c]] = original;
      let numeric = (up - down) / (2.0 * eps);
      assert!(
        (numeric - grads[layer].weights[[r, c]]).abs() < 1e-5,
        "layer {layer} weight ({r}, {c}): numeric {numeric}, analytic {}",
        grads[layer].weights[[r, c]]
      );
    }
  }
}
