//! Adam optimizer.
//!
//! Keeps exponential moving averages of the gradients (first moment) and of the
//! squared gradients (second moment) for one parameter tensor:
//!
//! ```text
//! m = beta1 * m + (1 - beta1) * g
//! v = beta2 * v + (1 - beta2) * g^2
//! m_hat = m / (1 - beta1^t)
//! v_hat = v / (1 - beta2^t)
//! p = p - lr * m_hat / (sqrt(v_hat) + epsilon)
//! ```

#[derive(Debug, Clone)]
pub struct Adam {
  learning_rate: f64,
  beta1: f64,
  beta2: f64,
  epsilon: f64,
  m: Vec<f64>,
  v: Vec<f64>,
  t: i32,
}

impl Adam {
  pub fn new(learning_rate: f64) -> Self {
    Self::with_params(learning_rate, 0.9, 0.999, 1e-7)
  }

  pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
    Self {
      learning_rate,
      beta1,
      beta2,
      epsilon,
      m: Vec::new(),
      v: Vec::new(),
      t: 0,
    }
  }

  pub fn timestep(&self) -> i32 {
    self.t
  }

  /// Applies one update. `params` and `gradients` are walked in the same logical order.
  pub fn apply_gradients<'p, 'g>(
    &mut self,
    params: impl ExactSizeIterator<Item = &'p mut f64>,
    gradients: impl IntoIterator<Item = &'g f64>,
  ) {
    if self.m.len() != params.len() {
      self.m = vec![0.0; params.len()];
      self.v = vec![0.0; params.len()];
    }

    self.t += 1;
    let bias_correction1 = 1.0 - self.beta1.powi(self.t);
    let bias_correction2 = 1.0 - self.beta2.powi(self.t);

    for (i, (p, g)) in params.zip(gradients).enumerate() {
      self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
      self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
      let m_hat = self.m[i] / bias_correction1;
      let v_hat = self.v[i] / bias_correction2;
      *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::Adam;

  #[test]
  fn first_step_moves_by_learning_rate() {
    // with bias correction the first update is lr * sign(g)
    let mut adam = Adam::new(0.1);
    let mut params = vec![1.0, 1.0];
    adam.apply_gradients(params.iter_mut(), &[0.5, -2.0]);
    assert!((params[0] - 0.9).abs() < 1e-6);
    assert!((params[1] - 1.1).abs() < 1e-6);
    assert_eq!(adam.timestep(), 1);
  }

  #[test]
  fn minimizes_a_quadratic() {
    let mut adam = Adam::new(0.05);
    let mut x = vec![5.0];
    for _ in 0..2000 {
      let grad = [2.0 * (x[0] - 3.0)];
      adam.apply_gradients(x.iter_mut(), &grad);
    }
    assert!((x[0] - 3.0).abs() < 1e-2, "x = {}", x[0]);
  }
}
