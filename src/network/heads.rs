//! Policy and value heads.
//!
//! A head maps the latent vector of an encoder (or a raw state) to actions, action
//! distributions or values.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::{concat, NeuralNetwork};
use crate::activations::{softplus, Activation};
use crate::error::{ColavError, Result};

/// Latent → hidden (ReLU) → action in `[-1, 1]` (tanh)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeterministicHead {
    net: NeuralNetwork,
}

impl DeterministicHead {
    pub fn new<R: Rng + ?Sized>(
        latent_size: usize,
        hidden_size: usize,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(DeterministicHead {
            net: NeuralNetwork::mlp(
                latent_size,
                &[hidden_size],
                action_dim,
                Activation::Tanh,
                rng,
            )?,
        })
    }

    pub fn action_dim(&self) -> usize {
        self.net.output_size()
    }

    pub fn forward(&self, latent: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.net.forward(latent)
    }

    pub fn forward_batch(&self, latents: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.net.forward_batch(latents)
    }
}

/// Action drawn from a [`GaussianHead`]
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianSample {
    /// Squashed action in `[-1, 1]`
    pub action: Array1<f32>,
    /// Log-density of the squashed action, when requested
    pub log_prob: Option<f32>,
}

/// Squashed Gaussian policy head
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianHead {
    hidden: NeuralNetwork,
    mu: NeuralNetwork,
    log_std: NeuralNetwork,
}

impl GaussianHead {
    pub const LOG_STD_MIN: f32 = -20.0;
    pub const LOG_STD_MAX: f32 = 2.0;

    pub fn new<R: Rng + ?Sized>(
        latent_size: usize,
        hidden_size: usize,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(GaussianHead {
            hidden: NeuralNetwork::new(&[latent_size, hidden_size], &[Activation::Relu], rng)?,
            mu: NeuralNetwork::new(&[hidden_size, action_dim], &[Activation::Linear], rng)?,
            log_std: NeuralNetwork::new(&[hidden_size, action_dim], &[Activation::Linear], rng)?,
        })
    }

    pub fn action_dim(&self) -> usize {
        self.mu.output_size()
    }

    /// Mean and clamped log standard deviation of the pre-squash distribution
    pub fn distribution(&self, latent: ArrayView1<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        let x = self.hidden.forward(latent)?;
        let mu = self.mu.forward(x.view())?;
        let log_std = self
            .log_std
            .forward(x.view())?
            .mapv(|v| v.clamp(Self::LOG_STD_MIN, Self::LOG_STD_MAX));
        Ok((mu, log_std))
    }

    /// Sample an action, or take the mean when `deterministic`
    pub fn forward<R: Rng + ?Sized>(
        &self,
        latent: ArrayView1<f32>,
        deterministic: bool,
        with_log_prob: bool,
        rng: &mut R,
    ) -> Result<GaussianSample> {
        let (mu, log_std) = self.distribution(latent)?;
        let std = log_std.mapv(f32::exp);

        let pre_squash = if deterministic {
            mu.clone()
        } else {
            let mut sample = Array1::zeros(mu.len());
            for i in 0..mu.len() {
                let normal = Normal::new(mu[i], std[i])
                    .map_err(|e| ColavError::Numerical(e.to_string()))?;
                sample[i] = rng.sample(normal);
            }
            sample
        };

        let log_prob = if with_log_prob {
            Some(squashed_log_prob(pre_squash.view(), mu.view(), log_std.view()))
        } else {
            None
        };

        Ok(GaussianSample {
            action: pre_squash.mapv(f32::tanh),
            log_prob,
        })
    }
}

/// Log-density of `tanh(u)` for `u ~ N(mu, exp(log_std))`, summed over action dimensions
fn squashed_log_prob(u: ArrayView1<f32>, mu: ArrayView1<f32>, log_std: ArrayView1<f32>) -> f32 {
    let half_ln_two_pi = 0.5 * (2.0 * std::f32::consts::PI).ln();
    let ln_two = std::f32::consts::LN_2;

    u.iter()
        .zip(mu.iter())
        .zip(log_std.iter())
        .map(|((&u, &mu), &log_std)| {
            let z = (u - mu) / log_std.exp();
            let gaussian = -0.5 * z * z - log_std - half_ln_two_pi;
            // log |d tanh(u) / du| in a form that stays finite for large |u|
            let correction = 2.0 * (ln_two - u - softplus(-2.0 * u));
            gaussian - correction
        })
        .sum()
}

/// Critic head: (action, latent) → hidden (ReLU) → scalar value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueHead {
    net: NeuralNetwork,
    action_dim: usize,
}

impl ValueHead {
    pub fn new<R: Rng + ?Sized>(
        latent_size: usize,
        action_dim: usize,
        hidden_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(ValueHead {
            net: NeuralNetwork::mlp(
                action_dim + latent_size,
                &[hidden_size],
                1,
                Activation::Linear,
                rng,
            )?,
            action_dim,
        })
    }

    pub fn forward(&self, latent: ArrayView1<f32>, action: ArrayView1<f32>) -> Result<f32> {
        if action.len() != self.action_dim {
            return Err(ColavError::dimension_mismatch(
                format!("action of size {}", self.action_dim),
                format!("action of size {}", action.len()),
            ));
        }
        let value = self.net.forward(concat(action, latent).view())?;
        Ok(value[0])
    }
}

/// Latent → hidden (ReLU) → one value per discrete action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscreteHead {
    net: NeuralNetwork,
}

impl DiscreteHead {
    pub fn new<R: Rng + ?Sized>(
        latent_size: usize,
        hidden_size: usize,
        num_actions: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(DiscreteHead {
            net: NeuralNetwork::mlp(
                latent_size,
                &[hidden_size],
                num_actions,
                Activation::Linear,
                rng,
            )?,
        })
    }

    pub fn num_actions(&self) -> usize {
        self.net.output_size()
    }

    pub fn forward(&self, latent: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.net.forward(latent)
    }
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Ensemble of distributional critics, each predicting quantiles of the return
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantileCritics {
    nets: Vec<NeuralNetwork>,
    state_size: usize,
    action_dim: usize,
}

impl QuantileCritics {
    /// `n_critics` networks with independently drawn parameters
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        action_dim: usize,
        n_quantiles: usize,
        n_critics: usize,
        hidden_sizes: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        if n_critics == 0 || n_quantiles == 0 {
            return Err(ColavError::invalid_parameter(
                "n_critics/n_quantiles",
                "must both be positive",
            ));
        }
        let nets = (0..n_critics)
            .map(|_| {
                NeuralNetwork::mlp(
                    state_size + action_dim,
                    hidden_sizes,
                    n_quantiles,
                    Activation::Linear,
                    rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(QuantileCritics {
            nets,
            state_size,
            action_dim,
        })
    }

    pub fn n_critics(&self) -> usize {
        self.nets.len()
    }

    pub fn n_quantiles(&self) -> usize {
        self.nets[0].output_size()
    }

    /// Quantiles of shape `(n_critics, n_quantiles)`
    pub fn forward(&self, state: ArrayView1<f32>, action: ArrayView1<f32>) -> Result<Array2<f32>> {
        if state.len() != self.state_size || action.len() != self.action_dim {
            return Err(ColavError::dimension_mismatch(
                format!("state {} / action {}", self.state_size, self.action_dim),
                format!("state {} / action {}", state.len(), action.len()),
            ));
        }
        let input = concat(state, action);

        let mut quantiles = Array2::zeros((self.nets.len(), self.n_quantiles()));
        for (mut row, net) in quantiles.axis_iter_mut(Axis(0)).zip(&self.nets) {
            row.assign(&net.forward(input.view())?);
        }
        Ok(quantiles)
    }
}

/// Shared core network followed by `K` independent heads
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapHeads {
    core: NeuralNetwork,
    heads: Vec<NeuralNetwork>,
}

impl BootstrapHeads {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        num_actions: usize,
        num_heads: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if num_heads == 0 {
            return Err(ColavError::invalid_parameter("num_heads", "must be positive"));
        }
        let core =
            NeuralNetwork::mlp(input_size, &[hidden_size], hidden_size, Activation::Linear, rng)?;
        let heads = (0..num_heads)
            .map(|_| {
                NeuralNetwork::mlp(
                    hidden_size,
                    &[hidden_size],
                    num_actions,
                    Activation::Linear,
                    rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BootstrapHeads { core, heads })
    }

    pub fn num_heads(&self) -> usize {
        self.heads.len()
    }

    /// Values of every head when `head` is `None`, otherwise only of the selected one
    pub fn forward(&self, input: ArrayView1<f32>, head: Option<usize>) -> Result<Vec<Array1<f32>>> {
        let features = self.core.forward(input)?;
        match head {
            None => self.heads.iter().map(|h| h.forward(features.view())).collect(),
            Some(k) => {
                let net = self.heads.get(k).ok_or_else(|| {
                    ColavError::invalid_parameter(
                        "head",
                        format!("index {} out of range for {} heads", k, self.heads.len()),
                    )
                })?;
                Ok(vec![net.forward(features.view())?])
            }
        }
    }
}
