use ndarray::{s, Array1, Array2, Array3, ArrayView3};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::traits::SequenceModel;
use crate::activations::sigmoid;

/// GRU (Gated Recurrent Unit) layer for sequence processing
///
/// The GRU combines the forget and input gates of an LSTM into a single update gate and
/// keeps no separate cell state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GruLayer {
    pub input_size: usize,
    /// Number of GRU units
    pub hidden_size: usize,

    // reset gate
    pub w_ir: Array2<f32>,
    pub w_hr: Array2<f32>,
    pub b_r: Array1<f32>,

    // update gate
    pub w_iz: Array2<f32>,
    pub w_hz: Array2<f32>,
    pub b_z: Array1<f32>,

    // candidate hidden state
    pub w_in: Array2<f32>,
    pub w_hn: Array2<f32>,
    pub b_n: Array1<f32>,
}

impl GruLayer {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let scale = (1.0 / (input_size + hidden_size).max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-scale, scale);

        GruLayer {
            input_size,
            hidden_size,

            w_ir: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hr: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_r: Array1::zeros(hidden_size),

            w_iz: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hz: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_z: Array1::zeros(hidden_size),

            w_in: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hn: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_n: Array1::zeros(hidden_size),
        }
    }
}

impl SequenceModel for GruLayer {
    fn forward_sequence(&self, input: ArrayView3<f32>) -> Array3<f32> {
        let (batch_size, seq_len, _) = input.dim();

        let mut h_t = Array2::<f32>::zeros((batch_size, self.hidden_size));
        let mut outputs = Array3::zeros((batch_size, seq_len, self.hidden_size));

        for t in 0..seq_len {
            let x_t = input.slice(s![.., t, ..]);

            // r_t = sigmoid(x_t W_ir + h_{t-1} W_hr + b_r)
            let r_t = (x_t.dot(&self.w_ir) + h_t.dot(&self.w_hr) + &self.b_r).mapv(sigmoid);

            // z_t = sigmoid(x_t W_iz + h_{t-1} W_hz + b_z)
            let z_t = (x_t.dot(&self.w_iz) + h_t.dot(&self.w_hz) + &self.b_z).mapv(sigmoid);

            // n_t = tanh(x_t W_in + (r_t * h_{t-1}) W_hn + b_n)
            let n_t =
                (x_t.dot(&self.w_in) + (&r_t * &h_t).dot(&self.w_hn) + &self.b_n).mapv(f32::tanh);

            // h_t = (1 - z_t) * n_t + z_t * h_{t-1}
            h_t = &(1.0 - &z_t) * &n_t + &z_t * &h_t;

            outputs.slice_mut(s![.., t, ..]).assign(&h_t);
        }

        outputs
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
