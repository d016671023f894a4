use ndarray::{s, Array1, Array2, Array3, ArrayView3};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::traits::SequenceModel;
use crate::activations::sigmoid;

/// LSTM (Long Short-Term Memory) layer for sequence processing
///
/// Maintains a cell state next to the hidden state; only the hidden states are emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    /// Number of LSTM units
    pub hidden_size: usize,

    // input gate
    pub w_ii: Array2<f32>,
    pub w_hi: Array2<f32>,
    pub b_i: Array1<f32>,

    // forget gate
    pub w_if: Array2<f32>,
    pub w_hf: Array2<f32>,
    pub b_f: Array1<f32>,

    // cell gate
    pub w_ig: Array2<f32>,
    pub w_hg: Array2<f32>,
    pub b_g: Array1<f32>,

    // output gate
    pub w_io: Array2<f32>,
    pub w_ho: Array2<f32>,
    pub b_o: Array1<f32>,
}

impl LstmLayer {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let scale = (1.0 / (input_size + hidden_size).max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-scale, scale);

        LstmLayer {
            input_size,
            hidden_size,

            w_ii: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hi: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_i: Array1::zeros(hidden_size),

            w_if: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hf: Array2::random_using((hidden_size, hidden_size), dist, rng),
            // forget gate starts open
            b_f: Array1::ones(hidden_size),

            w_ig: Array2::random_using((input_size, hidden_size), dist, rng),
            w_hg: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_g: Array1::zeros(hidden_size),

            w_io: Array2::random_using((input_size, hidden_size), dist, rng),
            w_ho: Array2::random_using((hidden_size, hidden_size), dist, rng),
            b_o: Array1::zeros(hidden_size),
        }
    }
}

impl SequenceModel for LstmLayer {
    fn forward_sequence(&self, input: ArrayView3<f32>) -> Array3<f32> {
        let (batch_size, seq_len, _) = input.dim();

        let mut h_t = Array2::<f32>::zeros((batch_size, self.hidden_size));
        let mut c_t = Array2::<f32>::zeros((batch_size, self.hidden_size));
        let mut outputs = Array3::zeros((batch_size, seq_len, self.hidden_size));

        for t in 0..seq_len {
            let x_t = input.slice(s![.., t, ..]);

            let i_t = (x_t.dot(&self.w_ii) + h_t.dot(&self.w_hi) + &self.b_i).mapv(sigmoid);
            let f_t = (x_t.dot(&self.w_if) + h_t.dot(&self.w_hf) + &self.b_f).mapv(sigmoid);
            let g_t = (x_t.dot(&self.w_ig) + h_t.dot(&self.w_hg) + &self.b_g).mapv(f32::tanh);
            let o_t = (x_t.dot(&self.w_io) + h_t.dot(&self.w_ho) + &self.b_o).mapv(sigmoid);

            // c_t = f_t * c_{t-1} + i_t * g_t
            c_t = &f_t * &c_t + &i_t * &g_t;

            // h_t = o_t * tanh(c_t)
            h_t = &o_t * &c_t.mapv(f32::tanh);

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
