use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};

/// Feed-forward layer evaluated with fixed parameters
pub trait Layer {
    /// Forward propagation for a single input
    fn forward(&self, input: ArrayView1<f32>) -> Array1<f32>;

    /// Forward propagation for a batch of inputs, one per row
    fn forward_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32>;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;
}

/// Recurrent layer mapping a sequence to a sequence of hidden states.
///
/// Input shape is `(batch, steps, input_size)`, output shape `(batch, steps, hidden_size)`.
/// The hidden state starts at zero for every call, and the output at step `t` depends only
/// on steps `0..=t`.
pub trait SequenceModel {
    fn forward_sequence(&self, input: ArrayView3<f32>) -> Array3<f32>;

    fn input_size(&self) -> usize;

    fn hidden_size(&self) -> usize;
}
