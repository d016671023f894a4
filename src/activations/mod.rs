//! # Activation Functions Module
//!
//! Element-wise non-linearities applied by dense layers and heads.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)` - hidden layers of every encoder and head
//! - **Tanh**: hyperbolic tangent, outputs in `[-1, 1]` - bounded continuous actions
//! - **Sigmoid**: `1 / (1 + e^(-x))` - gates of the recurrent layers
//! - **Linear**: identity - value and Q-value outputs
//!
//! ## Usage Example
//!
//! ```rust
//! use colav::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![1.0, -0.5, 0.0, 2.0];
//! Activation::Relu.apply(&mut data);
//! assert_eq!(data, array![1.0, 0.0, 0.0, 2.0]);
//! ```

pub mod functions;

pub use functions::{sigmoid, softplus, Activation};
