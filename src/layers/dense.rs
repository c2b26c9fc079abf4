use ndarray::linalg::{general_mat_mul, general_mat_vec_mul};
use ndarray::{Array, Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

use crate::activation::sigmoid;

/// One dense (fully connected) layer.
///
/// `weights` has shape `[out × in]`: row `i` holds the weights feeding output
/// node `i`. `activations` is the post-sigmoid output of the most recent
/// forward pass. `gradient` is the mini-batch accumulator: `None` between
/// updates, `Some` while a batch is in progress. Holding both gradient arrays
/// in one optional struct means they can never go out of step with each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub activations: Array1<f64>,
    #[serde(skip)]
    gradient: Option<LayerGradient>,
}

/// Accumulated weight and bias gradients for one layer over a mini-batch.
#[derive(Debug, Clone)]
pub struct LayerGradient {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

impl LayerGradient {
    fn zeros(out_size: usize, in_size: usize) -> LayerGradient {
        LayerGradient {
            weights: Array2::zeros((out_size, in_size)),
            biases: Array1::zeros(out_size),
        }
    }
}

impl Layer {
    /// Creates a layer with `out_size` nodes each fed by `in_size` inputs.
    ///
    /// Weights are sampled independently from a uniform distribution on
    /// `[-1/√in_size, 1/√in_size]` (Xavier-style bound for sigmoid units).
    /// Biases and activations start at zero; no gradient is allocated.
    pub fn new(in_size: usize, out_size: usize) -> Layer {
        let bound = 1.0 / (in_size as f64).sqrt();
        Layer {
            weights: Array::random((out_size, in_size), Uniform::new(-bound, bound)),
            biases: Array1::zeros(out_size),
            activations: Array1::zeros(out_size),
            gradient: None,
        }
    }

    /// Number of inputs feeding this layer.
    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of nodes in this layer.
    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Forward pass for this layer: `activations = σ(weights · input + biases)`.
    pub fn forward(&mut self, input: &Array1<f64>) {
        general_mat_vec_mul(1.0, &self.weights, input, 0.0, &mut self.activations);
        self.activations += &self.biases;
        self.activations.mapv_inplace(sigmoid::sigmoid);
    }

    /// Accumulates one example's gradient contribution into this layer:
    /// `gradient.weights += error ⊗ upstream` (outer product) and
    /// `gradient.biases += error`. Allocates the accumulator as zeros on the
    /// first call of a batch.
    pub fn accumulate(&mut self, error: &Array1<f64>, upstream: &Array1<f64>) {
        let (out_size, in_size) = self.weights.dim();
        let gradient = self
            .gradient
            .get_or_insert_with(|| LayerGradient::zeros(out_size, in_size));

        let error_column = error.view().insert_axis(Axis(1));
        let upstream_row = upstream.view().insert_axis(Axis(0));
        general_mat_mul(1.0, &error_column, &upstream_row, 1.0, &mut gradient.weights);
        gradient.biases += error;
    }

    /// Applies the accumulated gradient, scaled by `scale`, to the weights and
    /// biases in place, then releases the accumulator.
    ///
    /// Panics if no gradient has been accumulated; calling this outside a
    /// batch window is a bug in the caller.
    pub fn apply_gradient(&mut self, scale: f64) {
        let gradient = match self.gradient.take() {
            Some(gradient) => gradient,
            None => panic!("apply_gradient called on a layer with no accumulated gradient"),
        };

        self.weights.scaled_add(scale, &gradient.weights);
        self.biases.scaled_add(scale, &gradient.biases);
    }

    /// The current batch accumulator, if one is in progress.
    pub fn gradient(&self) -> Option<&LayerGradient> {
        self.gradient.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn new_layer_has_expected_shapes_and_zeroed_state() {
        let layer = Layer::new(4, 3);

        assert_eq!(layer.weights.dim(), (3, 4));
        assert_eq!(layer.in_dim(), 4);
        assert_eq!(layer.out_dim(), 3);
        assert!(layer.biases.iter().all(|&b| b == 0.0));
        assert!(layer.activations.iter().all(|&a| a == 0.0));
        assert!(layer.gradient().is_none());
    }

    #[test]
    fn new_layer_weights_respect_the_uniform_bound() {
        let layer = Layer::new(16, 8);
        let bound = 1.0 / 4.0;
        assert!(layer.weights.iter().all(|&w| w >= -bound && w <= bound));
    }

    #[test]
    fn forward_computes_sigmoid_of_affine_map() {
        let mut layer = Layer::new(2, 2);
        layer.weights = array![[1.0, 0.0], [0.0, -1.0]];
        layer.biases = array![0.0, 1.0];

        layer.forward(&array![0.0, 1.0]);

        assert_relative_eq!(layer.activations[0], 0.5, epsilon = 1e-12);
        // second node: σ(-1·1 + 1) = σ(0) = 0.5
        assert_relative_eq!(layer.activations[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn accumulate_builds_the_outer_product_and_sums_across_calls() {
        let mut layer = Layer::new(2, 2);

        let error = array![1.0, 2.0];
        let upstream = array![0.5, -1.0];

        layer.accumulate(&error, &upstream);
        let gradient = layer.gradient().unwrap();
        assert_relative_eq!(gradient.weights[[0, 0]], 0.5);
        assert_relative_eq!(gradient.weights[[0, 1]], -1.0);
        assert_relative_eq!(gradient.weights[[1, 0]], 1.0);
        assert_relative_eq!(gradient.weights[[1, 1]], -2.0);
        assert_relative_eq!(gradient.biases[0], 1.0);
        assert_relative_eq!(gradient.biases[1], 2.0);

        layer.accumulate(&error, &upstream);
        let gradient = layer.gradient().unwrap();
        assert_relative_eq!(gradient.weights[[1, 1]], -4.0);
        assert_relative_eq!(gradient.biases[1], 4.0);
    }

    #[test]
    fn apply_gradient_steps_parameters_and_releases_the_accumulator() {
        let mut layer = Layer::new(2, 1);
        layer.weights = array![[1.0, 1.0]];
        layer.biases = array![0.5];

        layer.accumulate(&array![2.0], &array![1.0, -1.0]);
        layer.apply_gradient(-0.1);

        assert_relative_eq!(layer.weights[[0, 0]], 0.8, epsilon = 1e-12);
        assert_relative_eq!(layer.weights[[0, 1]], 1.2, epsilon = 1e-12);
        assert_relative_eq!(layer.biases[0], 0.3, epsilon = 1e-12);
        assert!(layer.gradient().is_none());
    }

    #[test]
    #[should_panic(expected = "no accumulated gradient")]
    fn apply_gradient_without_accumulation_panics() {
        let mut layer = Layer::new(2, 1);
        layer.apply_gradient(-0.1);
    }
}
