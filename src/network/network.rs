use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::activation::sigmoid::sigmoid_prime;
use crate::layers::dense::Layer;

/// Step size applied at every parameter update.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// A feed-forward network: one or more sigmoid hidden layers and a sigmoid
/// output layer, trained by mini-batch gradient descent.
///
/// Every operation mutates the network in place — `feedforward` overwrites
/// activations and the stored input, `backprop` accumulates gradients,
/// `update` steps the parameters and releases the accumulators. Callers are
/// expected to serialize access.
#[derive(Debug, Serialize, Deserialize)]
pub struct Network {
    learning_rate: f64,
    batch_size: usize,
    #[serde(skip)]
    inputs: Array1<f64>,
    #[serde(skip)]
    accumulated: usize,
    pub hidden: Vec<Layer>,
    pub output: Layer,
}

impl Network {
    /// Builds a randomly initialized network.
    ///
    /// All hidden layers share the width `input_size * 2/3 + output_size`
    /// (integer division). The learning rate is [`DEFAULT_LEARNING_RATE`];
    /// `batch_size` is the number of examples a driver should accumulate
    /// between updates.
    ///
    /// Panics if `hidden_layers` is zero.
    pub fn new(
        input_size: usize,
        hidden_layers: usize,
        output_size: usize,
        batch_size: usize,
    ) -> Network {
        assert!(
            hidden_layers > 0,
            "network must have at least one hidden layer"
        );

        let hidden_size = input_size * 2 / 3 + output_size;

        let mut hidden = Vec::with_capacity(hidden_layers);
        hidden.push(Layer::new(input_size, hidden_size));
        for _ in 1..hidden_layers {
            hidden.push(Layer::new(hidden_size, hidden_size));
        }
        let output = Layer::new(hidden_size, output_size);

        Network::from_layers(hidden, output, DEFAULT_LEARNING_RATE, batch_size)
    }

    /// Assembles a network from explicit layers.
    ///
    /// This is the single guarded construction path: every layer's input
    /// dimension must equal the previous layer's output dimension, `hidden`
    /// must be non-empty, and `learning_rate`/`batch_size` must be positive.
    /// Violations panic — a network with a broken shape chain must not exist.
    pub fn from_layers(
        hidden: Vec<Layer>,
        output: Layer,
        learning_rate: f64,
        batch_size: usize,
    ) -> Network {
        assert!(
            !hidden.is_empty(),
            "network must have at least one hidden layer"
        );
        assert!(learning_rate > 0.0, "learning rate must be positive");
        assert!(batch_size > 0, "batch size must be at least 1");

        for pair in hidden.windows(2) {
            assert_eq!(
                pair[1].in_dim(),
                pair[0].out_dim(),
                "hidden layer input dimension does not match the previous layer's output"
            );
        }
        let last_hidden = &hidden[hidden.len() - 1];
        assert_eq!(
            output.in_dim(),
            last_hidden.out_dim(),
            "output layer input dimension does not match the last hidden layer's output"
        );

        let input_size = hidden[0].in_dim();
        Network {
            learning_rate,
            batch_size,
            inputs: Array1::zeros(input_size),
            accumulated: 0,
            hidden,
            output,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Examples a driver should accumulate between `update` calls.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Dimensionality of the vectors this network accepts.
    pub fn input_dim(&self) -> usize {
        self.hidden[0].in_dim()
    }

    /// Propagates `input` through every layer, leaving the result in
    /// `self.output.activations`.
    ///
    /// Keeps an owned copy of the input; `backprop` reads it to compute the
    /// first hidden layer's weight gradient. Gradient accumulators are never
    /// touched here.
    pub fn feedforward(&mut self, input: &Array1<f64>) {
        self.inputs = input.clone();

        self.hidden[0].forward(&self.inputs);
        for i in 1..self.hidden.len() {
            let (fed_by, rest) = self.hidden.split_at_mut(i);
            rest[0].forward(&fed_by[i - 1].activations);
        }
        self.output.forward(&self.hidden[self.hidden.len() - 1].activations);
    }

    /// Computes the error of the last forward pass against the one-hot target
    /// `correct` and accumulates each layer's gradient contribution.
    ///
    /// Must run directly after the `feedforward` call whose input the error
    /// is attributed to — `train` pairs the two.
    pub fn backprop(&mut self, correct: usize) {
        assert!(
            correct < self.output.out_dim(),
            "target class {} is out of range for {} output nodes",
            correct,
            self.output.out_dim()
        );

        // dE/dz at the output: (a - t) · σ'(a), with σ' taken from the
        // activation value.
        let mut current_error: Array1<f64> = self
            .output
            .activations
            .iter()
            .enumerate()
            .map(|(i, &a)| {
                let target = if i == correct { 1.0 } else { 0.0 };
                (a - target) * sigmoid_prime(a)
            })
            .collect();

        // Output layer is fed by the last hidden layer.
        {
            let upstream = &self.hidden[self.hidden.len() - 1].activations;
            self.output.accumulate(&current_error, upstream);

            // dE/dx = Wᵀ · dE/dz, then through the upstream layer's sigmoid.
            let mut prev_error = self.output.weights.t().dot(&current_error);
            prev_error.zip_mut_with(upstream, |e, &a| *e *= sigmoid_prime(a));
            current_error = prev_error;
        }

        // Hidden layers, last to first. The first hidden layer is fed by the
        // stored network input and the walk stops there.
        for i in (0..self.hidden.len()).rev() {
            if i == 0 {
                self.hidden[0].accumulate(&current_error, &self.inputs);
            } else {
                let (fed_by, rest) = self.hidden.split_at_mut(i);
                let upstream = &fed_by[i - 1].activations;
                let layer = &mut rest[0];

                layer.accumulate(&current_error, upstream);

                let mut prev_error = layer.weights.t().dot(&current_error);
                prev_error.zip_mut_with(upstream, |e, &a| *e *= sigmoid_prime(a));
                current_error = prev_error;
            }
        }

        self.accumulated += 1;
    }

    /// Applies the accumulated gradients as one gradient-descent step, scaled
    /// by `-learning_rate / n` where `n` is the number of examples actually
    /// accumulated since the last update, then resets every accumulator.
    ///
    /// Scaling by the accumulated count rather than the configured batch size
    /// keeps a short final batch correctly weighted.
    ///
    /// Panics if nothing has been accumulated since the last update.
    pub fn update(&mut self) {
        assert!(
            self.accumulated > 0,
            "update called with no gradients accumulated since the last update"
        );

        let scale = -self.learning_rate / self.accumulated as f64;
        for layer in self.hidden.iter_mut() {
            layer.apply_gradient(scale);
        }
        self.output.apply_gradient(scale);

        self.accumulated = 0;
    }

    /// Runs a forward pass and returns the predicted class: the index of the
    /// largest output activation. No gradient side effects.
    pub fn evaluate(&mut self, input: &Array1<f64>) -> usize {
        self.feedforward(input);
        argmax(&self.output.activations)
    }

    /// Trains on one labeled example: forward pass, then gradient
    /// accumulation. Update cadence is the caller's responsibility.
    pub fn train(&mut self, input: &Array1<f64>, correct: usize) {
        self.feedforward(input);
        self.backprop(correct);
    }

    /// Serializes the network parameters to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a network from a JSON file previously written by
    /// `save_json`. The loaded network starts at a batch boundary: no
    /// gradients are in progress.
    pub fn load_json(path: &str) -> std::io::Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

/// Index of the largest value; the lowest index wins a tie.
fn argmax(values: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn hidden_width_follows_the_two_thirds_rule() {
        let network = Network::new(784, 1, 10, 10);
        // 784 * 2/3 + 10
        assert_eq!(network.hidden[0].out_dim(), 532);
        assert_eq!(network.hidden[0].in_dim(), 784);
        assert_eq!(network.output.in_dim(), 532);
        assert_eq!(network.output.out_dim(), 10);
    }

    #[test]
    fn layer_dimensions_chain_through_deep_networks() {
        let network = Network::new(30, 4, 5, 8);
        let hidden_size = 30 * 2 / 3 + 5;

        assert_eq!(network.hidden.len(), 4);
        assert_eq!(network.hidden[0].in_dim(), 30);
        for pair in network.hidden.windows(2) {
            assert_eq!(pair[1].in_dim(), pair[0].out_dim());
        }
        for layer in &network.hidden {
            assert_eq!(layer.out_dim(), hidden_size);
        }
        assert_eq!(network.output.in_dim(), hidden_size);
        assert_eq!(network.output.activations.len(), 5);
        assert_eq!(network.batch_size(), 8);
        assert_eq!(network.learning_rate(), DEFAULT_LEARNING_RATE);
    }

    #[test]
    #[should_panic(expected = "at least one hidden layer")]
    fn zero_hidden_layers_is_fatal() {
        Network::new(4, 0, 2, 1);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn mismatched_layer_chain_is_fatal() {
        let hidden = vec![Layer::new(4, 3)];
        let output = Layer::new(5, 2);
        Network::from_layers(hidden, output, 0.1, 1);
    }

    #[test]
    fn argmax_prefers_the_lowest_index_on_ties() {
        assert_eq!(argmax(&array![1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&array![7.0, 7.0]), 0);
        assert_eq!(argmax(&array![-2.0, -1.0, -3.0]), 1);
    }

    #[test]
    fn json_round_trip_preserves_parameters() {
        let network = Network::new(6, 2, 3, 4);
        let path = std::env::temp_dir().join("dendrite-roundtrip.json");
        let path = path.to_str().unwrap();

        network.save_json(path).unwrap();
        let restored = Network::load_json(path).unwrap();

        assert_eq!(restored.hidden.len(), network.hidden.len());
        assert_eq!(restored.batch_size(), network.batch_size());
        assert_eq!(restored.learning_rate(), network.learning_rate());
        assert_eq!(restored.hidden[0].weights, network.hidden[0].weights);
        assert_eq!(restored.output.biases, network.output.biases);
        assert!(restored.output.gradient().is_none());
    }
}
