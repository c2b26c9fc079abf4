use ndarray::Array1;
use rand::seq::SliceRandom;

use crate::loss::mse::squared_error;
use crate::network::network::Network;

/// Runs one full pass of mini-batch SGD over the training data and returns
/// the mean squared-error loss over all samples.
///
/// Sample order is shuffled each call. The network is updated every
/// `network.batch_size()` examples, plus once more at the end of the epoch if
/// a partial batch is pending, so no accumulated gradient survives past the
/// epoch boundary.
///
/// # Panics
/// Panics if `images` is empty or the image and label counts differ.
pub fn train_epoch(network: &mut Network, images: &[Array1<f64>], labels: &[usize]) -> f64 {
    assert!(!images.is_empty(), "training set must not be empty");
    assert_eq!(
        images.len(),
        labels.len(),
        "images and labels must have equal length"
    );

    let mut indices: Vec<usize> = (0..images.len()).collect();
    indices.shuffle(&mut rand::thread_rng());

    let mut total_loss = 0.0;
    let mut pending = 0usize;

    for &idx in &indices {
        network.train(&images[idx], labels[idx]);
        total_loss += squared_error(&network.output.activations, labels[idx]);

        pending += 1;
        if pending == network.batch_size() {
            network.update();
            pending = 0;
        }
    }

    if pending > 0 {
        network.update();
    }

    total_loss / images.len() as f64
}

/// Fraction of samples classified correctly (argmax match). Runs inference
/// only; no gradients are accumulated.
pub fn accuracy(network: &mut Network, images: &[Array1<f64>], labels: &[usize]) -> f64 {
    if images.is_empty() {
        return 0.0;
    }
    let correct = images
        .iter()
        .zip(labels.iter())
        .filter(|(image, label)| network.evaluate(image) == **label)
        .count();
    correct as f64 / images.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_set() -> (Vec<Array1<f64>>, Vec<usize>) {
        // Two linearly separable clusters.
        let images = vec![
            array![0.9, 0.1],
            array![0.8, 0.2],
            array![0.1, 0.9],
            array![0.2, 0.8],
        ];
        let labels = vec![0, 0, 1, 1];
        (images, labels)
    }

    #[test]
    fn epochs_drive_the_loss_down_on_a_separable_set() {
        let (images, labels) = toy_set();
        let mut network = Network::new(2, 1, 2, 2);

        let first = train_epoch(&mut network, &images, &labels);
        let mut last = first;
        for _ in 0..300 {
            last = train_epoch(&mut network, &images, &labels);
        }

        assert!(
            last < first,
            "mean loss should fall over training: first {first}, last {last}"
        );
    }

    #[test]
    fn a_partial_final_batch_is_flushed() {
        let (images, labels) = toy_set();
        // 4 samples with batch size 3 leaves one straggler.
        let mut network = Network::new(2, 1, 2, 3);

        train_epoch(&mut network, &images, &labels);

        for layer in &network.hidden {
            assert!(layer.gradient().is_none());
        }
        assert!(network.output.gradient().is_none());
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn an_empty_training_set_is_fatal() {
        let mut network = Network::new(2, 1, 2, 1);
        train_epoch(&mut network, &[], &[]);
    }

    #[test]
    fn accuracy_counts_argmax_matches() {
        let (images, labels) = toy_set();
        let mut network = Network::new(2, 1, 2, 2);
        let fraction = accuracy(&mut network, &images, &labels);
        assert!((0.0..=1.0).contains(&fraction));
    }
}
