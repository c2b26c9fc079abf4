//! MNIST training driver.
//!
//! Expects the four standard IDX files in a data directory (first CLI
//! argument, default `data`):
//!   train-images-idx3-ubyte, train-labels-idx1-ubyte,
//!   t10k-images-idx3-ubyte,  t10k-labels-idx1-ubyte
//!
//! Run with:
//!   cargo run --release -- path/to/data

use std::time::Instant;

use dendrite::data::idx;
use dendrite::{accuracy, train_epoch, DigitSet, Network};

const CLASSES: usize = 10;
const HIDDEN_LAYERS: usize = 1;
const BATCH_SIZE: usize = 10;
const EPOCHS: usize = 5;

const MODEL_PATH: &str = "mnist-model.json";

fn load_or_exit(image_path: &str, label_path: &str) -> DigitSet {
    idx::load_set(image_path, label_path).unwrap_or_else(|e| {
        eprintln!("[Error]: {e}");
        std::process::exit(1);
    })
}

fn main() {
    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());

    println!("Loading MNIST data from '{data_dir}'...");
    let train_set = load_or_exit(
        &format!("{data_dir}/train-images-idx3-ubyte"),
        &format!("{data_dir}/train-labels-idx1-ubyte"),
    );
    let test_set = load_or_exit(
        &format!("{data_dir}/t10k-images-idx3-ubyte"),
        &format!("{data_dir}/t10k-labels-idx1-ubyte"),
    );
    println!("  Training set: {} images", train_set.len());
    println!("  Test set:     {} images", test_set.len());

    if train_set.is_empty() {
        eprintln!("[Error]: training set is empty");
        std::process::exit(1);
    }

    let input_size = train_set.images[0].len();
    let mut network = Network::new(input_size, HIDDEN_LAYERS, CLASSES, BATCH_SIZE);

    println!("\nNetwork:");
    println!("  Input:  {input_size} nodes");
    println!(
        "  Hidden: {HIDDEN_LAYERS} layer(s) of {} sigmoid nodes",
        network.hidden[0].out_dim()
    );
    println!("  Output: {CLASSES} sigmoid nodes");
    println!(
        "  SGD: lr = {}, batch size = {}\n",
        network.learning_rate(),
        network.batch_size()
    );

    for epoch in 1..=EPOCHS {
        let start = Instant::now();
        let loss = train_epoch(&mut network, &train_set.images, &train_set.labels);
        let test_accuracy = accuracy(&mut network, &test_set.images, &test_set.labels);

        println!(
            "Epoch {epoch}/{EPOCHS}  loss: {loss:.6}  test accuracy: {:.2}%  ({} ms)",
            test_accuracy * 100.0,
            start.elapsed().as_millis()
        );
    }

    let mut correct = 0usize;
    for (image, &label) in test_set.images.iter().zip(test_set.labels.iter()) {
        if network.evaluate(image) == label {
            correct += 1;
        }
    }
    println!("\nCorrect: {correct}/{}", test_set.len());

    match network.save_json(MODEL_PATH) {
        Ok(()) => println!("Model saved to {MODEL_PATH}"),
        Err(e) => eprintln!("[Error]: failed to save model: {e}"),
    }
}
