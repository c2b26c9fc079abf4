use ndarray::Array1;

/// Mean squared error of an output vector against a one-hot target class:
/// `mean((a_i - t_i)²)` with `t_i = 1.0` iff `i == correct`.
///
/// Used for progress reporting during training; the backward pass derives its
/// error signal directly from the activations and never calls this.
pub fn squared_error(predicted: &Array1<f64>, correct: usize) -> f64 {
    let total: f64 = predicted
        .iter()
        .enumerate()
        .map(|(i, &a)| {
            let target = if i == correct { 1.0 } else { 0.0 };
            (a - target) * (a - target)
        })
        .sum();
    total / predicted.len() as f64
}
