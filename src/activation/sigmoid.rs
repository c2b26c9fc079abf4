/// Logistic sigmoid: σ(x) = 1 / (1 + e^-x). Squashes values into (0, 1).
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid expressed in terms of the *activation value*
/// `a = σ(x)`, i.e. σ'(x) = a·(1 − a).
///
/// Layers only ever keep their post-activation outputs around, so backprop
/// feeds those straight in here instead of recomputing pre-activations.
pub fn sigmoid_prime(a: f64) -> f64 {
    a * (1.0 - a)
}
