pub mod idx;

pub use idx::{load_set, DigitSet};
