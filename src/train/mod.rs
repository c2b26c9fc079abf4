pub mod loop_fn;

pub use loop_fn::{accuracy, train_epoch};
