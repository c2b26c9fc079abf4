pub mod activation;
pub mod data;
pub mod layers;
pub mod loss;
pub mod network;
pub mod train;

// Convenience re-exports
pub use data::idx::DigitSet;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use train::loop_fn::{accuracy, train_epoch};
