pub mod mse;

pub use mse::squared_error;
