pub mod fetcher;
pub mod predictor;
pub mod stats_api;

pub use fetcher::*;
pub use predictor::*;
pub use stats_api::*;
