pub mod artifacts;
pub mod evaluation;
pub mod features;
pub mod models;
pub mod preprocess;
pub mod training;

pub use artifacts::*;
pub use features::*;
pub use models::*;
pub use preprocess::*;
pub use training::*;
