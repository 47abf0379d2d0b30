pub mod error;
pub mod games;
pub mod predictions;
pub mod table;
pub mod teams;

pub use error::*;
pub use games::*;
pub use predictions::*;
pub use teams::*;
