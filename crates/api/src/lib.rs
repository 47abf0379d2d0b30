pub mod form;
pub mod routes;

pub use routes::*;
