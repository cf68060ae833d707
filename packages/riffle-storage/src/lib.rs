mod error;
pub mod models;
pub mod qdrant;

pub use error::{Error, Result};
