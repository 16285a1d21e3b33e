pub mod connections;
pub mod error;
pub mod multimodal;

pub use error::{MediaError, Result};
