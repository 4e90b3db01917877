pub mod config;
pub mod context;
pub mod error;
pub mod similarity;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
