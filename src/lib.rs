pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod interactive;
pub mod openapi;
pub mod resolve;
pub mod store;

pub use error::{Error, Result};
