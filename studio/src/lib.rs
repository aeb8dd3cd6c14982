pub mod config;
pub mod download;
mod error;
pub mod pipeline;
pub mod web;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
