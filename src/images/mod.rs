pub mod fetch;
pub mod tools;

use thiserror::Error;

pub use fetch::{HttpFetcher, ImageFetcher};
pub use tools::{ImageCodec, ImageCrateCodec, ImageFormat};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Worker error: {0}")]
    Worker(String),
}
