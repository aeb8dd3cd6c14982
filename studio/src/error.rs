use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {0} is not set")]
    MissingKey(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
