mod agent;
pub mod callbacks;
pub mod crew;
mod error;
pub mod llm;
pub mod tools;

pub use error::{Error, ErrorKind};
pub type Result<T> = std::result::Result<T, Error>;

pub use agent::{Agent, AgentBuilder, FinalAnswer, StopCondition};
