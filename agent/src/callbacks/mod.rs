use crate::Result;
use crate::llm::Message;
use async_trait::async_trait;

mod logger;
pub use logger::StepLogger;

mod summarize_history;
pub use summarize_history::SummarizeHistory;

/// Runs after every agent step and may rewrite the history.
#[async_trait]
pub trait Callback {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>>;

    /// Whether the callback still runs on the step that produced the final answer.
    fn after_final_answer(&self) -> bool {
        true
    }
}
