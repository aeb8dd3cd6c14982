use crate::Result;
use crate::callbacks::Callback;
use crate::llm::{CompletionRequest, LLM, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Compresses the middle of a conversation into a single summary once the
/// history grows past a token budget.
pub struct SummarizeHistory {
    llm: Arc<dyn LLM + Send + Sync>,
    keep_last: usize,
    max_tokens: usize,
}

impl SummarizeHistory {
    pub fn new(llm: Arc<dyn LLM + Send + Sync>, keep_last: usize, max_tokens: usize) -> Box<Self> {
        Box::new(Self {
            llm,
            keep_last,
            max_tokens,
        })
    }

    pub async fn summarize_history(&self, mut messages: Vec<Message>) -> Result<Vec<Message>> {
        // the first two messages are the system prompt and the task prompt
        if messages.len() < 2 + self.keep_last {
            return Ok(messages);
        }

        // tool results must stay behind the assistant message that requested them
        let mut split = messages.len() - self.keep_last;
        while split > 2 && matches!(messages.get(split), Some(Message::Tool { .. })) {
            split -= 1;
        }
        if split <= 2 {
            return Ok(messages);
        }

        let last_messages = messages.split_off(split);

        messages.push(Message::User(PROMPT.to_string()));

        let result = self
            .llm
            .completion(CompletionRequest {
                messages: &messages,
                tools: &[],
            })
            .await?;

        messages.truncate(2);
        messages.push(Message::Assistant(result.content, vec![]));
        messages.extend(last_messages);

        debug!(messages = messages.len(), "history summarized");

        Ok(messages)
    }
}

const PROMPT: &str = "To keep the conversation from becoming too long, write a summary of the conversation so far.
Instructions:
- Compress the information as much as possible. The summary must not be longer than 1000 words.
- Preserve every key finding, statistic and quote you will need to complete the task.
- Keep the URL of every source next to the information it supports, citations will be needed later.";

#[async_trait]
impl Callback for SummarizeHistory {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        if messages.iter().map(Message::ntokens).sum::<usize>() > self.max_tokens {
            return self.summarize_history(messages).await;
        }
        Ok(messages)
    }

    // a finished answer needs no shorter history
    fn after_final_answer(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::SummarizeHistory;
    use crate::Result;
    use crate::callbacks::Callback;
    use crate::llm::{CompletionRequest, CompletionResponse, LLM, Message};
    use crate::tools::ToolCall;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SummaryLLM;

    #[async_trait]
    impl LLM for SummaryLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            assert!(request.tools.is_empty());
            Ok(CompletionResponse {
                content: format!("summary of {} messages", request.messages.len()),
                tool_calls: vec![],
            })
        }
    }

    fn search_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "search_the_internet".to_string(),
            args: "{\"search_query\":\"q\"}".to_string(),
        }
    }

    fn history() -> Vec<Message> {
        vec![
            Message::System("system".to_string()),
            Message::User("task".to_string()),
            Message::Assistant("searching".to_string(), vec![search_call("a")]),
            Message::Tool {
                id: "a".to_string(),
                name: "search_the_internet".to_string(),
                result: "x".repeat(400),
            },
            Message::Assistant("searching again".to_string(), vec![search_call("b")]),
            Message::Tool {
                id: "b".to_string(),
                name: "search_the_internet".to_string(),
                result: "y".repeat(400),
            },
        ]
    }

    #[tokio::test]
    async fn test_summarize_keeps_tool_results_with_their_call() -> Result<()> {
        let mut summarizer = SummarizeHistory::new(Arc::new(SummaryLLM), 1, 100);

        let messages = summarizer.call(history()).await?;

        // the kept tail is widened to include the assistant message of the last tool result
        assert_eq!(messages.len(), 5);
        assert!(matches!(&messages[0], Message::System(content) if content == "system"));
        assert!(matches!(&messages[1], Message::User(content) if content == "task"));
        assert!(
            matches!(&messages[2], Message::Assistant(content, calls) if content == "summary of 5 messages" && calls.is_empty())
        );
        assert!(matches!(&messages[3], Message::Assistant(content, _) if content == "searching again"));
        assert!(matches!(&messages[4], Message::Tool { id, .. } if id == "b"));

        Ok(())
    }

    #[tokio::test]
    async fn test_short_history_is_untouched() -> Result<()> {
        let mut summarizer = SummarizeHistory::new(Arc::new(SummaryLLM), 1, 10_000);

        let messages = summarizer.call(history()).await?;
        assert_eq!(messages, history());

        Ok(())
    }

    #[tokio::test]
    async fn test_keep_nothing_summarizes_whole_tail() -> Result<()> {
        let mut summarizer = SummarizeHistory::new(Arc::new(SummaryLLM), 0, 1);

        let messages = summarizer
            .call(vec![
                Message::System("system".to_string()),
                Message::User("task".to_string()),
                Message::Assistant("x".repeat(100), vec![]),
            ])
            .await?;

        assert_eq!(messages.len(), 3);
        assert!(
            matches!(&messages[2], Message::Assistant(content, _) if content == "summary of 4 messages")
        );
        assert!(!summarizer.after_final_answer());

        Ok(())
    }
}
