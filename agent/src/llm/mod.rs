use crate::Result;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::hash::{DefaultHasher, Hash, Hasher};

mod openai;
pub use async_openai::config::OpenAIConfig;
pub use openai::OpenAI;

#[derive(Clone, Debug, PartialEq, Hash)]
pub enum Message {
    User(String),
    Assistant(String, Vec<ToolCall>),
    System(String),
    Tool {
        id: String,
        name: String,
        result: String,
    },
}

impl Message {
    pub fn get_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Rough token estimate, about four characters per token.
    pub fn ntokens(&self) -> usize {
        let chars = match self {
            Message::User(content) | Message::System(content) => content.len(),
            Message::Assistant(content, tool_calls) => {
                content.len()
                    + tool_calls
                        .iter()
                        .map(|call| call.name.len() + call.args.len())
                        .sum::<usize>()
            }
            Message::Tool { result, .. } => result.len(),
        };
        chars.div_ceil(4)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::System(content) => write!(f, "**system**: {}\n", content),
            Message::User(content) => write!(f, "**user**: {}\n", content),
            Message::Assistant(content, tool_calls) => {
                write!(f, "**assistant**: {}\n", content)?;
                tool_calls.iter().try_for_each(|call| write!(f, "{}", call))
            }
            Message::Tool { name, result, .. } => write!(f, "**tool** `{}`: {}\n", name, result),
        }
    }
}

pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

#[derive(Debug)]
pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;
}
