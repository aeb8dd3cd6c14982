use crate::callbacks;
use crate::llm;
use crate::tools;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub trait StopCondition {
    fn done(&self, history: &[llm::Message]) -> bool;
}

impl<F> StopCondition for F
where
    F: Fn(&[llm::Message]) -> bool,
{
    fn done(&self, history: &[llm::Message]) -> bool {
        self(history)
    }
}

/// Stops once the model answers without requesting any tool call.
pub struct FinalAnswer;

impl StopCondition for FinalAnswer {
    fn done(&self, history: &[llm::Message]) -> bool {
        matches!(history.last(), Some(llm::Message::Assistant(_, tool_calls)) if tool_calls.is_empty())
    }
}

type Tool = Arc<dyn tools::Tool + Send + Sync>;
type Callback = Box<dyn callbacks::Callback + Send>;

const DEFAULT_MAX_ITERATIONS: usize = 25;

pub struct Agent {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    tools: HashMap<String, Tool>,
    callbacks: Vec<Callback>,
    tool_defs: Vec<tools::ToolDefinition>,
    stop_condition: Box<dyn StopCondition + Send>,
    max_iterations: usize,
}

impl Agent {
    async fn execute_tool_call(
        &mut self,
        tool_call: &tools::ToolCall,
        mut messages: Vec<llm::Message>,
    ) -> Result<Vec<llm::Message>> {
        let tool = self
            .tools
            .get(&tool_call.name)
            .ok_or(Error::ToolDoesNotExist(tool_call.name.clone()))?;

        debug!(tool = %tool_call.name, args = %tool_call.args, "invoking tool");

        match tool.invoke(tool_call, messages.clone()).await {
            Ok(messages) => Ok(messages),
            // malformed arguments are the model's mistake, let it retry
            Err(Error::JsonError(err)) => {
                warn!(tool = %tool_call.name, error = %err, "invalid tool arguments");
                messages.push(llm::Message::Tool {
                    id: tool_call.id.clone(),
                    name: tool_call.name.clone(),
                    result: format!("Invalid arguments for tool {}: {}", tool_call.name, err),
                });
                Ok(messages)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn run(&mut self, mut messages: Vec<llm::Message>) -> Result<Vec<llm::Message>> {
        let mut iterations = 0;

        while !self.stop_condition.done(&messages) {
            if iterations == self.max_iterations {
                return Err(Error::MaxIterations(self.max_iterations));
            }
            iterations += 1;

            let next = self
                .llm
                .completion(llm::CompletionRequest {
                    messages: &messages,
                    tools: &self.tool_defs,
                })
                .await?;

            messages.push(llm::Message::Assistant(
                next.content,
                next.tool_calls.clone(),
            ));

            for tool_call in &next.tool_calls {
                messages = self.execute_tool_call(tool_call, messages).await?;
            }

            let done = self.stop_condition.done(&messages);
            for callback in &mut self.callbacks {
                if done && !callback.after_final_answer() {
                    continue;
                }
                messages = callback.call(messages).await?;
            }
        }

        Ok(messages)
    }
}

pub struct AgentBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    tools: Vec<Tool>,
    callbacks: Vec<Callback>,
    stop_condition: Option<Box<dyn StopCondition + Send>>,
    max_iterations: usize,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            tools: Vec::new(),
            callbacks: Vec::new(),
            stop_condition: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Defaults to [`FinalAnswer`].
    pub fn stop_condition(mut self, cond: Box<dyn StopCondition + Send>) -> Self {
        self.stop_condition = Some(cond);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let mut tool_defs = Vec::new();
        let mut tools = HashMap::new();

        for tool in self.tools {
            let def = tool.definition()?;
            tools.insert(def.name.clone(), tool);
            tool_defs.push(def);
        }

        Ok(Agent {
            llm: self
                .llm
                .ok_or(Error::MissingArg("llm is required for agent".to_string()))?,
            tools,
            tool_defs,
            callbacks: self.callbacks,
            stop_condition: self
                .stop_condition
                .unwrap_or_else(|| Box::new(FinalAnswer)),
            max_iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use core::panic;

    use crate::callbacks::Callback;
    use crate::llm::{CompletionRequest, CompletionResponse, LLM, Message};
    use crate::tools::{FunctionalTool, ToolCall, ToolDefinition};
    use crate::{AgentBuilder, Error, Result, StopCondition};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockLLM;

    #[async_trait]
    impl LLM for MockLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            match request.messages.last() {
                Some(Message::User(_)) => Ok(CompletionResponse {
                    content: "tool call".to_string(),
                    tool_calls: vec![ToolCall {
                        id: "call1".to_string(),
                        name: "double".to_string(),
                        args: "{\"arg\":123}".to_string(),
                    }],
                }),
                Some(Message::Tool { .. }) => Ok(CompletionResponse {
                    content: "tool call recieved".to_string(),
                    tool_calls: vec![],
                }),
                Some(Message::Assistant(_, _)) => Ok(CompletionResponse {
                    content: "completed".to_string(),
                    tool_calls: vec![],
                }),
                _ => panic!("unexpected message sequence"),
            }
        }
    }

    struct DoubleTool;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    struct DoubleArgs {
        arg: i32,
    }

    #[async_trait]
    impl FunctionalTool for DoubleTool {
        fn definition(&self) -> Result<ToolDefinition> {
            ToolDefinition::new::<DoubleArgs>("double", "double")
        }

        async fn invoke_fn(&self, tool_call: &ToolCall) -> Result<Message> {
            let args: DoubleArgs = tool_call.args()?;
            Ok(Message::Tool {
                id: tool_call.id.clone(),
                name: "double".to_string(),
                result: format!("2 * {} = {}", args.arg, 2 * args.arg),
            })
        }
    }

    struct SimpleStop;

    impl StopCondition for SimpleStop {
        fn done(&self, history: &[Message]) -> bool {
            if let Some(Message::Assistant(content, _)) = history.last() {
                content == "completed"
            } else {
                false
            }
        }
    }

    #[tokio::test]
    async fn test_agent() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        let history = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await?;

        assert_eq!(history.len(), 5);

        assert!(matches!(&history[0], Message::User (content) if content == "do stuff"));
        assert!(matches!(&history[1], Message::Assistant (_, tool_calls) if tool_calls.len() == 1));
        assert!(matches!(&history[2], Message::Tool {  result,.. } if result == "2 * 123 = 246"));
        assert!(
            matches!(&history[3], Message::Assistant (content, _) if content== "tool call recieved")
        );
        assert!(matches!(&history[4], Message::Assistant (content, _) if content== "completed"));

        Ok(())
    }

    #[tokio::test]
    async fn test_agent_stops_at_final_answer() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .tool(Arc::new(DoubleTool))
            .build()?;

        let history = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await?;

        assert_eq!(history.len(), 4);
        assert!(
            matches!(&history[3], Message::Assistant (content, calls) if content == "tool call recieved" && calls.is_empty())
        );

        Ok(())
    }

    struct CountingCallback {
        calls: Arc<AtomicUsize>,
        after_final_answer: bool,
    }

    #[async_trait]
    impl Callback for CountingCallback {
        async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(messages)
        }

        fn after_final_answer(&self) -> bool {
            self.after_final_answer
        }
    }

    #[tokio::test]
    async fn test_callbacks_can_skip_the_final_step() -> Result<()> {
        let every_step = Arc::new(AtomicUsize::new(0));
        let working_steps = Arc::new(AtomicUsize::new(0));

        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .tool(Arc::new(DoubleTool))
            .callback(Box::new(CountingCallback {
                calls: every_step.clone(),
                after_final_answer: true,
            }))
            .callback(Box::new(CountingCallback {
                calls: working_steps.clone(),
                after_final_answer: false,
            }))
            .build()?;

        agent
            .run(vec![Message::User("do stuff".to_string())])
            .await?;

        // one tool-calling step, then the final answer
        assert_eq!(every_step.load(Ordering::SeqCst), 2);
        assert_eq!(working_steps.load(Ordering::SeqCst), 1);

        Ok(())
    }

    struct LoopingLLM;

    #[async_trait]
    impl LLM for LoopingLLM {
        async fn completion<'a>(&self, _: CompletionRequest<'a>) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: "loop".to_string(),
                    name: "double".to_string(),
                    args: "not json".to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_agent_max_iterations() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(LoopingLLM))
            .tool(Arc::new(DoubleTool))
            .max_iterations(3)
            .build()?;

        let err = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MaxIterations(3)));

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_tool_arguments_are_reported_to_the_model() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(LoopingLLM))
            .tool(Arc::new(DoubleTool))
            .stop_condition(Box::new(|history: &[Message]| history.len() >= 3))
            .build()?;

        let history = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await?;

        assert!(
            matches!(&history[2], Message::Tool { id, result, .. } if id == "loop" && result.starts_with("Invalid arguments for tool double"))
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .build()
            .unwrap();

        let err = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolDoesNotExist(name) if name == "double"));
    }

    #[test]
    fn test_llm_is_required() {
        assert!(matches!(AgentBuilder::new().build(), Err(Error::MissingArg(_))));
    }
}
