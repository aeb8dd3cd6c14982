use crate::callbacks::{StepLogger, SummarizeHistory};
use crate::crew::{AgentDescriptor, Crew, CrewOutput, Inputs, Orchestrator, TaskDescriptor, TaskOutput};
use crate::llm::Message;
use crate::{AgentBuilder, Error, Result};
use async_trait::async_trait;
use tracing::{Instrument, info, info_span};

/// Runs tasks one after another, handing every earlier task output to the
/// next task as context.
pub struct SequentialOrchestrator {
    keep_last: usize,
    max_history_tokens: usize,
}

impl Default for SequentialOrchestrator {
    fn default() -> Self {
        Self {
            keep_last: 4,
            max_history_tokens: 6000,
        }
    }
}

impl SequentialOrchestrator {
    pub fn new(keep_last: usize, max_history_tokens: usize) -> Self {
        Self {
            keep_last,
            max_history_tokens,
        }
    }

    fn task_prompt(task: &TaskDescriptor, context: &[TaskOutput]) -> String {
        let mut prompt = format!(
            "{}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            task.description().trim(),
            task.expected_output().trim()
        );

        if !context.is_empty() {
            let context = context
                .iter()
                .map(|output| output.raw.as_str())
                .collect::<Vec<_>>()
                .join("\n\n----------\n\n");
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&context);
        }

        prompt
    }

    async fn execute_task(
        &self,
        task: &TaskDescriptor,
        agent: &AgentDescriptor,
        context: &[TaskOutput],
    ) -> Result<String> {
        let mut builder = AgentBuilder::new()
            .llm(agent.llm())
            .tools(agent.tools().to_vec())
            .max_iterations(agent.max_iter())
            .callback(SummarizeHistory::new(
                agent.llm(),
                self.keep_last,
                self.max_history_tokens,
            ));

        if agent.verbose() {
            builder = builder.callback(StepLogger::new(agent.role()));
        }

        let mut runner = builder.build()?;

        let history = runner
            .run(vec![
                Message::System(agent.system_prompt()),
                Message::User(Self::task_prompt(task, context)),
            ])
            .await?;

        match history.last() {
            Some(Message::Assistant(content, _)) if !content.trim().is_empty() => {
                Ok(content.trim().to_string())
            }
            _ => Err(Error::LLMResponseError(format!(
                "{} returned no final answer",
                agent.role()
            ))),
        }
    }
}

#[async_trait]
impl Orchestrator for SequentialOrchestrator {
    async fn kickoff(&self, crew: Crew, inputs: &Inputs) -> Result<CrewOutput> {
        let crew = crew.interpolate(inputs);

        if let Some(agent) = crew.agents().iter().find(|agent| agent.allow_delegation()) {
            return Err(Error::Unsupported(format!(
                "delegation is not supported by the sequential orchestrator ({})",
                agent.role()
            )));
        }

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks().len());

        for task in crew.tasks() {
            let agent = task.agent();
            let span = info_span!("task", agent = %agent.role(), summary = %task.summary());

            let raw = async {
                info!("task started");
                let raw = self.execute_task(task, agent, &outputs).await?;
                info!(chars = raw.len(), "task finished");
                Ok::<_, Error>(raw)
            }
            .instrument(span)
            .await?;

            outputs.push(TaskOutput {
                description: task.description().to_string(),
                summary: task.summary(),
                raw,
                agent: agent.role().to_string(),
            });
        }

        let raw = outputs
            .last()
            .map(|output| output.raw.clone())
            .ok_or(Error::InvalidCrew("crew has no tasks".to_string()))?;

        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
        })
    }
}
