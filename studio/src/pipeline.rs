//! The content pipeline: a senior research analyst researches the topic on
//! the web, then a content writer turns the research into a blog post.

use crate::config::Config;
use agent::crew::{
    AgentDescriptor, Crew, CrewOutput, Inputs, Orchestrator, SequentialOrchestrator,
    TaskDescriptor,
};
use agent::llm::{LLM, OpenAI, OpenAIConfig};
use agent::tools::{SerperSearch, Tool};
use std::sync::Arc;
use tracing::{info, instrument};

pub const RESEARCH_ANALYST_ROLE: &str = "Senior Research Analyst";
const RESEARCH_ANALYST_GOAL: &str =
    "Research and analyze detailed information on '{topic}' using web sources.";
const RESEARCH_ANALYST_BACKSTORY: &str = "You're a skilled research analyst who finds, verifies, and summarizes information from the internet for blogs and content teams.";

pub const CONTENT_WRITER_ROLE: &str = "Content Writer";
const CONTENT_WRITER_GOAL: &str =
    "Transform research into a well-written, engaging, and factual blog post.";
const CONTENT_WRITER_BACKSTORY: &str = "You're a professional writer who excels at turning dense research into engaging, well-structured, and easy-to-read blog posts.";

const RESEARCH_TASK: &str = "1. Research '{topic}' thoroughly using current web sources.
2. Identify key insights, trends, and expert views.
3. Verify all facts, stats, and cite original sources.";

const RESEARCH_OUTPUT: &str = "A research summary with:
- Executive Summary
- Key Findings
- Relevant Stats and Trends
- All citations and links to sources";

const WRITING_TASK: &str = "Based on the research about '{topic}', create a detailed blog post with:
1. Hooking intro
2. Structured body with H3s
3. Strong conclusion
4. Markdown formatting
5. Inline [Source: URL] citations";

const WRITING_OUTPUT: &str = "A complete blog post in Markdown format with structure, citations, and readable flow for an online audience.";

/// Hands out an LLM binding for a sampling temperature.
pub trait ModelProvider {
    fn model(&self, temperature: f32) -> Arc<dyn LLM + Send + Sync>;
}

/// OpenAI-compatible chat completions served by OpenRouter.
pub struct OpenRouter {
    model: String,
    config: OpenAIConfig,
}

impl OpenRouter {
    pub fn new(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            config: OpenAIConfig::new()
                .with_api_base(&config.api_base)
                .with_api_key(&config.openrouter_api_key),
        }
    }
}

impl ModelProvider for OpenRouter {
    fn model(&self, temperature: f32) -> Arc<dyn LLM + Send + Sync> {
        Arc::new(OpenAI::new(self.model.clone(), self.config.clone()).with_temperature(temperature))
    }
}

/// Builds the research/writing crew for every request and hands it to the
/// orchestrator. Errors from the orchestrator are returned untouched.
pub struct ContentPipeline {
    models: Arc<dyn ModelProvider + Send + Sync>,
    search: Arc<dyn Tool + Send + Sync>,
    orchestrator: Arc<dyn Orchestrator + Send + Sync>,
}

impl ContentPipeline {
    pub fn new(
        models: Arc<dyn ModelProvider + Send + Sync>,
        search: Arc<dyn Tool + Send + Sync>,
        orchestrator: Arc<dyn Orchestrator + Send + Sync>,
    ) -> Self {
        Self {
            models,
            search,
            orchestrator,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(OpenRouter::new(config)),
            Arc::new(SerperSearch::new(
                config.serper_api_key.clone(),
                config.search_results,
            )),
            Arc::new(SequentialOrchestrator::default()),
        )
    }

    /// The two-stage crew, with `{topic}` placeholders still in place.
    pub fn build_crew(&self, temperature: f32) -> agent::Result<Crew> {
        let llm = self.models.model(temperature);

        let research_analyst = AgentDescriptor::builder()
            .role(RESEARCH_ANALYST_ROLE)
            .goal(RESEARCH_ANALYST_GOAL)
            .backstory(RESEARCH_ANALYST_BACKSTORY)
            .allow_delegation(false)
            .verbose(true)
            .llm(llm.clone())
            .tool(self.search.clone())
            .build()?;

        let content_writer = AgentDescriptor::builder()
            .role(CONTENT_WRITER_ROLE)
            .goal(CONTENT_WRITER_GOAL)
            .backstory(CONTENT_WRITER_BACKSTORY)
            .allow_delegation(false)
            .verbose(true)
            .llm(llm)
            .build()?;

        Crew::builder()
            .agent(research_analyst.clone())
            .agent(content_writer.clone())
            .task(TaskDescriptor::new(
                RESEARCH_TASK,
                RESEARCH_OUTPUT,
                research_analyst,
            ))
            .task(TaskDescriptor::new(
                WRITING_TASK,
                WRITING_OUTPUT,
                content_writer,
            ))
            .verbose(true)
            .build()
    }

    /// Runs the whole pipeline for `topic`. The caller checks that the topic
    /// is not empty.
    #[instrument(skip(self))]
    pub async fn generate(&self, topic: &str, temperature: f32) -> agent::Result<CrewOutput> {
        let crew = self.build_crew(temperature)?;
        let inputs = Inputs::from([("topic".to_string(), topic.to_string())]);

        info!("kicking off content crew");
        let output = self.orchestrator.kickoff(crew, &inputs).await?;
        info!(chars = output.raw.len(), "content crew finished");

        Ok(output)
    }
}
