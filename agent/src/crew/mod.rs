//! Declarative crews: agents described by role, goal and backstory, tasks
//! assigned to them, and the orchestrators that run them.

use crate::llm::LLM;
use crate::tools::Tool;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

mod sequential;
pub use sequential::SequentialOrchestrator;

/// Values substituted for `{name}` placeholders at kickoff.
pub type Inputs = HashMap<String, String>;

/// Replaces every `{name}` placeholder that has an entry in `inputs`.
///
/// Unknown placeholders are kept verbatim and substituted values are never
/// scanned again.
pub fn interpolate(template: &str, inputs: &Inputs) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('}') {
            Some(end) if !after[..end].contains('{') => {
                let key = &after[..end];
                match inputs.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

type SharedTool = Arc<dyn Tool + Send + Sync>;

#[derive(Clone)]
pub struct AgentDescriptor {
    role: String,
    goal: String,
    backstory: String,
    allow_delegation: bool,
    verbose: bool,
    llm: Arc<dyn LLM + Send + Sync>,
    tools: Vec<SharedTool>,
    max_iter: usize,
}

impl AgentDescriptor {
    pub fn builder() -> AgentDescriptorBuilder {
        AgentDescriptorBuilder::default()
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn llm(&self) -> Arc<dyn LLM + Send + Sync> {
        self.llm.clone()
    }

    pub fn tools(&self) -> &[SharedTool] {
        &self.tools
    }

    pub fn tool_names(&self) -> Result<Vec<String>> {
        self.tools
            .iter()
            .map(|tool| Ok(tool.definition()?.name))
            .collect()
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.tools.is_empty() {
            prompt.push_str(
                "\nUse the available tools whenever you need more information. \
                 Once you know the final answer, reply with it directly and do not call any tool.",
            );
        }
        prompt
    }

    fn interpolate(&self, inputs: &Inputs) -> Self {
        Self {
            role: interpolate(&self.role, inputs),
            goal: interpolate(&self.goal, inputs),
            backstory: interpolate(&self.backstory, inputs),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("backstory", &self.backstory)
            .field("allow_delegation", &self.allow_delegation)
            .field("verbose", &self.verbose)
            .field("tools", &self.tools.len())
            .field("max_iter", &self.max_iter)
            .finish_non_exhaustive()
    }
}

pub struct AgentDescriptorBuilder {
    role: Option<String>,
    goal: Option<String>,
    backstory: Option<String>,
    allow_delegation: bool,
    verbose: bool,
    llm: Option<Arc<dyn LLM + Send + Sync>>,
    tools: Vec<SharedTool>,
    max_iter: usize,
}

impl Default for AgentDescriptorBuilder {
    fn default() -> Self {
        Self {
            role: None,
            goal: None,
            backstory: None,
            allow_delegation: false,
            verbose: false,
            llm: None,
            tools: Vec::new(),
            max_iter: 25,
        }
    }
}

impl AgentDescriptorBuilder {
    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn goal(mut self, goal: &str) -> Self {
        self.goal = Some(goal.to_string());
        self
    }

    pub fn backstory(mut self, backstory: &str) -> Self {
        self.backstory = Some(backstory.to_string());
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn build(self) -> Result<Arc<AgentDescriptor>> {
        let missing = |field: &str| Error::MissingArg(format!("{} is required for agent", field));

        Ok(Arc::new(AgentDescriptor {
            role: self.role.ok_or_else(|| missing("role"))?,
            goal: self.goal.ok_or_else(|| missing("goal"))?,
            backstory: self.backstory.ok_or_else(|| missing("backstory"))?,
            allow_delegation: self.allow_delegation,
            verbose: self.verbose,
            llm: self.llm.ok_or_else(|| missing("llm"))?,
            tools: self.tools,
            max_iter: self.max_iter,
        }))
    }
}

#[derive(Clone, Debug)]
pub struct TaskDescriptor {
    description: String,
    expected_output: String,
    agent: Arc<AgentDescriptor>,
}

impl TaskDescriptor {
    pub fn new(description: &str, expected_output: &str, agent: Arc<AgentDescriptor>) -> Self {
        Self {
            description: description.to_string(),
            expected_output: expected_output.to_string(),
            agent,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent(&self) -> &Arc<AgentDescriptor> {
        &self.agent
    }

    /// First ten words of the description.
    pub fn summary(&self) -> String {
        let words = self.description.split_whitespace().collect::<Vec<_>>();
        let mut summary = words.iter().take(10).copied().collect::<Vec<_>>().join(" ");
        if words.len() > 10 {
            summary.push_str("...");
        }
        summary
    }

    fn interpolate(&self, inputs: &Inputs, agent: Arc<AgentDescriptor>) -> Self {
        Self {
            description: interpolate(&self.description, inputs),
            expected_output: interpolate(&self.expected_output, inputs),
            agent,
        }
    }
}

/// Agents plus the tasks they run, in execution order.
#[derive(Clone, Debug)]
pub struct Crew {
    agents: Vec<Arc<AgentDescriptor>>,
    tasks: Vec<TaskDescriptor>,
    // index into `agents` for every task
    assignments: Vec<usize>,
    verbose: bool,
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder::default()
    }

    pub fn agents(&self) -> &[Arc<AgentDescriptor>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns a copy of the crew with `inputs` substituted into every agent
    /// and task, keeping task assignments intact.
    pub fn interpolate(&self, inputs: &Inputs) -> Crew {
        let agents = self
            .agents
            .iter()
            .map(|agent| Arc::new(agent.interpolate(inputs)))
            .collect::<Vec<_>>();

        let tasks = self
            .tasks
            .iter()
            .zip(&self.assignments)
            .map(|(task, &index)| task.interpolate(inputs, agents[index].clone()))
            .collect();

        Crew {
            agents,
            tasks,
            assignments: self.assignments.clone(),
            verbose: self.verbose,
        }
    }
}

#[derive(Default)]
pub struct CrewBuilder {
    agents: Vec<Arc<AgentDescriptor>>,
    tasks: Vec<TaskDescriptor>,
    verbose: bool,
}

impl CrewBuilder {
    pub fn agent(mut self, agent: Arc<AgentDescriptor>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn task(mut self, task: TaskDescriptor) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(Error::InvalidCrew("a crew needs at least one task".to_string()));
        }

        let assignments = self
            .tasks
            .iter()
            .map(|task| {
                self.agents
                    .iter()
                    .position(|agent| Arc::ptr_eq(agent, task.agent()))
                    .ok_or_else(|| {
                        Error::InvalidCrew(format!(
                            "task '{}' is assigned to {}, who is not part of the crew",
                            task.summary(),
                            task.agent().role()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Crew {
            agents: self.agents,
            tasks: self.tasks,
            assignments,
            verbose: self.verbose,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskOutput {
    pub description: String,
    pub summary: String,
    pub raw: String,
    pub agent: String,
}

/// Result of a kickoff. `raw` is the output of the last task.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrewOutput {
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl std::fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Executes a crew's tasks against their agents.
#[async_trait]
pub trait Orchestrator {
    async fn kickoff(&self, crew: Crew, inputs: &Inputs) -> Result<CrewOutput>;
}

#[cfg(test)]
mod tests {
    use super::{AgentDescriptor, Crew, Inputs, TaskDescriptor, interpolate};
    use crate::llm::{CompletionRequest, CompletionResponse, LLM};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SilentLLM;

    #[async_trait]
    impl LLM for SilentLLM {
        async fn completion<'a>(&self, _: CompletionRequest<'a>) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: String::new(),
                tool_calls: vec![],
            })
        }
    }

    fn inputs() -> Inputs {
        Inputs::from([("topic".to_string(), "Rust {lang}".to_string())])
    }

    fn analyst() -> Result<Arc<AgentDescriptor>> {
        AgentDescriptor::builder()
            .role("Analyst")
            .goal("Study '{topic}'")
            .backstory("Curious about {topic} and {unknown}")
            .llm(Arc::new(SilentLLM))
            .build()
    }

    #[test]
    fn test_interpolate() {
        let inputs = inputs();
        assert_eq!(interpolate("about {topic}!", &inputs), "about Rust {lang}!");
        assert_eq!(interpolate("{missing} stays", &inputs), "{missing} stays");
        assert_eq!(interpolate("{ {topic}", &inputs), "{ Rust {lang}");
        assert_eq!(interpolate("open {topic", &inputs), "open {topic");
        assert_eq!(interpolate("", &inputs), "");
    }

    #[test]
    fn test_crew_interpolation_keeps_assignments() -> Result<()> {
        let analyst = analyst()?;
        let crew = Crew::builder()
            .agent(analyst.clone())
            .task(TaskDescriptor::new(
                "Research {topic}",
                "Notes on {topic}",
                analyst,
            ))
            .build()?;

        let crew = crew.interpolate(&inputs());

        let agent = &crew.agents()[0];
        assert_eq!(agent.goal(), "Study 'Rust {lang}'");
        assert_eq!(agent.backstory(), "Curious about Rust {lang} and {unknown}");

        let task = &crew.tasks()[0];
        assert_eq!(task.description(), "Research Rust {lang}");
        assert_eq!(task.expected_output(), "Notes on Rust {lang}");
        assert!(Arc::ptr_eq(task.agent(), agent));

        Ok(())
    }

    #[test]
    fn test_task_agent_must_be_in_crew() -> Result<()> {
        let outsider = analyst()?;
        let err = Crew::builder()
            .agent(analyst()?)
            .task(TaskDescriptor::new("Research", "Notes", outsider))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCrew(_)));

        let err = Crew::builder().agent(analyst()?).build().unwrap_err();
        assert!(matches!(err, Error::InvalidCrew(_)));

        Ok(())
    }

    #[test]
    fn test_agent_requires_role() {
        let err = AgentDescriptor::builder()
            .goal("goal")
            .backstory("backstory")
            .llm(Arc::new(SilentLLM))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingArg(msg) if msg == "role is required for agent"));
    }

    #[test]
    fn test_task_summary() -> Result<()> {
        let task = TaskDescriptor::new(
            "one two three four five six seven eight nine ten eleven",
            "",
            analyst()?,
        );
        assert_eq!(
            task.summary(),
            "one two three four five six seven eight nine ten..."
        );
        Ok(())
    }
}
