//! Crews: task graphs executed in dependency order.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, instrument};

use scriptcrew_shared::{CrewResult, Result, ScriptCrewError, TaskOutput};

use crate::executor::AgentExecutor;
use crate::tasks::{ExecutableTask, Inputs};

/// A validated group of tasks, stored in execution order.
#[derive(Debug, Clone)]
pub struct Crew {
    name: String,
    tasks: Vec<ExecutableTask>,
}

impl Crew {
    /// Build the dependency graph and order it topologically.
    ///
    /// Ties are broken by declaration order, so a chain declared in
    /// dependency order runs exactly as declared. Duplicate ids, context
    /// entries pointing outside the crew, and cycles are rejected.
    pub fn new(name: impl Into<String>, tasks: Vec<ExecutableTask>) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            return Err(ScriptCrewError::crew(format!("crew '{name}' has no tasks")));
        }

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.as_str(), i).is_some() {
                return Err(ScriptCrewError::crew(format!(
                    "crew '{name}' declares task '{}' twice",
                    task.id
                )));
            }
        }

        let mut indegree = vec![0usize; tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for upstream in &task.context {
                let Some(&j) = index.get(upstream.as_str()) else {
                    return Err(ScriptCrewError::crew(format!(
                        "task '{}' in crew '{name}' depends on '{upstream}', which is not part of the crew",
                        task.id
                    )));
                };
                indegree[i] += 1;
                dependents[j].push(i);
            }
        }

        // Kahn's algorithm; the ready queue is kept sorted by declaration index.
        let mut ready: VecDeque<usize> = (0..tasks.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(tasks.len());

        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    let pos = ready.partition_point(|&r| r < d);
                    ready.insert(pos, d);
                }
            }
        }

        if order.len() != tasks.len() {
            let stuck: Vec<&str> = (0..tasks.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| tasks[i].id.as_str())
                .collect();
            return Err(ScriptCrewError::crew(format!(
                "crew '{name}' has a dependency cycle among: {}",
                stuck.join(", ")
            )));
        }

        let mut slots: Vec<Option<ExecutableTask>> = tasks.into_iter().map(Some).collect();
        let tasks = order.into_iter().filter_map(|i| slots[i].take()).collect();

        Ok(Self { name, tasks })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[ExecutableTask] {
        &self.tasks
    }
}

/// Runs a crew to completion.
#[async_trait]
pub trait CrewRunner: Send + Sync {
    async fn kickoff(&self, crew: &Crew, inputs: &Inputs) -> Result<CrewResult>;
}

/// Executes tasks one after another, feeding each the outputs of its
/// context tasks.
pub struct SequentialCrewRunner {
    executor: AgentExecutor,
}

impl SequentialCrewRunner {
    pub fn new(executor: AgentExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CrewRunner for SequentialCrewRunner {
    #[instrument(skip_all, fields(crew = %crew.name(), tasks = crew.tasks().len()))]
    async fn kickoff(&self, crew: &Crew, inputs: &Inputs) -> Result<CrewResult> {
        let start = Instant::now();
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks().len());

        for task in crew.tasks() {
            let context = task
                .context
                .iter()
                .filter_map(|id| outputs.iter().find(|o| &o.task == id))
                .map(|o| o.raw.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            let raw = self.executor.execute(task, &context, inputs).await?;
            outputs.push(TaskOutput {
                task: task.id.clone(),
                agent: task.agent.id.clone(),
                raw,
            });
        }

        info!(
            crew = %crew.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "crew finished"
        );

        Ok(CrewResult::from_outputs(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{ScriptedModel, agent};

    fn task(id: &str, context: &[&str]) -> ExecutableTask {
        let mut t = ExecutableTask::inline(id, agent("writer"), format!("do {id}"), "text");
        t.context = context.iter().map(|c| c.to_string()).collect();
        t
    }

    fn ids(crew: &Crew) -> Vec<&str> {
        crew.tasks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn chain_keeps_declaration_order() {
        let crew = Crew::new(
            "chain",
            vec![task("a", &[]), task("b", &["a"]), task("c", &["a", "b"])],
        )
        .unwrap();
        assert_eq!(ids(&crew), vec!["a", "b", "c"]);
    }

    #[test]
    fn dependencies_run_first() {
        let crew = Crew::new(
            "reordered",
            vec![task("review", &["draft"]), task("draft", &[]), task("note", &[])],
        )
        .unwrap();
        assert_eq!(ids(&crew), vec!["draft", "review", "note"]);
    }

    #[test]
    fn rejects_cycles() {
        let err = Crew::new("loop", vec![task("a", &["b"]), task("b", &["a"])]).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn rejects_foreign_context() {
        let err = Crew::new("partial", vec![task("b", &["a"])]).unwrap_err();
        assert!(err.to_string().contains("not part of the crew"));
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert!(Crew::new("dup", vec![task("a", &[]), task("a", &[])]).is_err());
        assert!(Crew::new("empty", Vec::new()).is_err());
    }

    #[tokio::test]
    async fn sequential_runner_feeds_context_and_returns_last_output() {
        let model = Arc::new(ScriptedModel::new(["first answer", "second answer"]));
        let writer = crate::testing::agent_with_model("writer", model.clone());

        let draft = ExecutableTask::inline("draft", writer.clone(), "Write about {category}", "text");
        let review = ExecutableTask::inline("review", writer, "Review it", "clean text")
            .with_context("draft");
        let crew = Crew::new("pair", vec![draft, review]).unwrap();

        let inputs = Inputs::from([("category".to_string(), "Privacidade".to_string())]);
        let runner = SequentialCrewRunner::new(AgentExecutor::new(3));
        let result = runner.kickoff(&crew, &inputs).await.unwrap();

        assert_eq!(result.raw, "second answer");
        assert_eq!(result.tasks_output.len(), 2);
        assert_eq!(result.output_of("draft").unwrap().raw, "first answer");

        let requests = model.requests();
        let first_user = requests[0].messages[1].content.clone().unwrap();
        assert!(first_user.contains("Write about Privacidade"));
        let second_user = requests[1].messages[1].content.clone().unwrap();
        assert!(second_user.contains("first answer"));
    }
}
