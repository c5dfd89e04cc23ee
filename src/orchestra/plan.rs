//! Orchestra plan: a YAML list of tasks, each becoming a context with an agent.

use crate::context::validate_name;
use crate::error::{GroveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// One task of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TaskDef {
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            ..Self::default()
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }

    /// Branch to check out; the task name unless set.
    pub fn branch_name(&self) -> &str {
        self.branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn base_branch(&self) -> Option<&str> {
        self.base.as_deref().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
}

impl Plan {
    pub fn new(tasks: Vec<TaskDef>) -> Self {
        Self { tasks }
    }

    /// Read, parse and validate a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GroveError::Plan {
            path: path.to_path_buf(),
            message: format!("cannot read: {}", e),
        })?;
        let plan: Plan = serde_yaml::from_str(&text).map_err(|e| GroveError::Plan {
            path: path.to_path_buf(),
            message: format!("cannot parse: {}", e),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    /// Parse and validate plan YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let plan: Plan = serde_yaml::from_str(text)
            .map_err(|e| GroveError::validation(format!("cannot parse plan: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Structural checks: non-empty, required fields, unique names, known and acyclic
    /// dependencies.
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(GroveError::validation("plan contains no tasks"));
        }

        let mut names = HashSet::with_capacity(self.tasks.len());
        for (i, task) in self.tasks.iter().enumerate() {
            if task.name.trim().is_empty() {
                return Err(GroveError::validation(format!("task {}: name is required", i)));
            }
            validate_name(&task.name)?;
            if task.agent.trim().is_empty() {
                return Err(GroveError::validation(format!(
                    "task {} ({}): agent is required",
                    i, task.name
                )));
            }
            if !names.insert(task.name.as_str()) {
                return Err(GroveError::validation(format!(
                    "task name {:?} is used more than once",
                    task.name
                )));
            }
        }

        for task in &self.tasks {
            for dep in &task.depends_on {
                if dep == &task.name {
                    return Err(GroveError::validation(format!(
                        "task {:?} depends on itself",
                        task.name
                    )));
                }
                if !names.contains(dep.as_str()) {
                    return Err(GroveError::validation(format!(
                        "task {:?} depends on unknown task {:?}",
                        task.name, dep
                    )));
                }
            }
        }

        let cyclic = self.cyclic_tasks();
        if !cyclic.is_empty() {
            return Err(GroveError::validation(format!(
                "dependency cycle among tasks: {}",
                cyclic.join(", ")
            )));
        }
        Ok(())
    }

    /// Tasks left over after Kahn's algorithm (on or behind a cycle), in plan order.
    fn cyclic_tasks(&self) -> Vec<String> {
        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut indegree = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in &task.depends_on {
                if let Some(&d) = index.get(dep.as_str()) {
                    indegree[i] += 1;
                    dependents[d].push(i);
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..self.tasks.len()).filter(|&i| indegree[i] == 0).collect();
        while let Some(i) = ready.pop_front() {
            for &next in &dependents[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        self.tasks
            .iter()
            .zip(indegree)
            .filter(|(_, remaining)| *remaining > 0)
            .map(|(t, _)| t.name.clone())
            .collect()
    }
}
