//! Pipeline domain types
//!
//! A pipeline is an ordered set of stage invocations submitted to the
//! platform as a single run. Each step runs one `gauntlet` subcommand on the
//! pipeline's compute target and may declare named outputs, which the
//! platform materialises as directories and substitutes into the step's
//! arguments.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{PlatformError, PlatformResult};

/// Pipeline definition submitted for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub experiment: String,
    pub compute_target: String,
    pub steps: Vec<PipelineStep>,
}

/// A single step of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    /// Stage subcommand to execute (e.g. "train")
    pub command: String,
    pub arguments: Vec<StepArg>,
    /// Names of the outputs this step produces
    pub outputs: Vec<String>,
    /// Steps that must finish before this one starts
    #[serde(default)]
    pub run_after: Vec<String>,
    #[serde(default)]
    pub allow_reuse: bool,
}

/// A step argument: either a literal or a reference to a step output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepArg {
    Literal(String),
    /// Replaced by the output's directory when the step runs
    Output(String),
}

impl StepArg {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::Output(name.into())
    }
}

impl PipelineStep {
    /// Create a step with no arguments, outputs or dependencies
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            arguments: Vec::new(),
            outputs: Vec::new(),
            run_after: Vec::new(),
            allow_reuse: false,
        }
    }

    /// Append a `--flag value` pair
    pub fn arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.arguments.push(StepArg::literal(flag));
        self.arguments.push(StepArg::Literal(value.into()));
        self
    }

    /// Append a `--flag <output dir>` pair and declare the output
    pub fn output_arg(mut self, flag: &str, output: &str) -> Self {
        self.arguments.push(StepArg::literal(flag));
        self.arguments.push(StepArg::output(output));
        if !self.outputs.iter().any(|o| o == output) {
            self.outputs.push(output.to_string());
        }
        self
    }

    /// Declare an output without passing it as an argument
    pub fn output(mut self, output: &str) -> Self {
        if !self.outputs.iter().any(|o| o == output) {
            self.outputs.push(output.to_string());
        }
        self
    }

    /// Order this step after another
    pub fn run_after(mut self, step: &str) -> Self {
        self.run_after.push(step.to_string());
        self
    }
}

impl PipelineDefinition {
    /// Validates the pipeline graph
    ///
    /// Step names must be unique, output arguments must name outputs the
    /// step declares, and `run_after` must reference known steps without
    /// forming a cycle.
    pub fn validate(&self) -> PlatformResult<()> {
        if self.steps.is_empty() {
            return Err(PlatformError::InvalidRequest(
                "pipeline has no steps".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(PlatformError::InvalidRequest(format!(
                    "duplicate step name: {}",
                    step.name
                )));
            }
        }

        for step in &self.steps {
            for arg in &step.arguments {
                if let StepArg::Output(output) = arg {
                    if !step.outputs.contains(output) {
                        return Err(PlatformError::InvalidRequest(format!(
                            "step {} references undeclared output {}",
                            step.name, output
                        )));
                    }
                }
            }
            for dependency in &step.run_after {
                if !names.contains(dependency.as_str()) {
                    return Err(PlatformError::InvalidRequest(format!(
                        "step {} runs after unknown step {}",
                        step.name, dependency
                    )));
                }
            }
        }

        self.execution_order().map(|_| ())
    }

    /// Steps in an order that honours every `run_after` edge
    ///
    /// Ties keep definition order.
    pub fn execution_order(&self) -> PlatformResult<Vec<&PipelineStep>> {
        let mut remaining: Vec<&PipelineStep> = self.steps.iter().collect();
        let mut done: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready = remaining
                .iter()
                .position(|s| s.run_after.iter().all(|d| done.contains(d.as_str())))
                .ok_or_else(|| {
                    PlatformError::InvalidRequest("pipeline steps form a cycle".to_string())
                })?;
            let step = remaining.remove(ready);
            done.insert(step.name.as_str());
            ordered.push(step);
        }

        Ok(ordered)
    }
}

/// A submitted pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub experiment: String,
    pub status: PipelineRunStatus,
    pub steps: Vec<StepRun>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PipelineRun {
    /// Find the run of a step by name
    pub fn find_step_run(&self, name: &str) -> Option<&StepRun> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Execution record of one step within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub name: String,
    pub status: PipelineRunStatus,
    /// Output name -> location of the materialised output
    #[serde(default)]
    pub outputs: HashMap<String, String>,
    pub error: Option<String>,
}

/// Pipeline (and step) run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineRunStatus {
    NotStarted,
    Running,
    Finished,
    Failed,
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(steps: Vec<PipelineStep>) -> PipelineDefinition {
        PipelineDefinition {
            experiment: "chd".to_string(),
            compute_target: "cpu-cluster".to_string(),
            steps,
        }
    }

    #[test]
    fn test_output_arg_declares_output_once() {
        let step = PipelineStep::new("containerize", "containerize")
            .output_arg("--output", "containerize_output")
            .output("containerize_output");

        assert_eq!(step.outputs, vec!["containerize_output".to_string()]);
        assert_eq!(
            step.arguments,
            vec![
                StepArg::literal("--output"),
                StepArg::output("containerize_output")
            ]
        );
    }

    #[test]
    fn test_execution_order_respects_run_after() {
        let pipeline = definition(vec![
            PipelineStep::new("containerize", "containerize").run_after("train"),
            PipelineStep::new("train", "train"),
        ]);

        let order: Vec<&str> = pipeline
            .execution_order()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(order, vec!["train", "containerize"]);
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let pipeline = definition(vec![
            PipelineStep::new("a", "train").run_after("b"),
            PipelineStep::new("b", "train").run_after("a"),
        ]);
        assert!(matches!(
            pipeline.validate(),
            Err(PlatformError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let pipeline = definition(vec![PipelineStep::new("a", "train").run_after("missing")]);
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undeclared_output() {
        let mut step = PipelineStep::new("a", "containerize");
        step.arguments.push(StepArg::output("nowhere"));
        assert!(definition(vec![step]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        assert!(definition(vec![]).validate().is_err());
        let pipeline = definition(vec![
            PipelineStep::new("train", "train"),
            PipelineStep::new("train", "train"),
        ]);
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_step_arg_serialization() {
        let json = serde_json::to_value(StepArg::output("containerize_output")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "output", "value": "containerize_output"})
        );
    }
}
