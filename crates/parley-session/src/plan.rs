//! Plan tracker for multi-tool turns.
//!
//! Each tool call of a turn becomes a step moving through
//! `pending -> running -> completed | failed`. Terminal states are final.
//! A plan is only surfaced for display once it has more than one step.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub id: usize,
    pub tool_name: String,
    pub display_name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("no plan step at index {0}")]
    IndexOutOfRange(usize),

    #[error("step {index} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        index: usize,
        from: StepStatus,
        to: StepStatus,
    },
}

/// Human-readable label for a tool step.
pub fn display_name(tool_name: &str) -> String {
    match tool_name {
        "weather" => "Checking the weather".into(),
        "calendar" => "Checking your calendar".into(),
        "calculator" => "Calculating".into(),
        "reminders" => "Checking reminders".into(),
        "web_search" => "Searching the web".into(),
        "timer" => "Setting a timer".into(),
        other => format!("Using {other}"),
    }
}

#[derive(Debug, Default)]
pub struct PlanTracker {
    steps: Vec<PlanStep>,
}

impl PlanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any current plan with pending steps for `tool_names`.
    pub fn start_plan<S: AsRef<str>>(&mut self, tool_names: &[S]) {
        self.steps.clear();
        self.append_steps(tool_names);
    }

    /// Add pending steps for a later round of the same turn. Returns the
    /// index of the first added step.
    pub fn append_steps<S: AsRef<str>>(&mut self, tool_names: &[S]) -> usize {
        let first = self.steps.len();
        for name in tool_names {
            let name = name.as_ref();
            self.steps.push(PlanStep {
                id: self.steps.len(),
                tool_name: name.to_string(),
                display_name: display_name(name),
                status: StepStatus::Pending,
            });
        }
        first
    }

    pub fn mark_running(&mut self, index: usize) -> Result<(), PlanError> {
        self.transition(index, StepStatus::Running)
    }

    pub fn mark_completed(&mut self, index: usize) -> Result<(), PlanError> {
        self.transition(index, StepStatus::Completed)
    }

    pub fn mark_failed(&mut self, index: usize) -> Result<(), PlanError> {
        self.transition(index, StepStatus::Failed)
    }

    /// Fail every step that has not reached a terminal state.
    pub fn fail_unfinished(&mut self) -> usize {
        let mut failed = 0;
        for step in self.steps.iter_mut().filter(|s| !s.status.is_terminal()) {
            step.status = StepStatus::Failed;
            failed += 1;
        }
        failed
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Steps for display, empty unless the plan has more than one step.
    pub fn visible_plan(&self) -> Vec<PlanStep> {
        if self.steps.len() > 1 {
            self.steps.clone()
        } else {
            Vec::new()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    fn transition(&mut self, index: usize, to: StepStatus) -> Result<(), PlanError> {
        let step = self
            .steps
            .get_mut(index)
            .ok_or(PlanError::IndexOutOfRange(index))?;
        let allowed = matches!(
            (step.status, to),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Pending, StepStatus::Failed)
                | (StepStatus::Running, StepStatus::Completed)
                | (StepStatus::Running, StepStatus::Failed)
        );
        if !allowed {
            return Err(PlanError::InvalidTransition {
                index,
                from: step.status,
                to,
            });
        }
        step.status = to;
        Ok(())
    }
}
