use crate::error::CoreError;
use std::fmt;
use tracing::debug;

/// Progress of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
	NotStarted,
	Running { index: usize, step: String },
	Completed,
	AbortedAt { index: usize, step: String },
}

impl fmt::Display for RunState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotStarted => write!(f, "NotStarted"),
			Self::Running { index, step } => write!(f, "Running({} {})", index + 1, step),
			Self::Completed => write!(f, "Completed"),
			Self::AbortedAt { index, step } => write!(f, "AbortedAt({} {})", index + 1, step),
		}
	}
}

/// Owns the run state and rejects out-of-order transitions.
#[derive(Debug)]
pub struct RunLifecycle {
	state: RunState,
}

impl RunLifecycle {
	pub fn new() -> Self {
		Self {
			state: RunState::NotStarted,
		}
	}

	pub fn state(&self) -> &RunState {
		&self.state
	}

	pub fn is_finished(&self) -> bool {
		matches!(self.state, RunState::Completed | RunState::AbortedAt { .. })
	}

	fn set_state(&mut self, new_state: RunState) -> Result<(), CoreError> {
		if !Self::is_valid_transition(&self.state, &new_state) {
			return Err(CoreError::Lifecycle(format!(
				"Invalid run transition from {} to {}",
				self.state, new_state
			)));
		}

		debug!("Run state changed: {} -> {}", self.state, new_state);
		self.state = new_state;
		Ok(())
	}

	pub fn begin_step(&mut self, index: usize, step: &str) -> Result<(), CoreError> {
		self.set_state(RunState::Running {
			index,
			step: step.to_string(),
		})
	}

	pub fn complete(&mut self) -> Result<(), CoreError> {
		self.set_state(RunState::Completed)
	}

	/// Aborts at the step currently running.
	pub fn abort(&mut self) -> Result<(), CoreError> {
		match &self.state {
			RunState::Running { index, step } => {
				let aborted = RunState::AbortedAt {
					index: *index,
					step: step.clone(),
				};
				self.set_state(aborted)
			}
			other => Err(CoreError::Lifecycle(format!(
				"Cannot abort a run that is {}",
				other
			))),
		}
	}

	fn is_valid_transition(from: &RunState, to: &RunState) -> bool {
		use RunState::*;

		match (from, to) {
			(NotStarted, Running { index: 0, .. }) => true,
			(Running { index: i, .. }, Running { index: j, .. }) => *j == i + 1,
			// A scenario with no steps completes immediately.
			(NotStarted, Completed) => true,
			(Running { .. }, Completed) => true,
			(Running { index: i, .. }, AbortedAt { index: j, .. }) => i == j,
			_ => false,
		}
	}
}

impl Default for RunLifecycle {
	fn default() -> Self {
		Self::new()
	}
}
