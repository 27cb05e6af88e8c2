//! Progress and confirmation callbacks
//!
//! These traits keep the engine free of any particular terminal UI.

use crate::executor::Outcome;
use crate::types::{Action, ApplyResult};
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when a stage starts
    fn on_stage_start(&mut self, index: usize, count: usize, label: &str);

    /// Called when starting to apply a single change
    fn on_resource_start(&mut self, address: &str, action: Action);

    /// Called when a change completes
    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult);

    /// Called when a stage completes
    fn on_stage_complete(&mut self);

    /// Called with every outcome of a finished stage, before the next stage
    /// starts. Returning an error stops execution.
    fn on_stage_outcomes(&mut self, _outcomes: &[Outcome]) -> Result<()> {
        Ok(())
    }
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _index: usize, _count: usize, _label: &str) {}
    fn on_resource_start(&mut self, _address: &str, _action: Action) {}
    fn on_resource_complete(&mut self, _address: &str, _result: &ApplyResult) {}
    fn on_stage_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
