//! Execution engine for iotc
//!
//! The engine orchestrates:
//! 1. Planning - every declaration against its state entry
//! 2. Display - the plan, grouped by resource type
//! 3. Executing - staged changes with parallelism, recorded into state

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::display_plan;
pub use executor::{CliProgress, DialoguerConfirm, print_summary};
