//! Pending edit bookkeeping and flush planning.

mod action;
mod manager;
mod plan;


pub use action::{Action, ActionKind};
pub use manager::ChangeManager;
pub use plan::FlushPlan;
