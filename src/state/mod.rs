//! State module for tracking crawl progress
//!
//! `PageState` is the per-item state machine driven by the orchestrator;
//! `SkipReason` names the policy decisions that end an item without saving it.

mod page_state;

pub use page_state::{PageState, SkipReason};
