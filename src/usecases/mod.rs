//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's core workflows.
//!
//! Use cases:
//! - `OutcomeStore`: capped, ordered draw history
//! - `AccuracyTracker`: scoring predictions against outcomes
//! - `PolicyController`: operator commands and policy snapshots
//! - `RoundProcessor`: the per-round pipeline
//! - `GameLoop`: poll / dedupe / process / sleep
//! - `WarmUp`: startup backfill from paged history

pub mod accuracy_tracker;
pub mod game_loop;
pub mod outcome_store;
pub mod policy_controller;
pub mod round_processor;
pub mod warm_up;

pub use accuracy_tracker::AccuracyTracker;
pub use game_loop::{GameLoop, PollOutcome};
pub use outcome_store::OutcomeStore;
pub use policy_controller::PolicyController;
pub use round_processor::{PendingPrediction, RoundOutcome, RoundProcessor};
pub use warm_up::{WarmUp, WarmUpReport};
