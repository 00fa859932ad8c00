//! Domain layer - Draws, predictions and the posting automaton.
//!
//! Pure logic only: no I/O, no clocks read implicitly, no async.
//! Everything here is deterministic given its inputs and testable in
//! isolation (hexagonal architecture inner ring).

pub mod accuracy;
pub mod arbiter;
pub mod draw;
pub mod gbm;
pub mod journal;
pub mod policy;
pub mod posting;
pub mod prediction;
pub mod strategy;

// Re-export core types for convenience
pub use accuracy::{AccuracyState, BetResult};
pub use arbiter::{Arbiter, Arbitration, Stage};
pub use draw::{ColorClass, DrawError, DrawRecord, Period, SizeClass};
pub use journal::{BetEvent, BetEventKind};
pub use policy::{
    command_help, Channel, CommandError, PolicyCommand, PolicySnapshot, PostingMode, PostingPolicy,
    PostingStatus, TimeWindow,
};
pub use posting::{BetRecord, Effect, PostingAutomaton, PostingState};
pub use prediction::{Abstain, Opinion, Prediction, Source, Verdict};
pub use strategy::{LaggedClassifier, PatternFrequency, Strategy, StreakRule};
