//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `DrawFeed`: Resolved draws from the upstream game API
//! - `Repository`: Outcome history, accuracy and bet journal persistence
//! - `Announcer`: Channel posts and operator reports
//! - `OperatorRequest`: Operator commands into the game loop

pub mod announcer;
pub mod draw_feed;
pub mod operator;
pub mod repository;

pub use announcer::{Announcer, BetAnnouncement, RoundReport, WinNotice};
pub use draw_feed::{DrawFeed, RawDraw};
pub use operator::{OperatorReceiver, OperatorRequest, OperatorSender};
pub use repository::Repository;
