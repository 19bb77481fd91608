//! loon-core
//!
//! Pure game-session logic, no networking:
//! - seats, setup and the engine collaborator traits
//! - options and the labels a player answers against
//! - the option-selection algorithm
//! - a small demo engine used by the server binary

pub mod engine;
pub mod option;
pub mod event;
pub mod messages;
pub mod selection;
pub mod error;
pub mod demo;

pub use engine::{GameEngine, GameInterface, PlayerIo, Seat, SetupInfo};
pub use option::{Artifact, GameOption, Selectable};
pub use event::GameEvent;
pub use messages::{EventRecord, SelectRequest};
pub use selection::{Choice, LabelMatcher, PrefixMatcher, Selection, SelectionEngine, DONE};
pub use error::EngineError;
