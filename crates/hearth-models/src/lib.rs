//! # hearth-models
//!
//! Primary models the UI talks to (journal, profile, team, circle), their
//! alternate-context extensions for viewing another team member, and the
//! coordinator that wires them together.
//!
//! Every model is a process-wide instance obtained through
//! [`hearth_sync::AppContext::model`].

#![deny(unsafe_code)]

pub mod circle;
pub mod coordinator;
pub mod error;
pub mod journal;
pub mod profile;
pub mod team;

mod support;
#[cfg(test)]
mod testutil;

pub use circle::{AltCircle, CircleModel, CircleSource, OwnCircle};
pub use coordinator::ModelCoordinator;
pub use error::{ModelError, Result};
pub use journal::{AltJournal, JournalModel, JournalSource, OwnJournal};
pub use profile::{AltProfile, OwnProfile, ProfileModel, ProfileSource, MAX_RATING};
pub use team::TeamModel;
