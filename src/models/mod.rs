//! Core data models for the match tracker.

mod document;
mod filters;
mod ids;
mod match_record;
mod participant;
mod player_profile;

pub use document::*;
pub use filters::*;
pub use ids::*;
pub use match_record::*;
pub use participant::*;
pub use player_profile::*;
