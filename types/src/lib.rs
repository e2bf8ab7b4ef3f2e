//! Core domain types for the Mend conversation replay and patch engine.
//!
//! This crate holds pure data: message roles, validated content, step
//! identifiers, model response variants and block pairs. No IO, no async.

mod block;
mod ids;
mod message;
mod proofs;
mod response;

pub use block::BlockPair;
pub use ids::StepId;
pub use message::Message;
pub use proofs::{EmptyStringError, NonEmptyString};
pub use response::ModelResponse;
