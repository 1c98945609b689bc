//! edutools core data models.
//!
//! Identifiers and display tokens shared by the scheduler, link registry,
//! navigation engine and the background mechanics built on them.

#![warn(missing_docs)]

mod id;
mod text;

pub use id::{ActorId, ContextId, HelperId, RequestId};
pub use text::Text;

/// Host tick counter, the smallest unit of scheduling time.
pub type Tick = u64;

/// Free-form JSON value carried in context data and form responses.
pub type Value = serde_json::Value;
