//! Host collaborators for edutools.
//!
//! The core only talks to the host through the boundaries defined here: a
//! keyed property store, a translator for display text, the environment
//! (actors, inventories, helper objects) and the form presenter. The
//! in-memory implementations back the console binary and the tests.

#![warn(missing_docs)]

pub mod environment;
pub mod json_store;
pub mod lang;
pub mod presenter;
pub mod sim;
pub mod store;

pub use environment::Environment;
pub use json_store::JsonPropertyStore;
pub use lang::{LangTranslator, Translator};
pub use presenter::ConsolePresenter;
pub use sim::SimEnvironment;
pub use store::{MemoryPropertyStore, PropertyStore, Result, ScopedStore, StoreError};
