//! Background mechanics for edutools.
//!
//! Each mechanic is a set of scheduled tasks over a shared [`Console`] world:
//! the helper sweep reclaims orphaned helpers, the feedback prompt polls
//! actors through the navigation engine, and the content scan clears
//! restricted items in chunked jobs.

#![warn(missing_docs)]

pub mod config;
pub mod content_scan;
pub mod feedback;
pub mod sweep;
pub mod world;

pub use config::{ContentScanConfig, FeedbackPromptConfig, HelperSweepConfig};
pub use content_scan::{ContentScanTasks, ScanJob};
pub use feedback::{FeedbackScene, FeedbackTasks};
pub use sweep::{sweep_helpers, SweepReport};
pub use world::{Console, ConsoleScheduler};
