//! Cooperative task scheduling for the host tick loop.
//!
//! Periodic and one-shot callbacks, chunked jobs resumed across ticks, and a
//! caller-owned single-flight guard. Everything runs on the caller's thread;
//! nothing here blocks.

#![warn(missing_docs)]

pub mod config;
pub mod guard;
pub mod job;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use guard::{FlightPermit, SingleFlight};
pub use job::{from_fn, FnJob, Job, JobInfo, Step};
pub use scheduler::{Callback, TaskCx, TaskHandle, TaskScheduler};
