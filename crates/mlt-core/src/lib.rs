//! Concurrency core of a multi-engine transfer bot: task registry, queue
//! admission and force-start, cooperative cancellation, and paginated status
//! views over heterogeneous engines.

pub mod admission;
pub mod batch;
pub mod button;
pub mod cancel;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod permissions;
pub mod registry;
pub mod select;
pub mod service;
pub mod status;
pub mod task;

#[cfg(test)]
mod testing;

pub use error::CoreError;
pub use service::{CallbackReply, CommandReply, TaskCore};
