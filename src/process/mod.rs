//! Step adapters over the write and messaging layers
//!
//! Step ordering and cross-step rollback belong to the process framework
//! that drives these steps; this module only provides the step boundary.

pub mod message_step;
pub mod put_step;

use crate::common::Result;
use futures_util::future::BoxFuture;

pub use message_step::MessageStep;
pub use put_step::PutStep;

/// One unit of work in a process
pub trait ProcessStep: Send {
    fn execute(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Undo what `execute` did, as far as possible
    fn rollback(&mut self) -> BoxFuture<'_, Result<()>>;
}
