//! Pipeline stages
//!
//! Each stage takes the shared [`PipelineContext`](crate::context::PipelineContext)
//! plus its own arguments and returns a result value describing what it did.
//! Printing is left to the command handlers.

pub mod build_pipeline;
pub mod containerize;
pub mod deploy;
pub mod provision;
pub mod train;

#[cfg(test)]
pub(crate) mod testing;
