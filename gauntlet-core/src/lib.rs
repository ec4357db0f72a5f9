//! Gauntlet Core
//!
//! Core types and abstractions for the Gauntlet model promotion pipeline.
//!
//! This crate contains:
//! - Domain types: records owned by the ML platform (models, runs, images, services, compute)
//! - DTOs: request payloads sent to the platform
//! - Hand-off contract: the JSON records threaded between pipeline stages
//! - Promotion gate: the champion/challenger decision
//! - Platform traits: the fixed interface every platform backend implements

pub mod domain;
pub mod dto;
pub mod error;
pub mod gate;
pub mod handoff;
pub mod platform;
pub mod wait;

pub use error::{CoreError, CoreResult, PlatformError, PlatformResult};
pub use platform::Platform;
