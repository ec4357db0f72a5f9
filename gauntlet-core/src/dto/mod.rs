//! Data Transfer Objects for platform requests
//!
//! This module contains the request payloads the pipeline stages send to a
//! platform backend. Responses are the records in [`crate::domain`].

pub mod compute;
pub mod image;
pub mod model;
pub mod run;
pub mod service;
