//! Core domain types
//!
//! This module contains the records owned by the ML platform. They are
//! shared between platform backends (which persist or fetch them) and the
//! pipeline stages (which read them to make decisions).

pub mod compute;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod run;
pub mod service;
