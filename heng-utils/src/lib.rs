#![deny(clippy::all)]

pub mod fs;
pub mod tracing;
