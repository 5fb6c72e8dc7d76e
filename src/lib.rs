// src/lib.rs
//! Client core of the car color studio: color conversion, the remote image
//! gateway contract, the upload → mask → analysis → recolor pipeline and the
//! history of completed transformations.

pub mod color;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod services;

#[cfg(test)]
mod testing;

pub use color::Color;
pub use errors::{ErrorKind, StudioError};
pub use pipeline::{PipelineSnapshot, PipelineStage, PipelineState, StudioPipeline};
