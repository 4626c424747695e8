//! Deterministic table transforms: moving averages, rebasing, resampling,
//! and percent change.

mod engine;
mod spec;

pub use engine::TransformEngine;
pub use spec::{Agg, Freq, Operation, TransformSpec};
