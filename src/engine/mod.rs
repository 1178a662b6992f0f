//! Chain evaluation.

pub mod render;
