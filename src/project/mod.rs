//! Project documents and image files.

pub mod file;
pub mod image_io;
