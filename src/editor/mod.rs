//! Editing session: the command surface hosts drive.

pub mod session;
