//! Node instances, links and chain resolution.

pub mod links;
pub mod resolve;
pub mod state;
pub mod store;
