//! Node kinds: parameter schemas, built-in transforms and plugin discovery.

pub mod builtin;
pub mod kind;
pub mod params;
pub mod pixels;
pub mod plugin;
