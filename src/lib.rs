//! imgchain is the core of a node-chain image editor.
//!
//! A session holds a fixed Input node, a fixed Output node and any number of transform
//! nodes wired by point-to-point links. The crate derives the execution chain from those
//! links, re-renders it deterministically after every edit and keeps a linear undo/redo
//! log of every structural and parametric change.
//!
//! - Build a [`Catalog`] (built-ins plus optional plugin kinds)
//! - Create an [`Editor`] on a source image
//! - Drive it through its command surface; read [`Editor::output`]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod editor;
pub mod engine;
pub mod foundation;
pub mod graph;
pub mod history;
pub mod project;

pub use crate::catalog::kind::{Catalog, KindRole, NodeKind, NodeRun};
pub use crate::catalog::params::{ParamDefault, ParamSpec, ParamValue, Params};
pub use crate::catalog::plugin::{PluginDescriptor, PluginRuntime, discover_plugins};
pub use crate::editor::session::Editor;
pub use crate::engine::render::{RenderJob, RenderedOutput};
pub use crate::foundation::core::{ImageSize, LinkId, NodeId, Point, PortDir, PortId, Vec2};
pub use crate::foundation::error::{ChainError, ChainResult};
pub use crate::foundation::opts::EditorOpts;
pub use crate::graph::links::Link;
pub use crate::graph::resolve::Chain;
pub use crate::graph::store::NodeInstance;
pub use crate::history::entry::{HistoryAction, HistoryEntry};
pub use crate::project::file::{LoadReport, ProjectFile};
