use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbaImage;

use crate::{
    catalog::{
        kind::{Catalog, KindRole},
        params::ParamValue,
    },
    engine::render::{Engine, RenderJob, RenderedOutput},
    foundation::core::{ImageSize, LinkId, NodeId, Point, PortId, Vec2},
    foundation::error::{ChainError, ChainResult},
    foundation::opts::EditorOpts,
    graph::{
        links::LinkTable,
        resolve::Chain,
        state::Graph,
        store::{NodeInstance, NodeStore},
    },
    history::{
        entry::HistoryEntry,
        manager::{History, HistoryOpts},
    },
    project::{
        file::{LoadReport, ProjectFile},
        image_io,
    },
};

const FIRST_NODE_POS: Point = Point::new(220.0, 120.0);
const NODE_POS_STEP: Vec2 = Vec2::new(30.0, 30.0);

/// One independent editing session.
///
/// Owns the catalog, the graph, the undo log and the rendered output. Every mutating
/// command records history, re-resolves the chain and re-renders it.
#[derive(Debug)]
pub struct Editor {
    catalog: Catalog,
    graph: Graph,
    history: History,
    engine: Engine,
    opts: EditorOpts,
    input_image: Arc<RgbaImage>,
    input_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
    render_error: Option<String>,
    auto_render: bool,
}

impl Editor {
    /// Start a session on `input` and render it once.
    pub fn new(catalog: Catalog, opts: EditorOpts, input: RgbaImage) -> ChainResult<Self> {
        opts.validate()?;
        let nodes = NodeStore::new(catalog.input_kind(), catalog.output_kind())?;
        let history = History::new(HistoryOpts {
            coalesce_param_updates: opts.coalesce_param_updates,
            limit: opts.history_limit,
        });
        let mut editor = Self {
            graph: Graph::new(nodes),
            history,
            engine: Engine::new(opts.preview_max_px),
            catalog,
            opts,
            input_image: Arc::new(input),
            input_path: None,
            project_path: None,
            render_error: None,
            auto_render: true,
        };
        editor.recompute()?;
        Ok(editor)
    }

    /// Session over the built-in catalog with default options.
    pub fn with_builtin(input: RgbaImage) -> ChainResult<Self> {
        Self::new(Catalog::builtin(), EditorOpts::default(), input)
    }

    /// Node kinds available to this session.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Session options.
    pub fn opts(&self) -> &EditorOpts {
        &self.opts
    }

    /// Live nodes.
    pub fn nodes(&self) -> &NodeStore {
        self.graph.nodes()
    }

    /// Live links.
    pub fn links(&self) -> &LinkTable {
        self.graph.links()
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> ChainResult<&NodeInstance> {
        self.graph.nodes().get(id)
    }

    /// Id of the protected Input node.
    pub fn input_node(&self) -> NodeId {
        self.graph.nodes().input()
    }

    /// Id of the protected Output node.
    pub fn output_node(&self) -> NodeId {
        self.graph.nodes().output()
    }

    /// Current execution chain.
    pub fn chain(&self) -> Chain {
        self.graph.resolve()
    }

    /// Last successfully rendered result.
    pub fn output(&self) -> Option<&RenderedOutput> {
        self.engine.output()
    }

    /// Undo/redo log.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Failure of the most recent render, cleared by the next successful one.
    pub fn render_error(&self) -> Option<&str> {
        self.render_error.as_deref()
    }

    /// Full-resolution source image of the Input node.
    pub fn input_image(&self) -> &RgbaImage {
        &self.input_image
    }

    /// Dimensions of the Input image.
    pub fn input_size(&self) -> ImageSize {
        ImageSize::of(&self.input_image)
    }

    /// Project file used by `save(None)`.
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// When off, edits only invalidate running jobs and the host drives rendering
    /// through [`Editor::begin_render`] and [`Editor::complete_render`].
    pub fn set_auto_render(&mut self, on: bool) {
        self.auto_render = on;
    }

    fn free_position(&self) -> Point {
        let mut pos = FIRST_NODE_POS;
        while self.graph.nodes().iter().any(|n| n.position == pos) {
            pos += NODE_POS_STEP;
        }
        pos
    }

    /// Instantiate a transform kind with default parameters.
    pub fn add_node(&mut self, kind: &str) -> ChainResult<NodeId> {
        let kind = self.catalog.get(kind)?;
        if kind.role != KindRole::Transform {
            return Err(ChainError::validation(format!(
                "'{}' exists once per session and cannot be added",
                kind.name
            )));
        }
        let params = kind.default_params(self.input_size());
        let position = self.free_position();
        let id = self.graph.nodes.create(kind, params, position);
        let snapshot = self.graph.nodes().get(id)?.snapshot();
        tracing::debug!(node = %snapshot.label, "added node");
        self.history.record(HistoryEntry::node_created(snapshot));
        self.changed();
        Ok(id)
    }

    /// Remove a node and every link touching it.
    pub fn delete_node(&mut self, id: NodeId) -> ChainResult<()> {
        let (node, links) = self.graph.delete_node(id)?;
        self.history
            .record(HistoryEntry::node_deleted(node.snapshot(), links));
        self.changed();
        Ok(())
    }

    /// Copy a node's kind and parameters into a new, unlinked node.
    pub fn duplicate_node(&mut self, id: NodeId) -> ChainResult<NodeId> {
        let source = self.graph.nodes().get(id)?;
        if source.is_protected() {
            return Err(ChainError::protected(source.label.clone()));
        }
        let kind = source.kind.clone();
        let params = source.params.clone();
        let [dx, dy] = self.opts.duplicate_offset;
        let position = source.position + Vec2::new(dx, dy);

        let copy = self.graph.nodes.create(kind, params, position);
        let snapshot = self.graph.nodes().get(copy)?.snapshot();
        self.history.record(HistoryEntry::node_created(snapshot));
        self.changed();
        Ok(copy)
    }

    /// Link an output port to an input port.
    ///
    /// A link already leaving `source` is removed first and recorded as its own step.
    pub fn connect(&mut self, source: PortId, target: PortId) -> ChainResult<LinkId> {
        let connected = self.graph.connect(source, target)?;
        if let Some(old) = connected.replaced {
            tracing::debug!(link = %old.id, "source port reused, retiring previous link");
            self.history.record(HistoryEntry::link_deleted(old));
        }
        self.history
            .record(HistoryEntry::link_created(connected.link));
        self.changed();
        Ok(connected.link.id)
    }

    /// Link the output of `from` to the input of `to`.
    pub fn connect_nodes(&mut self, from: NodeId, to: NodeId) -> ChainResult<LinkId> {
        self.connect(PortId::output(from), PortId::input(to))
    }

    /// Remove a link. Unknown ids are a no-op.
    pub fn disconnect(&mut self, link: LinkId) -> ChainResult<()> {
        let Some(removed) = self.graph.links.remove(link) else {
            tracing::debug!(%link, "disconnect of unknown link ignored");
            return Ok(());
        };
        self.history.record(HistoryEntry::link_deleted(removed));
        self.changed();
        Ok(())
    }

    /// Change one parameter. The value is checked against the kind's schema first.
    ///
    /// Setting a parameter to its current value changes nothing and records nothing.
    pub fn set_parameter(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<ParamValue>,
    ) -> ChainResult<()> {
        let node = self.graph.nodes().get(id)?;
        let Some(spec) = node.kind.param_spec(key) else {
            return Err(ChainError::unknown_parameter(node.label.clone(), key));
        };
        let value = spec.coerce(value.into())?;
        if node.params.get(key) == Some(&value) {
            return Ok(());
        }
        let label = node.label.clone();

        let old = self.graph.replace_param(id, key, value.clone())?;
        self.history
            .record(HistoryEntry::param_updated(&label, id, key, old, value));
        self.changed();
        Ok(())
    }

    /// Move a node on the canvas. Not recorded and no re-render.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> ChainResult<()> {
        self.graph.nodes.get_mut(id)?.position = position;
        Ok(())
    }

    /// Replace the Input image. Not recorded.
    pub fn set_input_image(&mut self, image: RgbaImage, path: Option<PathBuf>) {
        tracing::debug!(size = %ImageSize::of(&image), "input image replaced");
        self.input_image = Arc::new(image);
        self.input_path = path;
        self.changed();
    }

    /// Step back one history entry.
    pub fn undo(&mut self) -> ChainResult<bool> {
        let result = self.history.undo(&mut self.graph);
        self.after_replay(result)
    }

    /// Step forward one history entry.
    pub fn redo(&mut self) -> ChainResult<bool> {
        let result = self.history.redo(&mut self.graph);
        self.after_replay(result)
    }

    fn after_replay(&mut self, result: ChainResult<bool>) -> ChainResult<bool> {
        match result {
            Ok(false) => Ok(false),
            Ok(true) => {
                self.changed();
                Ok(true)
            }
            Err(err) => {
                // A failed step may have applied part of its effect.
                self.changed();
                Err(err)
            }
        }
    }

    fn clear_graph(&mut self) {
        let removable: Vec<NodeId> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| !n.is_protected())
            .map(|n| n.id)
            .collect();
        for id in removable {
            if let Err(err) = self.graph.delete_node(id) {
                tracing::warn!(node = %id, %err, "failed to remove node while clearing");
            }
        }
        self.graph.links.clear();
    }

    /// Remove every deletable node and every link, and forget history and project path.
    pub fn reset_project(&mut self) {
        self.clear_graph();
        self.history.clear();
        self.project_path = None;
        tracing::debug!("project reset");
        self.changed();
    }

    /// Write the project file to `path`, or to the last saved/loaded path.
    #[tracing::instrument(skip(self))]
    pub fn save(&mut self, path: Option<&Path>) -> ChainResult<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .project_path
                .clone()
                .ok_or_else(|| ChainError::validation("no project path to save to"))?,
        };
        let image = self.input_path.as_ref().map(|img| {
            path.parent()
                .and_then(|dir| img.strip_prefix(dir).ok())
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| img.clone())
        });
        ProjectFile::capture(&self.graph, image).write(&path)?;
        self.project_path = Some(path.clone());
        tracing::debug!(path = %path.display(), "saved project");
        Ok(path)
    }

    /// Replace the session's graph with the contents of a project file.
    ///
    /// History is cleared. A missing or undecodable image keeps the current Input image.
    #[tracing::instrument(skip(self))]
    pub fn load(&mut self, path: &Path) -> ChainResult<LoadReport> {
        let file = ProjectFile::read(path)?;

        if let Some(image_path) = file.image_path(path) {
            match image_io::read_image(&image_path) {
                Ok(image) => {
                    self.input_image = Arc::new(image);
                    self.input_path = Some(image_path);
                }
                Err(err) => {
                    tracing::warn!(image = %image_path.display(), %err, "cannot load project image, keeping current input");
                }
            }
        }
        self.apply_project(&file, path)
    }

    /// Like [`Editor::load`], but ignores the project's image and keeps the current Input.
    #[tracing::instrument(skip(self))]
    pub fn load_graph(&mut self, path: &Path) -> ChainResult<LoadReport> {
        let file = ProjectFile::read(path)?;
        self.apply_project(&file, path)
    }

    fn apply_project(&mut self, file: &ProjectFile, path: &Path) -> ChainResult<LoadReport> {
        let input_size = self.input_size();
        self.clear_graph();
        let report = file.apply(&self.catalog, &mut self.graph, input_size);
        self.history.clear();
        self.project_path = Some(path.to_path_buf());
        self.changed();
        report
    }

    /// Write the full-resolution result of the last render.
    pub fn export(&self, path: &Path) -> ChainResult<()> {
        let output = self
            .engine
            .output()
            .ok_or_else(|| ChainError::validation("nothing has been rendered yet"))?;
        if !output.complete {
            return Err(ChainError::validation(
                "chain does not reach the Output node; nothing to export",
            ));
        }
        image_io::write_image(&output.image, path)?;
        tracing::debug!(path = %path.display(), size = %output.size(), "exported output");
        Ok(())
    }

    /// Resolve and render the chain now.
    ///
    /// On failure the previous output stays in place and the error message is also kept
    /// in [`Editor::render_error`].
    pub fn recompute(&mut self) -> ChainResult<&RenderedOutput> {
        let job = self.begin_render()?;
        match job.run() {
            Ok(Some(rendered)) => {
                self.complete_render(rendered);
            }
            Ok(None) => {
                return Err(ChainError::Other(anyhow::anyhow!(
                    "render of generation {} was superseded",
                    job.generation()
                )));
            }
            Err(err) => {
                tracing::warn!(%err, "render failed, keeping previous output");
                self.render_error = Some(err.to_string());
                return Err(err);
            }
        }
        self.engine
            .output()
            .ok_or_else(|| ChainError::Other(anyhow::anyhow!("render produced no output")))
    }

    /// Snapshot the chain into a job that may run on another thread.
    pub fn begin_render(&self) -> ChainResult<RenderJob> {
        let chain = self.graph.resolve();
        self.engine
            .job(&chain, self.graph.nodes(), self.input_image.clone())
    }

    /// Install a finished job's result unless a newer edit superseded it.
    pub fn complete_render(&mut self, rendered: RenderedOutput) -> bool {
        let installed = self.engine.install(rendered);
        if installed {
            self.render_error = None;
        }
        installed
    }

    fn changed(&mut self) {
        if !self.auto_render {
            self.engine.bump();
            return;
        }
        if let Err(err) = self.recompute() {
            tracing::warn!(%err, "edit applied but render failed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/session.rs"]
mod tests;
