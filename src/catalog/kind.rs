use std::{collections::BTreeMap, fmt, sync::Arc};

use image::RgbaImage;

use crate::{
    catalog::params::{ParamSpec, Params},
    foundation::core::ImageSize,
    foundation::error::{ChainError, ChainResult},
};

/// Pure image transform: `(image, parameters) -> image`.
///
/// Implementations must not rely on hidden state; the engine calls `run` again with the
/// same inputs whenever anything in the chain changes and expects the same pixels back.
pub trait NodeRun: Send + Sync {
    /// Produce the successor image. `image` is borrowed and must be left untouched.
    fn run(&self, image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage>;
}

impl<F> NodeRun for F
where
    F: Fn(&RgbaImage, &Params) -> anyhow::Result<RgbaImage> + Send + Sync,
{
    fn run(&self, image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
        self(image, params)
    }
}

fn passthrough(image: &RgbaImage, _params: &Params) -> anyhow::Result<RgbaImage> {
    Ok(image.clone())
}

/// Position of a kind in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KindRole {
    /// The single chain root; owns the source image.
    Input,
    /// The single chain sink; shows the rendered result.
    Output,
    /// Any intermediate step.
    Transform,
}

/// Immutable descriptor of an instantiable node kind.
#[derive(Clone)]
pub struct NodeKind {
    /// Unique name; also the prefix of instance labels.
    pub name: String,
    /// One-line tooltip text.
    pub description: String,
    /// Chain position of the kind.
    pub role: KindRole,
    /// Protected kinds can be neither deleted nor duplicated.
    pub protected: bool,
    /// Parameter schema in display order.
    pub params: Vec<ParamSpec>,
    /// Whether the kind came from a plugin descriptor.
    pub plugin: bool,
    run: Arc<dyn NodeRun>,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKind")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("protected", &self.protected)
            .field("params", &self.params.len())
            .field("plugin", &self.plugin)
            .finish()
    }
}

impl NodeKind {
    /// A deletable transform kind.
    pub fn transform(
        name: &str,
        description: &str,
        params: Vec<ParamSpec>,
        run: impl NodeRun + 'static,
    ) -> Self {
        Self::transform_shared(name, description, params, Arc::new(run))
    }

    /// Like [`NodeKind::transform`] with an already shared runner.
    pub fn transform_shared(
        name: &str,
        description: &str,
        params: Vec<ParamSpec>,
        run: Arc<dyn NodeRun>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            role: KindRole::Transform,
            protected: false,
            params,
            plugin: false,
            run,
        }
    }

    pub(crate) fn endpoint(name: &str, description: &str, role: KindRole) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            role,
            protected: true,
            params: Vec::new(),
            plugin: false,
            run: Arc::new(passthrough),
        }
    }

    /// Mark the kind as plugin-provided and set its protection flag.
    pub fn into_plugin(mut self, protected: bool) -> Self {
        self.plugin = true;
        self.protected = protected;
        self
    }

    /// Default parameters for a new instance created against an input of `input` size.
    pub fn default_params(&self, input: ImageSize) -> Params {
        Params::from_schema(&self.params, input)
    }

    /// Schema entry for `key`.
    pub fn param_spec(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == key)
    }

    /// Apply the kind's transform.
    pub fn run(&self, image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
        self.run.run(image, params)
    }

    /// Lowercase label prefix for instances of this kind.
    pub fn label_prefix(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect()
    }
}

/// Registry of every instantiable node kind, keyed by name.
#[derive(Clone, Debug)]
pub struct Catalog {
    kinds: BTreeMap<String, Arc<NodeKind>>,
    order: Vec<String>,
}

/// Name of the protected chain root.
pub const INPUT_KIND: &str = "Input";
/// Name of the protected chain sink.
pub const OUTPUT_KIND: &str = "Output";

impl Catalog {
    /// A catalog with only the Input and Output kinds.
    pub fn empty() -> Self {
        let mut catalog = Self {
            kinds: BTreeMap::new(),
            order: Vec::new(),
        };
        catalog.insert(NodeKind::endpoint(
            INPUT_KIND,
            "Image input",
            KindRole::Input,
        ));
        catalog.insert(NodeKind::endpoint(
            OUTPUT_KIND,
            "Image result",
            KindRole::Output,
        ));
        catalog
    }

    fn insert(&mut self, kind: NodeKind) {
        self.order.push(kind.name.clone());
        self.kinds.insert(kind.name.clone(), Arc::new(kind));
    }

    /// Register an additional kind. Names are unique (case-insensitive).
    pub fn register(&mut self, kind: NodeKind) -> ChainResult<()> {
        if kind.name.trim().is_empty() {
            return Err(ChainError::validation("node kind name must be non-empty"));
        }
        if kind.role != KindRole::Transform {
            return Err(ChainError::validation(format!(
                "kind '{}' must be a transform; Input and Output are fixed",
                kind.name
            )));
        }
        if self.lookup_ci(&kind.name).is_some() {
            return Err(ChainError::validation(format!(
                "node kind '{}' is already registered",
                kind.name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &kind.params {
            if !seen.insert(spec.name.as_str()) {
                return Err(ChainError::validation(format!(
                    "kind '{}' declares parameter '{}' twice",
                    kind.name, spec.name
                )));
            }
        }
        tracing::debug!(kind = %kind.name, plugin = kind.plugin, "registered node kind");
        self.insert(kind);
        Ok(())
    }

    fn lookup_ci(&self, name: &str) -> Option<&Arc<NodeKind>> {
        self.kinds
            .values()
            .find(|k| k.name.eq_ignore_ascii_case(name))
    }

    /// Look up a kind by exact name.
    pub fn get(&self, name: &str) -> ChainResult<Arc<NodeKind>> {
        self.kinds
            .get(name)
            .or_else(|| self.lookup_ci(name))
            .cloned()
            .ok_or_else(|| ChainError::not_found(format!("node kind '{name}'")))
    }

    /// All kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<NodeKind>> {
        self.order.iter().filter_map(|n| self.kinds.get(n))
    }

    /// The protected Input kind.
    pub fn input_kind(&self) -> Arc<NodeKind> {
        self.kinds[INPUT_KIND].clone()
    }

    /// The protected Output kind.
    pub fn output_kind(&self) -> Arc<NodeKind> {
        self.kinds[OUTPUT_KIND].clone()
    }

    /// Best-effort kind inference from a legacy node key such as `"crop_3"`.
    ///
    /// Picks the longest kind name contained (case-insensitively) in the key so that
    /// e.g. `"sharpness_0"` never resolves to a shorter overlapping name.
    pub fn infer_from_key(&self, key: &str) -> Option<Arc<NodeKind>> {
        let key = key.to_ascii_lowercase();
        self.kinds()
            .filter(|k| key.contains(&k.name.to_ascii_lowercase()))
            .max_by_key(|k| k.name.len())
            .cloned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/kind.rs"]
mod tests;
