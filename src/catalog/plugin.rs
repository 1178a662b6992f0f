//! Plugin node kinds.
//!
//! A plugin is a directory holding a `plugin.json` descriptor. The descriptor declares the
//! kind's name, parameter schema and the name of the run function; the function itself is
//! supplied by the host through a [`PluginRuntime`].

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    catalog::{
        kind::{Catalog, NodeKind, NodeRun},
        params::{ParamSpec, Params},
    },
    foundation::error::{ChainError, ChainResult},
};

/// File name of a plugin descriptor inside its directory.
pub const DESCRIPTOR_FILE: &str = "plugin.json";

/// Parsed `plugin.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PluginDescriptor {
    /// Kind name the plugin registers.
    pub name: String,
    /// Tooltip text.
    #[serde(default)]
    pub description: String,
    /// Disabled plugins are discovered but never registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether instances may be deleted/duplicated.
    #[serde(default)]
    pub protected: bool,
    /// Parameter schema.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    /// Entry point.
    pub runtime: PluginEntry,
    /// Directory the descriptor was read from.
    #[serde(skip)]
    pub dir: PathBuf,
}

/// `runtime` section of a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PluginEntry {
    /// Name of the host run function implementing the kind.
    pub main: String,
}

fn default_true() -> bool {
    true
}

/// Read every `<dir>/<plugin>/plugin.json`, sorted by directory name.
///
/// Subdirectories without a descriptor are skipped. A descriptor that fails to parse
/// is reported as a [`ChainError::Serde`] naming the file.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover_plugins(dir: &Path) -> ChainResult<Vec<PluginDescriptor>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read plugin directory '{}'", dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut out = Vec::new();
    for plugin_dir in dirs {
        let descriptor_path = plugin_dir.join(DESCRIPTOR_FILE);
        if !descriptor_path.is_file() {
            tracing::debug!(dir = %plugin_dir.display(), "no plugin descriptor, skipping");
            continue;
        }
        let text = std::fs::read_to_string(&descriptor_path)
            .with_context(|| format!("read '{}'", descriptor_path.display()))?;
        let mut descriptor: PluginDescriptor = serde_json::from_str(&text).map_err(|e| {
            ChainError::serde(format!("{}: {e}", descriptor_path.display()))
        })?;
        descriptor.dir = plugin_dir;
        out.push(descriptor);
    }
    tracing::debug!(count = out.len(), "discovered plugins");
    Ok(out)
}

/// Host-side table of run functions that plugin descriptors can name.
#[derive(Clone, Default)]
pub struct PluginRuntime {
    runs: BTreeMap<String, Arc<dyn NodeRun>>,
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.runs.keys()).finish()
    }
}

impl PluginRuntime {
    /// Empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime preloaded with the stock run functions (`invert`, `grayscale`, `posterize`).
    pub fn standard() -> Self {
        Self::new()
            .with("invert", invert)
            .with("grayscale", grayscale)
            .with("posterize", posterize)
    }

    /// Add (or replace) the run function called `main`.
    pub fn with(mut self, main: &str, run: impl NodeRun + 'static) -> Self {
        self.insert(main, run);
        self
    }

    /// Add (or replace) the run function called `main`.
    pub fn insert(&mut self, main: &str, run: impl NodeRun + 'static) {
        self.runs.insert(main.to_string(), Arc::new(run));
    }

    /// Run function called `main`.
    pub fn get(&self, main: &str) -> Option<Arc<dyn NodeRun>> {
        self.runs.get(main).cloned()
    }

    /// Names of every available run function.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(String::as_str)
    }
}

impl Catalog {
    /// Register the enabled descriptors whose run function `runtime` supplies.
    ///
    /// Returns the registered kind names in descriptor order. A name clash with an
    /// existing kind fails the whole call before anything is registered.
    pub fn register_plugins(
        &mut self,
        descriptors: &[PluginDescriptor],
        runtime: &PluginRuntime,
    ) -> ChainResult<Vec<String>> {
        let mut staged = self.clone();
        let mut registered = Vec::new();
        for descriptor in descriptors {
            if !descriptor.enabled {
                tracing::debug!(plugin = %descriptor.name, "plugin disabled, skipping");
                continue;
            }
            let Some(run) = runtime.get(&descriptor.runtime.main) else {
                tracing::warn!(
                    plugin = %descriptor.name,
                    main = %descriptor.runtime.main,
                    "plugin run function is not available, skipping"
                );
                continue;
            };
            let kind = NodeKind::transform_shared(
                &descriptor.name,
                &descriptor.description,
                descriptor.parameters.clone(),
                run,
            )
            .into_plugin(descriptor.protected);
            staged.register(kind)?;
            registered.push(descriptor.name.clone());
        }
        *self = staged;
        Ok(registered)
    }
}

fn invert(image: &RgbaImage, _params: &Params) -> anyhow::Result<RgbaImage> {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = 255 - px.0[c];
        }
    }
    Ok(out)
}

fn grayscale(image: &RgbaImage, _params: &Params) -> anyhow::Result<RgbaImage> {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, _] = px.0;
        let y = ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8;
        px.0[..3].fill(y);
    }
    Ok(out)
}

fn posterize(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    let levels = match params.get("levels") {
        Some(_) => params.int("levels")?,
        None => 4,
    };
    if !(2..=256).contains(&levels) {
        anyhow::bail!("levels must be within 2..=256, got {levels}");
    }
    let step = 255.0 / (levels - 1) as f32;
    let mut out = image.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = ((f32::from(px.0[c]) / step).round() * step).round().min(255.0) as u8;
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/plugin.rs"]
mod tests;
