use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    catalog::{
        kind::{Catalog, KindRole},
        params::ParamValue,
    },
    foundation::core::{ImageSize, NodeId, Point, PortId},
    foundation::error::{ChainError, ChainResult},
    graph::state::Graph,
};

/// Current project file version.
pub const PROJECT_VERSION: u32 = 1;

fn default_version() -> u32 {
    PROJECT_VERSION
}

/// On-disk project document.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Source image of the Input node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Nodes keyed by display label.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

/// One node entry of a project file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeRecord {
    /// Kind name; inferred from the key when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub pos: [f64; 2],
    #[serde(default)]
    pub settings: BTreeMap<String, ParamValue>,
}

/// Output-to-input connection between two node keys.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
}

/// What [`ProjectFile::apply`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// File key to runtime id for every node that was placed.
    pub remap: BTreeMap<String, NodeId>,
    /// Keys whose kind could not be determined.
    pub skipped_nodes: Vec<String>,
    /// Number of links that were connected.
    pub links: usize,
    /// Links dropped because an endpoint was missing or invalid.
    pub dropped_links: usize,
}

impl ProjectFile {
    /// Describe the current graph.
    pub fn capture(graph: &Graph, image: Option<PathBuf>) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| {
                (
                    n.label.clone(),
                    NodeRecord {
                        kind: Some(n.kind.name.clone()),
                        pos: [n.position.x, n.position.y],
                        settings: n
                            .params
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.clone()))
                            .collect(),
                    },
                )
            })
            .collect();

        let label = |id: NodeId| {
            graph
                .nodes()
                .get(id)
                .map(|n| n.label.clone())
                .unwrap_or_else(|_| id.to_string())
        };
        let links = graph
            .links()
            .iter()
            .map(|l| LinkRecord {
                source: label(l.source.node),
                target: label(l.target.node),
            })
            .collect();

        Self {
            version: PROJECT_VERSION,
            image,
            nodes,
            links,
        }
    }

    /// Parse a project document.
    pub fn from_json(text: &str) -> ChainResult<Self> {
        let file: Self =
            serde_json::from_str(text).map_err(|e| ChainError::serde(e.to_string()))?;
        if file.version > PROJECT_VERSION {
            return Err(ChainError::validation(format!(
                "project version {} is newer than supported version {PROJECT_VERSION}",
                file.version
            )));
        }
        Ok(file)
    }

    /// Pretty-printed JSON text.
    pub fn to_json(&self) -> ChainResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ChainError::serde(e.to_string()))
    }

    /// Read and parse a project file.
    pub fn read(path: &Path) -> ChainResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Serialize to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> ChainResult<()> {
        let text = self.to_json()?;
        std::fs::write(path, text)
            .with_context(|| format!("write project '{}'", path.display()))?;
        Ok(())
    }

    /// Image path resolved against the directory of the project file.
    pub fn image_path(&self, project: &Path) -> Option<PathBuf> {
        let image = self.image.as_ref()?;
        if image.is_absolute() {
            return Some(image.clone());
        }
        let base = project.parent().unwrap_or_else(|| Path::new(""));
        Some(base.join(image))
    }

    /// Recreate the document's nodes and links in `graph`.
    ///
    /// `graph` is expected to hold only Input and Output; their entries update the existing
    /// instances. Nodes are placed first, then links are connected through the key remap
    /// table. Unknown kinds and settings are skipped, and so are links whose endpoints are
    /// missing.
    pub fn apply(
        &self,
        catalog: &Catalog,
        graph: &mut Graph,
        input: ImageSize,
    ) -> ChainResult<LoadReport> {
        let mut report = LoadReport::default();

        for (key, record) in &self.nodes {
            let kind = match &record.kind {
                Some(name) => catalog.get(name).ok(),
                None => catalog.infer_from_key(key),
            };
            let Some(kind) = kind else {
                tracing::warn!(node = %key, kind = ?record.kind, "unknown node kind, skipping");
                report.skipped_nodes.push(key.clone());
                continue;
            };

            let position = Point::new(record.pos[0], record.pos[1]);
            let id = match kind.role {
                KindRole::Input => graph.nodes.input(),
                KindRole::Output => graph.nodes.output(),
                KindRole::Transform => {
                    let params = kind.default_params(input);
                    graph.nodes.create(kind.clone(), params, position)
                }
            };
            graph.nodes.get_mut(id)?.position = position;

            for (param, value) in &record.settings {
                let Some(spec) = kind.param_spec(param) else {
                    tracing::warn!(node = %key, %param, "unknown setting, ignoring");
                    continue;
                };
                match spec.coerce(value.clone()) {
                    Ok(value) => {
                        graph.replace_param(id, param, value)?;
                    }
                    Err(err) => {
                        tracing::warn!(node = %key, %param, %err, "invalid setting, keeping default");
                    }
                }
            }
            report.remap.insert(key.clone(), id);
        }

        let remap: HashMap<&str, NodeId> = report
            .remap
            .iter()
            .map(|(k, &id)| (k.as_str(), id))
            .collect();
        for record in &self.links {
            let (Some(&source), Some(&target)) = (
                remap.get(record.source.as_str()),
                remap.get(record.target.as_str()),
            ) else {
                tracing::warn!(source = %record.source, target = %record.target, "link endpoint missing, dropping link");
                report.dropped_links += 1;
                continue;
            };
            match graph.connect(PortId::output(source), PortId::input(target)) {
                Ok(_) => report.links += 1,
                Err(err) => {
                    tracing::warn!(source = %record.source, target = %record.target, %err, "invalid link, dropping");
                    report.dropped_links += 1;
                }
            }
        }

        tracing::debug!(
            nodes = report.remap.len(),
            links = report.links,
            skipped = report.skipped_nodes.len(),
            dropped = report.dropped_links,
            "applied project"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/file.rs"]
mod tests;
