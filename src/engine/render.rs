use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use image::RgbaImage;

use crate::{
    catalog::{kind::NodeKind, params::Params, pixels},
    foundation::core::ImageSize,
    foundation::error::{ChainError, ChainResult},
    graph::{resolve::Chain, store::NodeStore},
};

/// Result of one chain evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedOutput {
    /// Full-resolution result; transparent placeholder when the chain is incomplete.
    pub image: RgbaImage,
    /// Thumbnail of `image` for display.
    pub preview: RgbaImage,
    /// `"Image size: WxH"` when the result size differs from the Input size.
    pub size_label: Option<String>,
    /// Whether the chain reached the Output node.
    pub complete: bool,
    /// Engine generation the result was produced for.
    pub generation: u64,
}

impl RenderedOutput {
    /// Dimensions of the full-resolution result.
    pub fn size(&self) -> ImageSize {
        ImageSize::of(&self.image)
    }
}

/// One node of a snapshotted chain.
#[derive(Clone, Debug)]
struct ChainStep {
    label: String,
    kind: Arc<NodeKind>,
    params: Params,
}

/// Self-contained chain evaluation that can run off the editor's thread.
///
/// A job holds copies of everything it reads. It checks the shared generation counter
/// between nodes and gives up as soon as a newer edit has superseded it.
#[derive(Clone, Debug)]
pub struct RenderJob {
    generation: u64,
    current: Arc<AtomicU64>,
    input: Arc<RgbaImage>,
    steps: Vec<ChainStep>,
    complete: bool,
    preview_max_px: u32,
}

impl RenderJob {
    /// Generation the job renders for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an edit happened after the job was created.
    pub fn is_stale(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.generation
    }

    /// Evaluate the chain.
    ///
    /// Returns `Ok(None)` when the job was superseded before it finished.
    #[tracing::instrument(skip(self), fields(generation = self.generation, steps = self.steps.len()))]
    pub fn run(&self) -> ChainResult<Option<RenderedOutput>> {
        let input_size = ImageSize::of(&self.input);
        let image = if self.complete {
            let mut image = (*self.input).clone();
            for step in &self.steps {
                if self.is_stale() {
                    tracing::debug!(node = %step.label, "render superseded, stopping");
                    return Ok(None);
                }
                image = step
                    .kind
                    .run(&image, &step.params)
                    .map_err(|cause| ChainError::transform(step.label.clone(), cause))?;
            }
            image
        } else {
            placeholder(input_size)
        };
        if self.is_stale() {
            return Ok(None);
        }

        let size = ImageSize::of(&image);
        let size_label = (size != input_size).then(|| format!("Image size: {size}"));
        let preview = pixels::thumbnail(&image, self.preview_max_px);
        Ok(Some(RenderedOutput {
            image,
            preview,
            size_label,
            complete: self.complete,
            generation: self.generation,
        }))
    }
}

/// Transparent image shown while the chain does not reach Output.
pub fn placeholder(size: ImageSize) -> RgbaImage {
    RgbaImage::new(size.width, size.height)
}

/// Generation bookkeeping plus the last installed result.
#[derive(Debug)]
pub struct Engine {
    generation: Arc<AtomicU64>,
    output: Option<RenderedOutput>,
    preview_max_px: u32,
}

impl Engine {
    /// Engine with no rendered output yet.
    pub fn new(preview_max_px: u32) -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            output: None,
            preview_max_px,
        }
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every job created so far.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Snapshot `chain` into a job for a fresh generation.
    pub fn job(
        &self,
        chain: &Chain,
        nodes: &NodeStore,
        input: Arc<RgbaImage>,
    ) -> ChainResult<RenderJob> {
        let steps = chain
            .intermediate()
            .iter()
            .map(|&id| {
                let node = nodes.get(id)?;
                Ok(ChainStep {
                    label: node.label.clone(),
                    kind: node.kind.clone(),
                    params: node.params.clone(),
                })
            })
            .collect::<ChainResult<Vec<_>>>()?;
        let generation = self.bump();
        Ok(RenderJob {
            generation,
            current: self.generation.clone(),
            input,
            steps,
            complete: chain.complete,
            preview_max_px: self.preview_max_px,
        })
    }

    /// Install a finished result unless a newer generation exists.
    ///
    /// Returns whether the result was installed.
    pub fn install(&mut self, rendered: RenderedOutput) -> bool {
        let current = self.generation();
        if rendered.generation != current {
            tracing::debug!(
                stale = rendered.generation,
                current,
                "discarding stale render result"
            );
            return false;
        }
        self.output = Some(rendered);
        true
    }

    /// Last installed result.
    pub fn output(&self) -> Option<&RenderedOutput> {
        self.output.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/render.rs"]
mod tests;
