use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::error::{ChainError, ChainResult};

/// Decode any supported image format into straight RGBA8.
pub fn decode_image(bytes: &[u8]) -> ChainResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file.
pub fn read_image(path: &Path) -> ChainResult<RgbaImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Encode `image` with the format implied by the extension of `path`.
pub fn write_image(image: &RgbaImage, path: &Path) -> ChainResult<()> {
    let format = image::ImageFormat::from_path(path).map_err(|_| {
        ChainError::validation(format!(
            "cannot infer an image format from '{}'",
            path.display()
        ))
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory '{}'", parent.display()))?;
    }
    image
        .save_with_format(path, format)
        .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/project/image_io.rs"]
mod tests;
