use anyhow::{Context as _, bail};
use image::{RgbaImage, imageops};

use crate::catalog::{
    kind::{Catalog, NodeKind},
    params::{ParamDefault, ParamSpec, ParamValue, Params},
    pixels,
};

/// Percent value that maps to an enhancement factor of 1.0.
const ENHANCE_NEUTRAL_PERCENT: i64 = 25;
/// Blur strength divisor: `sigma = strength / BLUR_STRENGTH_PER_SIGMA`.
const BLUR_STRENGTH_PER_SIGMA: f32 = 65.0;

impl Catalog {
    /// Catalog with Input, Output and every built-in transform kind.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for kind in builtin_kinds() {
            // Built-in names are distinct and well-formed.
            if let Err(err) = catalog.register(kind) {
                tracing::error!(%err, "failed to register built-in kind");
            }
        }
        catalog
    }
}

fn builtin_kinds() -> Vec<NodeKind> {
    vec![
        NodeKind::transform(
            "Resize",
            "Resize the image to an exact width and height",
            vec![
                ParamSpec::int_from_input("width", ParamDefault::InputWidth, 1),
                ParamSpec::int_from_input("height", ParamDefault::InputHeight, 1),
            ],
            resize,
        ),
        NodeKind::transform(
            "Rotate",
            "Rotate the image counter-clockwise, growing the canvas",
            vec![ParamSpec::float("angle", 0.0, 0.0, 360.0)],
            rotate,
        ),
        NodeKind::transform(
            "Blur",
            "Gaussian blur",
            vec![ParamSpec::int("radius", 0, 0, 500)],
            blur,
        ),
        NodeKind::transform(
            "Brightness",
            "Adjust brightness (25% leaves the image unchanged)",
            vec![percent_param(ENHANCE_NEUTRAL_PERCENT)],
            brightness,
        ),
        NodeKind::transform(
            "Contrast",
            "Adjust contrast (25% leaves the image unchanged)",
            vec![percent_param(ENHANCE_NEUTRAL_PERCENT)],
            contrast,
        ),
        NodeKind::transform(
            "Sharpness",
            "Adjust sharpness (25% leaves the image unchanged)",
            vec![percent_param(ENHANCE_NEUTRAL_PERCENT)],
            sharpness,
        ),
        NodeKind::transform(
            "Opacity",
            "Set a uniform alpha channel",
            vec![percent_param(100)],
            opacity,
        ),
        NodeKind::transform(
            "Crop",
            "Keep the rectangle [left, right) x [top, bottom)",
            vec![
                ParamSpec::int_from_input("left", ParamDefault::Value(ParamValue::Int(0)), 0),
                ParamSpec::int_from_input("top", ParamDefault::Value(ParamValue::Int(0)), 0),
                ParamSpec::int_from_input("right", ParamDefault::InputWidth, 1),
                ParamSpec::int_from_input("bottom", ParamDefault::InputHeight, 1),
            ],
            crop,
        ),
        NodeKind::transform(
            "Flip",
            "Mirror the image",
            vec![ParamSpec::choice(
                "mode",
                &["Horizontal", "Vertical", "Diagonal"],
            )],
            flip,
        ),
    ]
}

fn percent_param(default: i64) -> ParamSpec {
    ParamSpec::int("percent", default, 0, 100)
}

fn enhance_factor(params: &Params) -> anyhow::Result<f32> {
    Ok(params.int("percent")? as f32 / ENHANCE_NEUTRAL_PERCENT as f32)
}

fn dimension(params: &Params, key: &str) -> anyhow::Result<u32> {
    let v = params.int(key)?;
    if v <= 0 {
        bail!("{key} must be positive, got {v}");
    }
    u32::try_from(v).with_context(|| format!("{key} {v} is too large"))
}

fn resize(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    let width = dimension(params, "width")?;
    let height = dimension(params, "height")?;
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    Ok(imageops::resize(
        image,
        width,
        height,
        imageops::FilterType::CatmullRom,
    ))
}

fn rotate(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    pixels::rotate_expand(image, params.number("angle")?)
}

fn blur(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    let strength = params.int("radius")?;
    if strength <= 0 {
        return Ok(image.clone());
    }
    let sigma = strength as f32 / BLUR_STRENGTH_PER_SIGMA;
    let radius = (3.0 * sigma).ceil() as u32;
    pixels::blur_rgba8(image, radius, sigma)
}

fn brightness(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    Ok(pixels::enhance_brightness(image, enhance_factor(params)?))
}

fn contrast(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    Ok(pixels::enhance_contrast(image, enhance_factor(params)?))
}

fn sharpness(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    Ok(pixels::enhance_sharpness(image, enhance_factor(params)?))
}

fn opacity(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    let percent = params.int("percent")?.clamp(0, 100);
    Ok(pixels::set_alpha(image, (percent * 255 / 100) as u8))
}

fn crop(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    pixels::crop_clamped(
        image,
        params.int("left")?,
        params.int("top")?,
        params.int("right")?,
        params.int("bottom")?,
    )
}

fn flip(image: &RgbaImage, params: &Params) -> anyhow::Result<RgbaImage> {
    match params.text("mode")? {
        "Horizontal" => Ok(imageops::flip_horizontal(image)),
        "Vertical" => Ok(imageops::flip_vertical(image)),
        "Diagonal" => Ok(imageops::flip_vertical(&imageops::flip_horizontal(image))),
        other => bail!("unknown flip mode '{other}'"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/builtin.rs"]
mod tests;
