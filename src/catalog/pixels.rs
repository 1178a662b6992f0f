//! Pixel kernels behind the built-in transforms.
//!
//! All functions take the source image by reference and return a fresh image; nothing is
//! modified in place.

use anyhow::bail;
use image::{Rgba, RgbaImage, imageops};
use kurbo::{Affine, Point, Rect};

/// Separable gaussian blur over straight RGBA8.
///
/// Taps are fixed-point with 16 fractional bits so results are bit-identical across
/// platforms. Samples beyond the border repeat the edge pixel.
pub fn blur_rgba8(src: &RgbaImage, radius: u32, sigma: f32) -> anyhow::Result<RgbaImage> {
    let (width, height) = src.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return Ok(src.clone());
    }

    let taps = gaussian_taps(radius, sigma)?;
    let rows = convolve(src, &taps, Axis::Row);
    Ok(convolve(&rows, &taps, Axis::Column))
}

const ONE: u64 = 1 << 16;

/// Normalized gaussian weights for offsets `-radius..=radius`, summing to exactly [`ONE`].
fn gaussian_taps(radius: u32, sigma: f32) -> anyhow::Result<Vec<u64>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        bail!("blur sigma must be > 0");
    }
    let two_var = 2.0 * f64::from(sigma).powi(2);
    let r = i64::from(radius);
    let bell: Vec<f64> = (-r..=r)
        .map(|offset| (-((offset * offset) as f64) / two_var).exp())
        .collect();
    let total: f64 = bell.iter().sum();

    let mut taps: Vec<u64> = bell
        .iter()
        .map(|w| (w / total * ONE as f64).round() as u64)
        .collect();
    // Rounding drift goes to the center tap, which is always the largest.
    let drift = ONE as i64 - taps.iter().sum::<u64>() as i64;
    let center = &mut taps[radius as usize];
    *center = (*center as i64 + drift).max(0) as u64;
    Ok(taps)
}

#[derive(Clone, Copy)]
enum Axis {
    Row,
    Column,
}

/// One 1-D pass of `taps` along `axis`.
fn convolve(src: &RgbaImage, taps: &[u64], axis: Axis) -> RgbaImage {
    let (width, height) = src.dimensions();
    let reach = (taps.len() / 2) as i64;
    let clamp = |v: i64, len: u32| v.clamp(0, i64::from(len) - 1) as u32;

    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0u64; 4];
        for (i, &tap) in taps.iter().enumerate() {
            let offset = i as i64 - reach;
            let sample = match axis {
                Axis::Row => src.get_pixel(clamp(i64::from(x) + offset, width), y),
                Axis::Column => src.get_pixel(x, clamp(i64::from(y) + offset, height)),
            };
            for (sum, &channel) in acc.iter_mut().zip(sample.0.iter()) {
                *sum += tap * u64::from(channel);
            }
        }
        Rgba(acc.map(|sum| ((sum + ONE / 2) >> 16).min(255) as u8))
    })
}

/// Blend every RGB channel between `degenerate` and the source by `factor`.
///
/// `factor == 1.0` is the identity, `0.0` yields the degenerate image, values above one
/// extrapolate. Alpha is carried over from the source.
fn enhance_with(
    src: &RgbaImage,
    factor: f32,
    degenerate: impl Fn(u32, u32) -> [u8; 3],
) -> RgbaImage {
    let mut out = src.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let base = degenerate(x, y);
        for c in 0..3 {
            let d = f32::from(base[c]);
            let s = f32::from(px.0[c]);
            px.0[c] = (d + (s - d) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Scale brightness; the degenerate image is black.
pub fn enhance_brightness(src: &RgbaImage, factor: f32) -> RgbaImage {
    enhance_with(src, factor, |_, _| [0, 0, 0])
}

/// Scale contrast around the image's mean luma.
pub fn enhance_contrast(src: &RgbaImage, factor: f32) -> RgbaImage {
    let pixels = u64::from(src.width()) * u64::from(src.height());
    if pixels == 0 {
        return src.clone();
    }
    let luma_sum: u64 = src.pixels().map(|px| u64::from(luma(px))).sum();
    let mean = ((luma_sum as f64 / pixels as f64) + 0.5).floor() as u8;
    enhance_with(src, factor, |_, _| [mean, mean, mean])
}

/// Scale sharpness against a 3x3 smoothed copy; border pixels keep their value.
pub fn enhance_sharpness(src: &RgbaImage, factor: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if w < 3 || h < 3 {
        return src.clone();
    }
    // Same weights as a classic "smooth" filter: center 5, neighbours 1, divisor 13.
    let smooth = |x: u32, y: u32| -> [u8; 3] {
        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
            let p = src.get_pixel(x, y).0;
            return [p[0], p[1], p[2]];
        }
        let mut acc = [0u32; 3];
        for dy in 0..3 {
            for dx in 0..3 {
                let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                let p = src.get_pixel(x + dx - 1, y + dy - 1).0;
                for c in 0..3 {
                    acc[c] += weight * u32::from(p[c]);
                }
            }
        }
        acc.map(|v| ((v + 6) / 13) as u8)
    };
    enhance_with(src, factor, smooth)
}

fn luma(px: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = px.0;
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}

/// Replace the alpha channel with a constant.
pub fn set_alpha(src: &RgbaImage, alpha: u8) -> RgbaImage {
    let mut out = src.clone();
    for px in out.pixels_mut() {
        px.0[3] = alpha;
    }
    out
}

/// Rotate counter-clockwise by `degrees` about the image center.
///
/// The canvas grows to the rotated bounding box; uncovered pixels are transparent.
/// Quarter turns are exact; other angles use nearest-neighbour sampling.
pub fn rotate_expand(src: &RgbaImage, degrees: f64) -> anyhow::Result<RgbaImage> {
    if !degrees.is_finite() {
        bail!("rotation angle must be finite");
    }
    let turns = degrees.rem_euclid(360.0);
    if turns == 0.0 {
        return Ok(src.clone());
    }
    if turns == 90.0 {
        return Ok(imageops::rotate270(src));
    }
    if turns == 180.0 {
        return Ok(imageops::rotate180(src));
    }
    if turns == 270.0 {
        return Ok(imageops::rotate90(src));
    }

    let (w, h) = src.dimensions();
    let src_rect = Rect::new(0.0, 0.0, f64::from(w), f64::from(h));
    // Image space is y-down, so a visual counter-clockwise turn is a negative angle.
    let spin = Affine::rotate_about(-turns.to_radians(), src_rect.center());
    let bbox = spin.transform_rect_bbox(src_rect);
    let out_w = bbox.width().round().max(1.0) as u32;
    let out_h = bbox.height().round().max(1.0) as u32;

    let to_output = Affine::translate((-bbox.x0, -bbox.y0)) * spin;
    let to_source = to_output.inverse();

    let mut out = RgbaImage::new(out_w, out_h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let p = to_source * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
        let (sx, sy) = (p.x.floor(), p.y.floor());
        if sx >= 0.0 && sy >= 0.0 && sx < f64::from(w) && sy < f64::from(h) {
            *px = *src.get_pixel(sx as u32, sy as u32);
        }
    }
    Ok(out)
}

/// Crop to `[left, right) x [top, bottom)`, clamped to the image bounds.
pub fn crop_clamped(
    src: &RgbaImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
) -> anyhow::Result<RgbaImage> {
    let (w, h) = src.dimensions();
    let clamp_x = |v: i64| v.clamp(0, i64::from(w)) as u32;
    let clamp_y = |v: i64| v.clamp(0, i64::from(h)) as u32;
    let (x0, x1) = (clamp_x(left), clamp_x(right));
    let (y0, y1) = (clamp_y(top), clamp_y(bottom));
    if x1 <= x0 || y1 <= y0 {
        bail!("crop rectangle ({left}, {top}, {right}, {bottom}) is empty for a {w}x{h} image");
    }
    Ok(imageops::crop_imm(src, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Fit `src` into a `max_px` square, keeping aspect ratio. Never upscales.
pub fn thumbnail(src: &RgbaImage, max_px: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if w <= max_px && h <= max_px {
        return src.clone();
    }
    let scale = f64::from(max_px) / f64::from(w.max(h));
    let tw = ((f64::from(w) * scale).round() as u32).max(1);
    let th = ((f64::from(h) * scale).round() as u32).max(1);
    imageops::thumbnail(src, tw, th)
}

#[cfg(test)]
#[path = "../../tests/unit/catalog/pixels.rs"]
mod tests;
