use super::*;
use crate::foundation::core::ImageSize;
use image::Rgba;

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 20) as u8, (y * 30) as u8, 77, 255]))
}

fn defaults(catalog: &Catalog, kind: &str, image: &RgbaImage) -> Params {
    catalog.get(kind).unwrap().default_params(ImageSize::of(image))
}

#[test]
fn builtin_catalog_lists_every_kind() {
    let catalog = Catalog::builtin();
    let names: Vec<_> = catalog.kinds().map(|k| k.name.clone()).collect();
    assert_eq!(
        names,
        [
            "Input",
            "Output",
            "Resize",
            "Rotate",
            "Blur",
            "Brightness",
            "Contrast",
            "Sharpness",
            "Opacity",
            "Crop",
            "Flip"
        ]
    );
    assert!(catalog.kinds().skip(2).all(|k| !k.protected));
}

#[test]
fn default_parameters_leave_image_unchanged() {
    let catalog = Catalog::builtin();
    let src = gradient(8, 6);
    for name in [
        "Resize",
        "Rotate",
        "Blur",
        "Brightness",
        "Contrast",
        "Sharpness",
        "Opacity",
        "Crop",
    ] {
        let kind = catalog.get(name).unwrap();
        let out = kind.run(&src, &defaults(&catalog, name, &src)).unwrap();
        assert_eq!(out, src, "{name} with defaults should be the identity");
    }
}

#[test]
fn resize_to_exact_dimensions() {
    let catalog = Catalog::builtin();
    let src = gradient(50, 50);
    let params = Params::from_iter([
        ("width".to_string(), ParamValue::Int(20)),
        ("height".to_string(), ParamValue::Int(10)),
    ]);
    let out = catalog.get("Resize").unwrap().run(&src, &params).unwrap();
    assert_eq!(out.dimensions(), (20, 10));

    let zero = Params::from_iter([
        ("width".to_string(), ParamValue::Int(0)),
        ("height".to_string(), ParamValue::Int(10)),
    ]);
    assert!(catalog.get("Resize").unwrap().run(&src, &zero).is_err());
}

#[test]
fn opacity_maps_percent_to_alpha() {
    let catalog = Catalog::builtin();
    let src = gradient(3, 3);
    let params = Params::from_iter([("percent".to_string(), ParamValue::Int(50))]);
    let out = catalog.get("Opacity").unwrap().run(&src, &params).unwrap();
    assert!(out.pixels().all(|px| px.0[3] == 127));
}

#[test]
fn flip_modes() {
    let catalog = Catalog::builtin();
    let src = gradient(4, 3);
    let flip = catalog.get("Flip").unwrap();
    let run = |mode: &str| {
        let params = Params::from_iter([("mode".to_string(), ParamValue::from(mode))]);
        flip.run(&src, &params).unwrap()
    };
    assert_eq!(run("Horizontal").get_pixel(0, 0), src.get_pixel(3, 0));
    assert_eq!(run("Vertical").get_pixel(0, 0), src.get_pixel(0, 2));
    assert_eq!(run("Diagonal").get_pixel(0, 0), src.get_pixel(3, 2));
}

#[test]
fn crop_uses_input_sized_defaults() {
    let catalog = Catalog::builtin();
    let src = gradient(8, 6);
    let mut params = defaults(&catalog, "Crop", &src);
    assert_eq!(params.get("right"), Some(&ParamValue::Int(8)));
    assert_eq!(params.get("bottom"), Some(&ParamValue::Int(6)));
    params.replace("left", ParamValue::Int(2));
    params.replace("bottom", ParamValue::Int(3));
    let out = catalog.get("Crop").unwrap().run(&src, &params).unwrap();
    assert_eq!(out.dimensions(), (6, 3));
    assert_eq!(out.get_pixel(0, 0), src.get_pixel(2, 0));
}

#[test]
fn blur_strength_softens_edges() {
    let catalog = Catalog::builtin();
    let mut src = RgbaImage::from_pixel(9, 9, Rgba([0, 0, 0, 255]));
    src.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
    let params = Params::from_iter([("radius".to_string(), ParamValue::Int(130))]);
    let out = catalog.get("Blur").unwrap().run(&src, &params).unwrap();
    assert!(out.get_pixel(4, 4).0[0] < 255);
    assert!(out.get_pixel(5, 4).0[0] > 0);
}
