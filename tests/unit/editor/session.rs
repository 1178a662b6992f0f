use super::*;
use image::Rgba;

fn editor() -> Editor {
    Editor::with_builtin(RgbaImage::from_pixel(40, 30, Rgba([120, 60, 30, 255]))).unwrap()
}

#[test]
fn new_session_renders_placeholder() {
    let ed = editor();
    let out = ed.output().unwrap();
    assert!(!out.complete);
    assert_eq!(out.image.dimensions(), (40, 30));
    assert!(ed.history().is_empty());
    assert_eq!(ed.nodes().len(), 2);
}

#[test]
fn endpoints_cannot_be_added_deleted_or_duplicated() {
    let mut ed = editor();
    assert!(matches!(ed.add_node("Input"), Err(ChainError::Validation(_))));
    let input = ed.input_node();
    let output = ed.output_node();
    assert!(matches!(ed.delete_node(input), Err(ChainError::ProtectedNode(_))));
    assert!(matches!(ed.delete_node(output), Err(ChainError::ProtectedNode(_))));
    assert!(matches!(ed.duplicate_node(output), Err(ChainError::ProtectedNode(_))));
    assert!(ed.history().is_empty());
    assert_eq!(ed.nodes().len(), 2);
}

#[test]
fn new_nodes_get_distinct_positions() {
    let mut ed = editor();
    let a = ed.add_node("Blur").unwrap();
    let b = ed.add_node("Blur").unwrap();
    assert_ne!(ed.node(a).unwrap().position, ed.node(b).unwrap().position);
}

#[test]
fn duplicate_copies_params_and_offsets_position() {
    let mut ed = editor();
    let blur = ed.add_node("Blur").unwrap();
    ed.set_parameter(blur, "radius", 12).unwrap();
    let copy = ed.duplicate_node(blur).unwrap();

    let (src, dup) = (ed.node(blur).unwrap(), ed.node(copy).unwrap());
    assert_eq!(dup.params, src.params);
    assert_eq!(dup.label, "blur_1");
    assert_eq!(dup.position, src.position + Vec2::new(20.0, 20.0));
    assert!(ed.links().is_empty());
    assert_eq!(ed.history().entries().last().unwrap().action.name(), "new");
}

#[test]
fn set_parameter_validates_against_schema() {
    let mut ed = editor();
    let flip = ed.add_node("Flip").unwrap();
    assert!(matches!(
        ed.set_parameter(flip, "angle", 3),
        Err(ChainError::UnknownParameter { .. })
    ));
    assert!(matches!(
        ed.set_parameter(flip, "mode", 3),
        Err(ChainError::Validation(_))
    ));
    assert!(matches!(
        ed.set_parameter(NodeId(999), "mode", "Vertical"),
        Err(ChainError::NotFound(_))
    ));
    let recorded = ed.history().len();
    ed.set_parameter(flip, "mode", "Horizontal").unwrap();
    assert_eq!(ed.history().len(), recorded);

    let opacity = ed.add_node("Opacity").unwrap();
    ed.set_parameter(opacity, "percent", 400).unwrap();
    assert_eq!(
        ed.node(opacity).unwrap().params.get("percent"),
        Some(&ParamValue::Int(100))
    );
}

#[test]
fn connect_rejects_missing_ports() {
    let mut ed = editor();
    let input = ed.input_node();
    let output = ed.output_node();
    assert!(matches!(
        ed.connect(PortId::output(output), PortId::input(input)),
        Err(ChainError::Validation(_))
    ));
    assert!(ed.connect_nodes(input, NodeId(77)).is_err());
    assert!(ed.history().is_empty());
}

#[test]
fn disconnect_unknown_link_is_a_noop() {
    let mut ed = editor();
    ed.disconnect(LinkId(5)).unwrap();
    assert!(ed.history().is_empty());

    let input = ed.input_node();
    let output = ed.output_node();
    let link = ed.connect_nodes(input, output).unwrap();
    ed.disconnect(link).unwrap();
    ed.disconnect(link).unwrap();
    let names: Vec<_> = ed.history().entries().iter().map(|e| e.action.name()).collect();
    assert_eq!(names, ["link_create", "link_delete"]);
}

#[test]
fn failed_render_keeps_mutation_and_previous_output() {
    let mut ed = editor();
    let crop = ed.add_node("Crop").unwrap();
    let (input, output) = (ed.input_node(), ed.output_node());
    ed.connect_nodes(input, crop).unwrap();
    ed.connect_nodes(crop, output).unwrap();
    ed.set_parameter(crop, "left", 39).unwrap();
    let good = ed.output().unwrap().clone();
    assert!(good.complete);
    assert_eq!(good.image.dimensions(), (1, 30));

    ed.set_parameter(crop, "right", 1).unwrap();
    assert_eq!(
        ed.node(crop).unwrap().params.get("right"),
        Some(&ParamValue::Int(1))
    );
    assert!(ed.render_error().unwrap().contains("crop_0"));
    assert_eq!(ed.output().unwrap().image, good.image);
    assert!(matches!(ed.recompute(), Err(ChainError::Transform { .. })));

    ed.undo().unwrap();
    assert!(ed.render_error().is_none());
}

#[test]
fn manual_rendering_discards_stale_jobs() {
    let mut ed = editor();
    ed.set_auto_render(false);
    let (input, output) = (ed.input_node(), ed.output_node());
    let job = ed.begin_render().unwrap();
    ed.connect_nodes(input, output).unwrap();
    assert!(job.is_stale());

    let stale = job.run().unwrap();
    assert!(stale.is_none());

    let fresh = ed.begin_render().unwrap();
    let rendered = std::thread::spawn(move || fresh.run())
        .join()
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(ed.complete_render(rendered));
    assert!(ed.output().unwrap().complete);
}

#[test]
fn save_without_path_needs_a_known_project() {
    let mut ed = editor();
    assert!(matches!(ed.save(None), Err(ChainError::Validation(_))));
}

#[test]
fn export_requires_complete_chain() {
    let ed = editor();
    let path = std::env::temp_dir().join("imgchain_never_written.png");
    assert!(matches!(ed.export(&path), Err(ChainError::Validation(_))));
}

#[test]
fn reset_keeps_endpoints_and_counters() {
    let mut ed = editor();
    let blur = ed.add_node("Blur").unwrap();
    let input = ed.input_node();
    ed.connect_nodes(input, blur).unwrap();

    ed.reset_project();
    assert_eq!(ed.nodes().len(), 2);
    assert!(ed.links().is_empty());
    assert!(ed.history().is_empty());
    assert!(!ed.undo().unwrap());

    let again = ed.add_node("Blur").unwrap();
    assert!(again > blur);
    assert_eq!(ed.node(again).unwrap().label, "blur_1");
}
