use super::*;
use crate::{
    catalog::kind::Catalog,
    foundation::core::{Point, PortId},
    graph::{state::Graph, store::NodeStore},
};

fn graph() -> (Catalog, Graph) {
    let catalog = Catalog::builtin();
    let nodes = NodeStore::new(catalog.input_kind(), catalog.output_kind()).unwrap();
    (catalog, Graph::new(nodes))
}

fn add(catalog: &Catalog, graph: &mut Graph, history: &mut History, kind: &str) -> NodeId {
    let kind = catalog.get(kind).unwrap();
    let params = kind.default_params(crate::foundation::core::ImageSize {
        width: 10,
        height: 10,
    });
    let id = graph.nodes.create(kind, params, Point::new(1.0, 2.0));
    history.record(HistoryEntry::node_created(
        graph.nodes().get(id).unwrap().snapshot(),
    ));
    id
}

fn link(graph: &mut Graph, history: &mut History, from: NodeId, to: NodeId) -> Link {
    let connected = graph
        .connect(PortId::output(from), PortId::input(to))
        .unwrap();
    if let Some(old) = connected.replaced {
        history.record(HistoryEntry::link_deleted(old));
    }
    history.record(HistoryEntry::link_created(connected.link));
    connected.link
}

fn set(graph: &mut Graph, history: &mut History, id: NodeId, key: &str, value: ParamValue) {
    let label = graph.nodes().get(id).unwrap().label.clone();
    let old = graph.replace_param(id, key, value.clone()).unwrap();
    history.record(HistoryEntry::param_updated(&label, id, key, old, value));
}

#[test]
fn empty_history_undo_and_redo_are_noops() {
    let (_, mut g) = graph();
    let mut history = History::default();
    assert!(!history.undo(&mut g).unwrap());
    assert!(!history.redo(&mut g).unwrap());
    assert_eq!(history.cursor(), None);
}

#[test]
fn undo_new_records_final_position_for_redo() {
    let (catalog, mut g) = graph();
    let mut history = History::default();
    let id = add(&catalog, &mut g, &mut history, "Blur");
    g.nodes.get_mut(id).unwrap().position = Point::new(50.0, 60.0);

    assert!(history.undo(&mut g).unwrap());
    assert!(!g.nodes().contains(id));
    assert!(history.redo(&mut g).unwrap());
    let node = g.nodes().get(id).unwrap();
    assert_eq!(node.position, Point::new(50.0, 60.0));
    assert_eq!(node.label, "blur_0");
}

#[test]
fn delete_undo_restores_cascaded_links() {
    let (catalog, mut g) = graph();
    let mut history = History::default();
    let input = g.nodes().input();
    let output = g.nodes().output();
    let blur = add(&catalog, &mut g, &mut history, "Blur");
    link(&mut g, &mut history, input, blur);
    link(&mut g, &mut history, blur, output);

    let snapshot = g.nodes().get(blur).unwrap().snapshot();
    let (_, links) = g.delete_node(blur).unwrap();
    assert_eq!(links.len(), 2);
    history.record(HistoryEntry::node_deleted(snapshot, links));
    assert!(g.links().is_empty());

    assert!(history.undo(&mut g).unwrap());
    assert_eq!(g.links().len(), 2);
    assert!(g.resolve().complete);

    assert!(history.redo(&mut g).unwrap());
    assert!(g.links().is_empty());
    assert!(!g.resolve().complete);
}

#[test]
fn replaced_link_is_recorded_before_new_link() {
    let (catalog, mut g) = graph();
    let mut history = History::default();
    let input = g.nodes().input();
    let a = add(&catalog, &mut g, &mut history, "Blur");
    let b = add(&catalog, &mut g, &mut history, "Flip");
    let first = link(&mut g, &mut history, input, a);
    let second = link(&mut g, &mut history, input, b);

    let names: Vec<_> = history.entries().iter().map(|e| e.action.name()).collect();
    assert_eq!(names, ["new", "new", "link_create", "link_delete", "link_create"]);

    history.undo(&mut g).unwrap();
    history.undo(&mut g).unwrap();
    assert_eq!(g.links().from_source(PortId::output(input)), Some(&first));
    history.redo(&mut g).unwrap();
    history.redo(&mut g).unwrap();
    assert_eq!(g.links().from_source(PortId::output(input)), Some(&second));
}

#[test]
fn new_record_after_undo_truncates_redo_branch() {
    let (catalog, mut g) = graph();
    let mut history = History::default();
    let id = add(&catalog, &mut g, &mut history, "Opacity");
    set(&mut g, &mut history, id, "percent", ParamValue::Int(10));
    set(&mut g, &mut history, id, "percent", ParamValue::Int(20));

    history.undo(&mut g).unwrap();
    assert!(history.can_redo());
    set(&mut g, &mut history, id, "percent", ParamValue::Int(30));
    assert_eq!(history.len(), 3);
    assert!(!history.can_redo());
    assert!(!history.redo(&mut g).unwrap());

    history.undo(&mut g).unwrap();
    assert_eq!(
        g.nodes().get(id).unwrap().params.get("percent"),
        Some(&ParamValue::Int(10))
    );
}

#[test]
fn coalescing_merges_consecutive_updates_of_one_key() {
    let (catalog, mut g) = graph();
    let mut history = History::new(HistoryOpts {
        coalesce_param_updates: true,
        limit: None,
    });
    let id = add(&catalog, &mut g, &mut history, "Opacity");
    for v in [90, 80, 70] {
        set(&mut g, &mut history, id, "percent", ParamValue::Int(v));
    }
    assert_eq!(history.len(), 2);

    history.undo(&mut g).unwrap();
    assert_eq!(
        g.nodes().get(id).unwrap().params.get("percent"),
        Some(&ParamValue::Int(100))
    );
    history.redo(&mut g).unwrap();
    assert_eq!(
        g.nodes().get(id).unwrap().params.get("percent"),
        Some(&ParamValue::Int(70))
    );
}

#[test]
fn coalesced_round_trip_leaves_no_entry() {
    let (catalog, mut g) = graph();
    let mut history = History::new(HistoryOpts {
        coalesce_param_updates: true,
        limit: None,
    });
    let id = add(&catalog, &mut g, &mut history, "Rotate");
    set(&mut g, &mut history, id, "angle", ParamValue::Float(90.0));
    set(&mut g, &mut history, id, "angle", ParamValue::Float(0.0));
    assert_eq!(history.len(), 1);
    assert_eq!(history.cursor(), Some(0));
    assert!(!history.can_redo());

    // The next undo reaches the add itself.
    assert!(history.undo(&mut g).unwrap());
    assert!(!g.nodes().contains(id));
    assert!(!history.can_undo());
}

#[test]
fn limit_drops_oldest_entries() {
    let (catalog, mut g) = graph();
    let mut history = History::new(HistoryOpts {
        coalesce_param_updates: false,
        limit: Some(2),
    });
    for _ in 0..4 {
        add(&catalog, &mut g, &mut history, "Flip");
    }
    assert_eq!(history.len(), 2);
    assert_eq!(history.cursor(), Some(1));
    assert_eq!(history.entries()[0].tag, "flip_2");
}

#[test]
fn diverged_state_snaps_cursor_to_end() {
    let (catalog, mut g) = graph();
    let mut history = History::default();
    let a = add(&catalog, &mut g, &mut history, "Blur");
    add(&catalog, &mut g, &mut history, "Flip");
    history.undo(&mut g).unwrap();

    // Out-of-band removal the log knows nothing about.
    g.delete_node(a).unwrap();
    let err = history.undo(&mut g).unwrap_err();
    assert!(matches!(err, ChainError::HistoryReplay(_)));
    assert_eq!(history.cursor(), Some(1));
    assert!(!history.can_redo());
}
