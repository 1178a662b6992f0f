use super::*;
use crate::catalog::{kind::Catalog, params::Params};
use crate::foundation::core::Point;

fn setup() -> (Catalog, NodeStore, LinkTable) {
    let catalog = Catalog::builtin();
    let store = NodeStore::new(catalog.input_kind(), catalog.output_kind()).unwrap();
    (catalog, store, LinkTable::new())
}

#[test]
fn unlinked_graph_resolves_to_input_only() {
    let (_, store, links) = setup();
    let chain = resolve(&store, &links);
    assert_eq!(chain.nodes, vec![store.input()]);
    assert!(!chain.complete);
    assert!(chain.intermediate().is_empty());
}

#[test]
fn complete_chain_lists_nodes_in_order() {
    let (catalog, mut store, mut links) = setup();
    let a = store.create(catalog.get("Blur").unwrap(), Params::default(), Point::ZERO);
    let b = store.create(catalog.get("Flip").unwrap(), Params::default(), Point::ZERO);
    links
        .connect(PortId::output(store.input()), PortId::input(b))
        .unwrap();
    links.connect(PortId::output(a), PortId::input(store.output())).unwrap();
    links.connect(PortId::output(b), PortId::input(a)).unwrap();

    let chain = resolve(&store, &links);
    assert!(chain.complete);
    assert_eq!(chain.nodes, vec![store.input(), b, a, store.output()]);
    assert_eq!(chain.intermediate(), &[b, a]);
    assert_eq!(resolve(&store, &links), chain);
}

#[test]
fn dangling_chain_is_incomplete() {
    let (catalog, mut store, mut links) = setup();
    let a = store.create(catalog.get("Resize").unwrap(), Params::default(), Point::ZERO);
    links
        .connect(PortId::output(store.input()), PortId::input(a))
        .unwrap();
    let chain = resolve(&store, &links);
    assert_eq!(chain.nodes, vec![store.input(), a]);
    assert!(!chain.complete);
    assert!(chain.intermediate().is_empty());
}

#[test]
fn cycle_stops_the_walk() {
    let (catalog, mut store, mut links) = setup();
    let a = store.create(catalog.get("Blur").unwrap(), Params::default(), Point::ZERO);
    let b = store.create(catalog.get("Blur").unwrap(), Params::default(), Point::ZERO);
    links
        .connect(PortId::output(store.input()), PortId::input(a))
        .unwrap();
    links.connect(PortId::output(a), PortId::input(b)).unwrap();
    links.connect(PortId::output(b), PortId::input(a)).unwrap();

    let chain = resolve(&store, &links);
    assert_eq!(chain.nodes, vec![store.input(), a, b]);
    assert!(!chain.complete);
}
