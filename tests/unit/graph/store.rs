use super::*;
use crate::catalog::kind::Catalog;

fn store_with(catalog: &Catalog) -> NodeStore {
    NodeStore::new(catalog.input_kind(), catalog.output_kind()).unwrap()
}

#[test]
fn new_store_holds_input_and_output() {
    let catalog = Catalog::builtin();
    let store = store_with(&catalog);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(store.input()).unwrap().label, "input_0");
    assert_eq!(store.get(store.output()).unwrap().label, "output_0");
    assert_ne!(store.input(), store.output());
}

#[test]
fn labels_count_per_kind_and_are_never_reused() {
    let catalog = Catalog::builtin();
    let mut store = store_with(&catalog);
    let blur = catalog.get("Blur").unwrap();
    let crop = catalog.get("Crop").unwrap();

    let a = store.create(blur.clone(), Params::default(), Point::ZERO);
    let b = store.create(crop, Params::default(), Point::ZERO);
    assert_eq!(store.get(a).unwrap().label, "blur_0");
    assert_eq!(store.get(b).unwrap().label, "crop_0");

    store.destroy(a).unwrap();
    let c = store.create(blur, Params::default(), Point::ZERO);
    assert_eq!(store.get(c).unwrap().label, "blur_1");
    assert!(c > a);
}

#[test]
fn protected_nodes_cannot_be_destroyed() {
    let catalog = Catalog::builtin();
    let mut store = store_with(&catalog);
    let input = store.input();
    assert!(matches!(
        store.destroy(input),
        Err(ChainError::ProtectedNode(_))
    ));
    assert_eq!(store.len(), 2);
    assert!(matches!(
        store.destroy(NodeId(99)),
        Err(ChainError::NotFound(_))
    ));
}

fn keep(image: &image::RgbaImage, _: &Params) -> anyhow::Result<image::RgbaImage> {
    Ok(image.clone())
}

#[test]
fn replay_removal_ignores_protection_but_not_endpoints() {
    let catalog = Catalog::builtin();
    let mut store = store_with(&catalog);
    let kind = Arc::new(NodeKind::transform("Watermark", "", Vec::new(), keep).into_plugin(true));
    let id = store.create(kind, Params::default(), Point::ZERO);

    assert!(matches!(
        store.destroy(id),
        Err(ChainError::ProtectedNode(_))
    ));
    assert_eq!(store.remove_for_replay(id).unwrap().label, "watermark_0");
    assert!(!store.contains(id));

    for endpoint in [store.input(), store.output()] {
        assert!(matches!(
            store.remove_for_replay(endpoint),
            Err(ChainError::HistoryReplay(_))
        ));
    }
    assert!(matches!(
        store.remove_for_replay(id),
        Err(ChainError::HistoryReplay(_))
    ));
    assert_eq!(store.len(), 2);
}

#[test]
fn restore_reinserts_verbatim_and_rejects_live_ids() {
    let catalog = Catalog::builtin();
    let mut store = store_with(&catalog);
    let id = store.create(
        catalog.get("Rotate").unwrap(),
        Params::default(),
        Point::new(3.0, 4.0),
    );
    let snapshot = store.get(id).unwrap().snapshot();
    assert!(matches!(
        store.restore(snapshot.clone()),
        Err(ChainError::HistoryReplay(_))
    ));

    store.destroy(id).unwrap();
    store.restore(snapshot.clone()).unwrap();
    assert_eq!(store.get(id).unwrap().snapshot(), snapshot);
    assert_eq!(store.find_by_label("rotate_0").unwrap().id, id);
}
