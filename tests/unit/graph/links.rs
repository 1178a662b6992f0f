use super::*;

fn out(n: u64) -> PortId {
    PortId::output(NodeId(n))
}

fn inp(n: u64) -> PortId {
    PortId::input(NodeId(n))
}

#[test]
fn connect_retires_previous_link_from_same_source() {
    let mut table = LinkTable::new();
    let first = table.connect(out(0), inp(1)).unwrap();
    assert_eq!(first.replaced, None);

    let second = table.connect(out(0), inp(2)).unwrap();
    assert_eq!(second.replaced, Some(first.link));
    assert_eq!(table.len(), 1);
    assert_eq!(table.from_source(out(0)).unwrap().target, inp(2));
    assert_ne!(first.link.id, second.link.id);
}

#[test]
fn targets_may_have_several_incoming_links() {
    let mut table = LinkTable::new();
    table.connect(out(0), inp(2)).unwrap();
    table.connect(out(1), inp(2)).unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn connect_validates_port_directions() {
    let mut table = LinkTable::new();
    assert!(matches!(
        table.connect(inp(0), inp(1)),
        Err(ChainError::Validation(_))
    ));
    assert!(table.connect(out(0), out(1)).is_err());
    assert!(table.connect(out(3), inp(3)).is_err());
    assert!(table.is_empty());
}

#[test]
fn remove_is_idempotent() {
    let mut table = LinkTable::new();
    let link = table.connect(out(0), inp(1)).unwrap().link;
    assert_eq!(table.remove(link.id), Some(link));
    assert_eq!(table.remove(link.id), None);
    assert!(table.from_source(out(0)).is_none());
}

#[test]
fn remove_incident_prunes_both_directions() {
    let mut table = LinkTable::new();
    table.connect(out(0), inp(1)).unwrap();
    table.connect(out(1), inp(2)).unwrap();
    table.connect(out(2), inp(3)).unwrap();

    let removed = table.remove_incident(NodeId(1));
    assert_eq!(removed.len(), 2);
    assert_eq!(table.len(), 1);
    assert!(table.iter().all(|l| !l.touches(NodeId(1))));
}

#[test]
fn insert_with_id_restores_and_keeps_ids_monotonic() {
    let mut table = LinkTable::new();
    let link = table.connect(out(0), inp(1)).unwrap().link;
    table.remove(link.id);
    table.insert_with_id(link).unwrap();
    assert_eq!(table.get(link.id).unwrap(), &link);
    assert!(matches!(
        table.insert_with_id(link),
        Err(ChainError::HistoryReplay(_))
    ));

    let next = table.connect(out(5), inp(6)).unwrap().link;
    assert!(next.id > link.id);
}
