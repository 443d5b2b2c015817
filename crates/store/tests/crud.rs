#![forbid(unsafe_code)]

use std::sync::Arc;

use mockdb_core::{FieldType, Facets, MockError, Record, Value};
use mockdb_schema::{CollectionModel, SchemaIndex, ServiceModel};
use mockdb_store::EntityStore;

fn northwind() -> EntityStore {
    let model = ServiceModel::new()
        .with_collection(
            CollectionModel::new("Customers")
                .with_key(&["CustomerID"])
                .with_field_facets("CustomerID", FieldType::String, Facets::max_length(5))
                .with_field("CompanyName", FieldType::String)
                .with_field("City", FieldType::String),
        )
        .with_collection(
            CollectionModel::new("Shippers")
                .with_key(&["ShipperID"])
                .with_field("ShipperID", FieldType::Int32)
                .with_field("CompanyName", FieldType::String),
        );
    EntityStore::new(Arc::new(SchemaIndex::build(model).unwrap()))
}

fn customer(id: &str, company: &str) -> Record {
    Record::new().with("CustomerID", id).with("CompanyName", company)
}

#[test]
fn fresh_store_is_empty_and_clear_is_a_no_op() {
    let s = northwind();
    for name in ["Customers", "Shippers"] {
        assert!(s.list_all(name).unwrap().is_empty());
        s.truncate(name).unwrap();
        assert!(s.list_all(name).unwrap().is_empty());
    }
    s.clear();
    assert_eq!(s.counts(), vec![("Customers".to_string(), 0), ("Shippers".to_string(), 0)]);
}

#[test]
fn unknown_collection_fails_every_operation() {
    let s = northwind();
    let unknown = |e: MockError| assert_eq!(e, MockError::UnknownCollection("WhatIsLove?".into()));
    unknown(s.list_all("WhatIsLove?").unwrap_err());
    unknown(s.insert("WhatIsLove?", customer("A", "B")).unwrap_err());
    unknown(s.put("WhatIsLove?", customer("A", "B")).unwrap_err());
    unknown(s.put_all("WhatIsLove?", vec![customer("A", "B")]).unwrap_err());
    unknown(s.remove("WhatIsLove?", &customer("A", "B")).unwrap_err());
    unknown(s.get("WhatIsLove?", &customer("A", "B")).unwrap_err());
    unknown(s.truncate("WhatIsLove?").unwrap_err());
}

#[test]
fn insert_then_get_by_key_and_duplicate_rejected() {
    let s = northwind();
    let anton = customer("ANTON", "Antonio Moreno Taquería").with("City", "México D.F.");
    s.insert("Customers", anton.clone()).unwrap();

    let key = s.key_of("Customers", &anton).unwrap();
    assert_eq!(s.get_by_key("Customers", &key).unwrap(), Some(anton.clone()));

    let err = s.insert("Customers", customer("ANTON", "Other")).unwrap_err();
    assert_eq!(err, MockError::DuplicateKey { collection: "Customers".into(), key: "(CustomerID='ANTON')".into() });
    assert_eq!(s.list_all("Customers").unwrap(), vec![anton]);
}

#[test]
fn put_twice_replaces_in_place() {
    let s = northwind();
    s.put("Customers", customer("ALFKI", "Alfreds")).unwrap();
    s.put("Customers", customer("ANTON", "X")).unwrap();
    s.put("Customers", customer("BERGS", "Berglunds")).unwrap();
    let prev = s.put("Customers", customer("ANTON", "Y")).unwrap();
    assert_eq!(prev, Some(customer("ANTON", "X")));

    let all = s.list_all("Customers").unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].get("CompanyName"), Some(&Value::String("Y".into())));
    let ids: Vec<_> = all.iter().map(|r| r.get("CustomerID").and_then(|v| v.as_str()).unwrap_or("")).collect();
    assert_eq!(ids, vec!["ALFKI", "ANTON", "BERGS"]);
}

#[test]
fn put_all_keeps_first_seen_order_and_last_write() {
    let s = northwind();
    let n = s
        .put_all(
            "Customers",
            vec![customer("ANTON", "A1"), customer("CHOPS", "C1"), customer("ANTON", "A2"), customer("BLAUS", "B1")],
        )
        .unwrap();
    assert_eq!(n, 4);
    let all = s.list_all("Customers").unwrap();
    assert_eq!(all, vec![customer("ANTON", "A2"), customer("CHOPS", "C1"), customer("BLAUS", "B1")]);
}

#[test]
fn put_all_accepts_records_missing_key_fields() {
    let s = northwind();
    s.put_all("Customers", vec![Record::new().with("CompanyName", "nameless"), customer("ANTON", "A")]).unwrap();
    let all = s.list_all("Customers").unwrap();
    assert_eq!(all.len(), 2);
    let nameless = s.get("Customers", &Record::new()).unwrap();
    assert_eq!(nameless, Some(Record::new().with("CompanyName", "nameless")));
}

#[test]
fn remove_by_key_shaped_record() {
    let s = northwind();
    s.put_all("Customers", vec![customer("ANTON", "Antonio"), customer("CHOPS", "Chop-suey Chinese")]).unwrap();

    let key = Record::new().with("CustomerID", "ANTON");
    let removed = s.remove("Customers", &key).unwrap();
    assert_eq!(removed, Some(customer("ANTON", "Antonio")));
    assert_eq!(s.len("Customers").unwrap(), 1);
    assert_eq!(s.get("Customers", &key).unwrap(), None);
    assert_eq!(s.remove("Customers", &key).unwrap(), None);
}

#[test]
fn snapshots_are_detached_from_the_store() {
    let s = northwind();
    s.put("Customers", customer("ANTON", "X")).unwrap();
    let mut snap = s.list_all("Customers").unwrap();
    snap[0].set("CompanyName", "mutated");
    snap.clear();
    assert_eq!(s.list_all("Customers").unwrap(), vec![customer("ANTON", "X")]);
}

#[test]
fn truncate_and_clear() {
    let s = northwind();
    s.put_all("Customers", vec![customer("ANTON", "A"), customer("CHOPS", "C")]).unwrap();
    s.put("Shippers", Record::new().with("ShipperID", 1).with("CompanyName", "Speedy Express")).unwrap();

    s.truncate("Customers").unwrap();
    assert!(s.list_all("Customers").unwrap().is_empty());
    assert_eq!(s.len("Shippers").unwrap(), 1);

    s.put("Customers", customer("ANTON", "A")).unwrap();
    s.clear();
    assert!(s.list_all("Customers").unwrap().is_empty());
    assert!(s.list_all("Shippers").unwrap().is_empty());
    s.put("Customers", customer("ANTON", "A")).unwrap();
    assert_eq!(s.len("Customers").unwrap(), 1);
}
