#![forbid(unsafe_code)]

use std::sync::Arc;

use mockdb_api::{HandlerOutput, MockService, ReadResult};
use mockdb_core::{Facets, FieldType, MockError, MockResult, Record, Value};
use mockdb_schema::{CollectionModel, SchemaIndex, ServiceModel};
use mockdb_store::EntityStore;
use serde_json::json;

fn service() -> MockService {
    let model = ServiceModel::new()
        .with_collection(
            CollectionModel::new("Customers")
                .with_key(&["CustomerID"])
                .with_field_facets("CustomerID", FieldType::String, Facets::max_length(5))
                .with_field("CompanyName", FieldType::String)
                .with_navigation("Orders", "Orders"),
        )
        .with_collection(
            CollectionModel::new("Orders")
                .with_key(&["OrderID"])
                .with_field("OrderID", FieldType::Int32)
                .with_field("CustomerID", FieldType::String),
        )
        .with_collection(
            CollectionModel::new("Shippers")
                .with_key(&["ShipperID"])
                .with_field("ShipperID", FieldType::Int32),
        );
    let store = EntityStore::new(Arc::new(SchemaIndex::build(model).unwrap()));
    MockService::new(Arc::new(store))
}

fn anton() -> Record {
    Record::new().with("CustomerID", "ANTON").with("CompanyName", "Antonio Moreno Taquería")
}

fn order(id: i32) -> Record {
    Record::new().with("OrderID", id).with("CustomerID", "ANTON")
}

#[test]
fn create_read_delete() {
    let svc = service();
    svc.create("Customers", anton()).unwrap();
    let key = Record::new().with("CustomerID", "ANTON");
    assert_eq!(svc.read_by_key("Customers", &key).unwrap(), Some(anton()));
    assert!(matches!(svc.create("Customers", anton()), Err(MockError::DuplicateKey { .. })));

    assert_eq!(svc.delete("Customers", &key).unwrap(), anton());
    assert!(svc.read_all("Customers").unwrap().is_empty());
    let err = svc.delete("Customers", &key).unwrap_err();
    assert_eq!(err, MockError::NotFound("Customers(CustomerID='ANTON')".into()));
}

#[test]
fn create_json_requires_an_object() {
    let svc = service();
    let rec = svc.create_json("Orders", &json!({ "OrderID": 10248, "CustomerID": "VINET" })).unwrap();
    assert_eq!(rec.get("OrderID"), Some(&Value::Int32(10248)));
    assert_eq!(svc.read_all("Orders").unwrap(), vec![rec]);

    for bad in [json!([1]), json!("Orders"), json!(null)] {
        assert!(matches!(svc.create_json("Orders", &bad), Err(MockError::InvalidInputShape(_))));
    }
    assert!(matches!(svc.create_json("Nope", &json!({})), Err(MockError::UnknownCollection(_))));
}

#[test]
fn new_record_is_empty_for_declared_collections() {
    let svc = service();
    assert!(svc.new_record("Orders").unwrap().is_empty());
    assert!(matches!(svc.new_record("WhatIsLove?"), Err(MockError::UnknownCollection(_))));
}

#[test]
fn write_relation_then_read_related() {
    let svc = service();
    svc.create("Customers", anton()).unwrap();
    svc.create("Orders", order(10365)).unwrap();
    svc.create("Orders", order(10507)).unwrap();

    let source = svc.write_relation("Customers", anton(), "Orders", &order(10365)).unwrap();
    let source = svc.write_relation("Customers", source, "Orders", &Record::new().with("OrderID", 10507)).unwrap();
    let stored = svc.read_by_key("Customers", &Record::new().with("CustomerID", "ANTON")).unwrap().unwrap();
    assert_eq!(stored, source);
    assert_eq!(stored.get("Orders").and_then(Value::as_links).map(|l| l.len()), Some(2));

    let related = svc.read_related("Customers", &stored, "Orders", &Record::new()).unwrap();
    assert_eq!(related, ReadResult::Feed(vec![order(10365), order(10507)]));

    let one = svc.read_related("Customers", &stored, "Orders", &Record::new().with("OrderID", 10507)).unwrap();
    assert_eq!(one, ReadResult::Entry(Some(order(10507))));
}

#[test]
fn read_related_without_links_or_with_dangling_links() {
    let svc = service();
    svc.create("Customers", anton()).unwrap();
    let empty = svc.read_related("Customers", &anton(), "Orders", &Record::new()).unwrap();
    assert_eq!(empty, ReadResult::Feed(Vec::new()));

    let source = svc.write_relation("Customers", anton(), "Orders", &order(1)).unwrap();
    let dangling = svc.read_related("Customers", &source, "Orders", &Record::new()).unwrap();
    assert_eq!(dangling, ReadResult::Feed(Vec::new()));
}

#[test]
fn missing_navigation_is_reported() {
    let svc = service();
    let err = svc.read_related("Customers", &anton(), "Shippers", &Record::new()).unwrap_err();
    assert_eq!(err, MockError::NavigationNotFound { from: "Customers".into(), to: "Shippers".into() });
    let err = svc.write_relation("Orders", order(1), "Customers", &anton()).unwrap_err();
    assert!(matches!(err, MockError::NavigationNotFound { .. }));
}

#[test]
fn operations_dispatch_to_registered_handlers() {
    let mut svc = service();
    svc.register_handler(
        "TopCustomers",
        Arc::new(|_: &str, params: &Record, _: &Record| -> MockResult<HandlerOutput> {
            let n = params.get("top").and_then(Value::as_i64).unwrap_or(1);
            Ok(HandlerOutput::Feed((0..n).map(|i| Record::new().with("Rank", i)).collect()))
        }),
    );
    let out = svc.invoke("TopCustomers", &Record::new().with("top", 2), &Record::new()).unwrap();
    assert_eq!(out, HandlerOutput::Feed(vec![Record::new().with("Rank", 0i64), Record::new().with("Rank", 1i64)]));
    assert!(matches!(svc.invoke("Unknown", &Record::new(), &Record::new()), Err(MockError::NotImplemented(_))));
}

#[test]
fn media_and_relation_deletion_are_not_implemented() {
    let svc = service();
    assert!(matches!(svc.read_binary("Customers", &anton()), Err(MockError::NotImplemented(_))));
    assert!(matches!(svc.write_binary("Customers", &anton(), b"x"), Err(MockError::NotImplemented(_))));
    assert!(matches!(
        svc.delete_relation("Customers", &anton(), "Orders", &order(1)),
        Err(MockError::NotImplemented(_))
    ));
}
