// tests/model/container_test.rs
use quarry::model::{Container, ContainerKind, Item, ItemKind, BUILTIN_CONSTANTS, CONSTANTS_CONTAINER_NAME};

#[test]
fn test_table_container() {
    let table = Container::table("orders").with_alias("o").with_schema("sales");
    assert_eq!(table.name(), "orders");
    assert_eq!(table.alias(), Some("o"));
    assert_eq!(table.schema(), Some("sales"));
    assert_eq!(table.qualifier(), "o");
    assert!(!table.is_constants());
    assert!(table.is_empty());
}

#[test]
fn test_qualifier_falls_back_to_name() {
    let table = Container::table("orders").with_alias("");
    assert_eq!(table.alias(), None);
    assert_eq!(table.qualifier(), "orders");
}

#[test]
fn test_constants_container_builtins() {
    let constants = Container::constants();
    assert_eq!(constants.name(), CONSTANTS_CONTAINER_NAME);
    assert_eq!(constants.kind(), &ContainerKind::Constants);
    assert_eq!(constants.schema(), None);
    assert_eq!(constants.len(), BUILTIN_CONSTANTS.len() + 1);

    for (item, name) in constants.items().iter().zip(BUILTIN_CONSTANTS) {
        assert_eq!(item.name(), name);
        assert_eq!(item.kind(), ItemKind::Constant);
    }
    let last = constants.items().last().unwrap();
    assert_eq!(last.kind(), ItemKind::CountStar);
}

#[test]
fn test_push_sets_parent() {
    let mut table = Container::table("orders");
    let id = table.push_item(Item::column("id"));
    assert_eq!(table.item(id).unwrap().parent(), Some(table.id()));
    assert!(table.contains(id));
}

#[test]
fn test_insert_and_remove() {
    let mut table = Container::table("orders");
    let id = table.push_item(Item::column("id"));
    let first = table.insert_item(0, Item::column("region"));
    let last = table.insert_item(99, Item::column("amount"));

    let names: Vec<&str> = table.items().iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["region", "id", "amount"]);
    assert_eq!(table.index_of(first), Some(0));
    assert_eq!(table.index_of(last), Some(2));

    let removed = table.remove_item(id).unwrap();
    assert!(removed.parent().is_none());
    assert_eq!(table.len(), 2);
    assert!(table.remove_item(id).is_none());
    assert!(table.remove_item_at(5).is_none());
}

#[test]
fn test_find_item() {
    let table = Container::table("orders")
        .with_item(Item::column("id"))
        .with_item(Item::column("amount").with_alias("total"));

    assert_eq!(table.item_named("amount").unwrap().alias(), Some("total"));
    assert!(table.item_named("missing").is_none());
    assert_eq!(
        table.find_item(|i| i.alias().is_some()).unwrap().name(),
        "amount"
    );
}

#[test]
fn test_deep_copy_fresh_identities() {
    let table = Container::table("orders")
        .with_alias("o")
        .with_position(serde_json::json!({"x": 10, "y": 20}))
        .with_item(Item::column("id"))
        .with_item(Item::column("amount"));

    let copy = table.deep_copy();
    assert_ne!(copy.id(), table.id());
    assert_eq!(copy.alias(), Some("o"));
    assert_eq!(copy.position(), table.position());
    assert_eq!(copy.len(), 2);
    for (original, copied) in table.items().iter().zip(copy.items()) {
        assert_ne!(original.id(), copied.id());
        assert_eq!(original.name(), copied.name());
        assert_eq!(copied.parent(), Some(copy.id()));
    }
}

#[test]
fn test_container_json_shape() {
    let table = Container::table("orders")
        .with_schema("sales")
        .with_item(Item::column("id"));
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["kind"]["type"], "table");
    assert_eq!(json["kind"]["schema"], "sales");
    assert_eq!(json["items"].as_array().unwrap().len(), 1);

    let constants = serde_json::to_value(Container::constants()).unwrap();
    assert_eq!(constants["kind"]["type"], "constants");
}
