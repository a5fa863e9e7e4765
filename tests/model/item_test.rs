// tests/model/item_test.rs
use quarry::model::{GroupFunction, Item, ItemKind, SortOrder};
use quarry::QueryError;

#[test]
fn test_column_builder() {
    let item = Item::column("amount")
        .with_alias("total")
        .with_where("> 100")
        .with_group_function(GroupFunction::Sum)
        .with_having("> 1000")
        .with_sort_order(SortOrder::Descending)
        .with_column_width(120);

    assert_eq!(item.name(), "amount");
    assert_eq!(item.kind(), ItemKind::Column);
    assert_eq!(item.alias(), Some("total"));
    assert_eq!(item.where_fragment(), Some("> 100"));
    assert_eq!(item.group_function(), GroupFunction::Sum);
    assert_eq!(item.having(), Some("> 1000"));
    assert_eq!(item.sort_order(), SortOrder::Descending);
    assert_eq!(item.column_width(), Some(120));
    assert!(!item.is_selected());
}

#[test]
fn test_blank_text_fields_read_as_absent() {
    let item = Item::column("id").with_where("   ").with_having("");
    assert_eq!(item.where_fragment(), None);
    assert_eq!(item.having(), None);
}

#[test]
fn test_items_get_distinct_ids() {
    let a = Item::column("id");
    let b = Item::column("id");
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_count_star() {
    let item = Item::count_star();
    assert_eq!(item.kind(), ItemKind::CountStar);
    assert_eq!(item.name(), "count(*)");
}

#[test]
fn test_group_function_spelling() {
    assert_eq!(GroupFunction::Avg.to_string(), "AVG");
    assert_eq!(GroupFunction::GroupBy.as_str(), "GROUP BY");
    assert!(!GroupFunction::GroupBy.is_aggregate());
    assert!(GroupFunction::AGGREGATES.iter().all(|f| f.is_aggregate()));
}

#[test]
fn test_sort_order_keywords() {
    assert_eq!(SortOrder::Ascending.keyword(), Some("ASC"));
    assert_eq!(SortOrder::Descending.keyword(), Some("DESC"));
    assert_eq!(SortOrder::Unordered.keyword(), None);
    assert!(!SortOrder::default().is_ordered());
}

#[test]
fn test_absent_sort_direction_rejected() {
    let err = " ".parse::<SortOrder>().unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn test_item_json_shape() {
    let item = Item::column("id").with_group_function(GroupFunction::Count);
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["name"], "id");
    assert_eq!(json["kind"], "column");
    assert_eq!(json["group_function"], "COUNT");
    assert_eq!(json["sort_order"], "unordered");
    assert!(json.get("parent").is_none());

    let back: Item = serde_json::from_value(json).unwrap();
    assert_eq!(back.id(), item.id());
    assert!(back.parent().is_none());
}
