// tests/query/query_test.rs
use std::sync::{Arc, Mutex};

use quarry::model::{
    Comparator, Container, ContainerId, GroupFunction, Item, ItemId, Join, JoinEnd, JoinSide,
    SortOrder,
};
use quarry::query::{Query, QueryError, QueryEvent};
use quarry::source::StaticSource;

struct Fixture {
    query: Query,
    orders: ContainerId,
    customers: ContainerId,
    order_id: ItemId,
    customer_ref: ItemId,
    amount: ItemId,
    customer_id: ItemId,
    customer_name: ItemId,
}

/// orders(id, customer_id, amount) joined to customers(id, name).
fn fixture() -> Fixture {
    let mut query = Query::new("sales");
    let mut orders = Container::table("orders").with_alias("o");
    let order_id = orders.push_item(Item::column("id"));
    let customer_ref = orders.push_item(Item::column("customer_id"));
    let amount = orders.push_item(Item::column("amount"));
    let mut customers = Container::table("customers").with_alias("c");
    let customer_id = customers.push_item(Item::column("id"));
    let customer_name = customers.push_item(Item::column("name"));

    let orders = query.add_table(orders).unwrap();
    let customers = query.add_table(customers).unwrap();
    query.join_items(customer_ref, customer_id).unwrap();

    Fixture {
        query,
        orders,
        customers,
        order_id,
        customer_ref,
        amount,
        customer_id,
        customer_name,
    }
}

fn recorder(query: &mut Query) -> Arc<Mutex<Vec<QueryEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    query.subscribe(move |event: &QueryEvent| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn test_add_table_appends_to_from_list() {
    let f = fixture();
    assert_eq!(f.query.from_table_ids(), &[f.orders, f.customers]);
    assert_eq!(f.query.table_named("customers").unwrap().id(), f.customers);
    assert_eq!(f.query.container_of(f.amount).unwrap().id(), f.orders);
    assert!(f.query.is_consistent());
}

#[test]
fn test_add_table_twice_rejected() {
    let mut query = Query::new("q");
    let table = Container::table("orders");
    query.add_table(table.clone()).unwrap();
    assert_eq!(
        query.add_table(table.clone()).unwrap_err(),
        QueryError::DuplicateContainer(table.id())
    );
}

#[test]
fn test_selecting_sorted_item_joins_sort_list() {
    let mut query = Query::new("q");
    let mut table = Container::table("orders");
    let id = table.push_item(Item::column("id").with_sort_order(SortOrder::Ascending));
    query.add_table(table).unwrap();
    assert!(query.order_by_items().is_empty());

    query.select_item(id).unwrap();
    assert_eq!(query.selected_items(), &[id]);
    assert_eq!(query.order_by_items(), &[id]);
}

#[test]
fn test_selection_and_sort_lists() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.select_item(f.amount).unwrap();
    f.query.set_sort_order(f.amount, SortOrder::Descending).unwrap();
    f.query.set_sort_order(f.order_id, SortOrder::Ascending).unwrap();

    assert_eq!(f.query.selected_items(), &[f.order_id, f.amount]);
    assert_eq!(f.query.order_by_items(), &[f.amount, f.order_id]);

    // Changing direction moves the item to the end of the sort list.
    f.query.set_sort_order(f.amount, SortOrder::Ascending).unwrap();
    assert_eq!(f.query.order_by_items(), &[f.order_id, f.amount]);

    f.query.set_sort_order(f.order_id, SortOrder::Unordered).unwrap();
    assert_eq!(f.query.order_by_items(), &[f.amount]);

    f.query.deselect_item(f.amount).unwrap();
    assert_eq!(f.query.selected_items(), &[f.order_id]);
    assert!(f.query.order_by_items().is_empty());
    assert!(f.query.is_consistent());
}

#[test]
fn test_sort_order_on_unselected_item_waits_for_selection() {
    let mut f = fixture();
    f.query.set_sort_order(f.amount, SortOrder::Descending).unwrap();
    assert!(f.query.order_by_items().is_empty());

    f.query.select_item(f.amount).unwrap();
    assert_eq!(f.query.order_by_items(), &[f.amount]);
}

#[test]
fn test_move_selected_item() {
    let mut f = fixture();
    for id in [f.order_id, f.amount, f.customer_name] {
        f.query.select_item(id).unwrap();
    }
    f.query.move_selected_item(f.customer_name, 0).unwrap();
    assert_eq!(
        f.query.selected_items(),
        &[f.customer_name, f.order_id, f.amount]
    );

    let err = f.query.move_selected_item(f.customer_ref, 0).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn test_unknown_handles_rejected() {
    let mut query = Query::new("q");
    let stray = ItemId::new();
    assert_eq!(
        query.select_item(stray).unwrap_err(),
        QueryError::UnknownItem(stray)
    );
    assert_eq!(
        query.remove_item(stray).unwrap_err(),
        QueryError::UnknownItem(stray)
    );
    let container = ContainerId::new();
    assert_eq!(
        query.remove_table(container).unwrap_err(),
        QueryError::UnknownContainer(container)
    );
}

#[test]
fn test_join_to_constants_rejected() {
    let mut f = fixture();
    let now = f.query.constants_container().items()[0].id();
    assert_eq!(
        f.query.join_items(f.order_id, now).unwrap_err(),
        QueryError::ConstantsContainer
    );
}

#[test]
fn test_join_to_item_of_other_table_rejected() {
    let mut f = fixture();
    // Claims orders owns a customers column.
    let join = Join::new(
        JoinEnd::new(f.orders, f.customer_name),
        JoinEnd::new(f.customers, f.customer_id),
    );
    let err = f.query.add_join(join).unwrap_err();
    assert!(err.is_topology_violation());
    assert_eq!(f.query.joins().len(), 1);
}

#[test]
fn test_set_join_outer_propagates_to_container() {
    let mut f = fixture();
    let mut lines = Container::table("order_lines");
    let order_ref = lines.push_item(Item::column("order_id"));
    f.query.add_table(lines).unwrap();
    let lines_join = f.query.join_items(f.order_id, order_ref).unwrap();
    let first = f.query.joins().iter().next().unwrap().id();

    f.query.set_join_outer(first, JoinSide::Left, true).unwrap();
    assert!(f.query.join(lines_join).unwrap().is_left_outer());
    assert!(f.query.is_consistent());
}

#[test]
fn test_join_comparator_and_name() {
    let mut f = fixture();
    let id = f.query.joins().iter().next().unwrap().id();
    f.query.set_join_comparator(id, Comparator::Gte).unwrap();
    f.query.set_join_name(id, Some("placed by")).unwrap();

    let join = f.query.join(id).unwrap();
    assert_eq!(join.comparator(), Comparator::Gte);
    assert_eq!(join.name(), Some("placed by"));

    f.query.set_join_name(id, Some("  ")).unwrap();
    assert_eq!(f.query.join(id).unwrap().name(), None);
}

#[test]
fn test_remove_table_cascades() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.select_item(f.customer_name).unwrap();
    f.query.set_sort_order(f.customer_name, SortOrder::Ascending).unwrap();
    let events = recorder(&mut f.query);

    let removed = f.query.remove_table(f.customers).unwrap();
    assert_eq!(removed.name(), "customers");

    assert_eq!(f.query.selected_items(), &[f.order_id]);
    assert!(f.query.order_by_items().is_empty());
    assert!(f.query.joins().is_empty());
    assert!(f.query.joins().join_ids_for(f.orders).is_empty());
    assert!(f.query.item(f.customer_name).is_none());
    assert_eq!(f.query.from_table_ids(), &[f.orders]);
    assert!(f.query.is_consistent());

    let events = events.lock().unwrap();
    let started = events
        .iter()
        .filter(|e| matches!(e, QueryEvent::CompoundEditStarted { .. }))
        .count();
    let ended = events
        .iter()
        .filter(|e| matches!(e, QueryEvent::CompoundEditEnded { .. }))
        .count();
    assert_eq!((started, ended), (1, 1));
}

#[test]
fn test_remove_item_cascades_joins() {
    let mut f = fixture();
    f.query.select_item(f.customer_ref).unwrap();
    let removed = f.query.remove_item(f.customer_ref).unwrap();

    assert_eq!(removed.name(), "customer_id");
    assert!(removed.parent().is_none());
    assert!(f.query.selected_items().is_empty());
    assert!(f.query.joins().is_empty());
    assert_eq!(f.query.container(f.orders).unwrap().len(), 2);
    assert!(f.query.is_consistent());
}

#[test]
fn test_add_constant() {
    let mut query = Query::new("q");
    let id = query.add_constant("  'EUR' ").unwrap();
    let item = query.item(id).unwrap();
    assert_eq!(item.name(), "'EUR'");
    assert_eq!(query.constants_container().len(), 5);
    assert!(matches!(
        query.add_constant(" "),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn test_item_property_setters() {
    let mut f = fixture();
    f.query.rename_item(f.amount, "net_amount").unwrap();
    f.query.set_item_alias(f.amount, Some("net")).unwrap();
    f.query.set_item_where(f.amount, Some("> 0")).unwrap();
    f.query.set_group_function(f.amount, GroupFunction::Max).unwrap();
    f.query.set_item_having(f.amount, Some("> 10")).unwrap();
    f.query.set_column_width(f.amount, Some(80)).unwrap();

    let item = f.query.item(f.amount).unwrap();
    assert_eq!(item.name(), "net_amount");
    assert_eq!(item.alias(), Some("net"));
    assert_eq!(item.where_fragment(), Some("> 0"));
    assert_eq!(item.group_function(), GroupFunction::Max);
    assert_eq!(item.having(), Some("> 10"));
    assert_eq!(item.column_width(), Some(80));

    assert!(matches!(
        f.query.rename_item(f.amount, ""),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn test_container_alias() {
    let mut f = fixture();
    f.query.set_container_alias(f.orders, Some("ord")).unwrap();
    assert_eq!(f.query.container(f.orders).unwrap().alias(), Some("ord"));
    f.query.set_container_alias(f.orders, None).unwrap();
    assert_eq!(f.query.container(f.orders).unwrap().qualifier(), "orders");
}

#[test]
fn test_query_properties() {
    let mut query = Query::new("q");
    query.set_name("renamed");
    query.set_global_where(Some("1 = 1"));
    query.set_grouping_enabled(true);
    query.set_row_limit(50);
    query.set_streaming_row_limit(10);
    query.set_streaming(true);
    query.set_zoom_level(-2);

    assert_eq!(query.name(), "renamed");
    assert_eq!(query.global_where(), Some("1 = 1"));
    assert!(query.is_grouping_enabled());
    assert_eq!(query.row_limit(), 50);
    assert_eq!(query.streaming_row_limit(), 10);
    assert!(query.is_streaming());
    assert_eq!(query.zoom_level(), -2);

    query.set_global_where(Some(""));
    assert_eq!(query.global_where(), None);
}

#[test]
fn test_user_override_precedence() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.define_user_override("SELECT 1");
    assert_eq!(f.query.generate(), "SELECT 1");

    // Structural edits do not disturb the override.
    f.query.select_item(f.amount).unwrap();
    assert_eq!(f.query.generate(), "SELECT 1");

    f.query.clear_override();
    assert_eq!(f.query.user_override_sql(), None);
    assert!(f.query.generate().starts_with("SELECT o.id, o.amount FROM"));
}

#[test]
fn test_override_matching_generated_text_clears() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.define_user_override("SELECT 1");

    let generated = f.query.generate_structural();
    f.query.define_user_override(&generated);
    assert_eq!(f.query.user_override_sql(), None);
    assert_eq!(f.query.generate(), generated);
}

#[test]
fn test_reset() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.add_constant("42").unwrap();
    f.query.set_global_where(Some("o.id > 0"));
    f.query.set_grouping_enabled(true);
    f.query.set_zoom_level(3);
    f.query.define_user_override("SELECT 1");
    let events = recorder(&mut f.query);

    f.query.reset();

    assert_eq!(f.query.from_tables().count(), 0);
    assert!(f.query.joins().is_empty());
    assert!(f.query.selected_items().is_empty());
    assert_eq!(f.query.constants_container().len(), 4);
    assert_eq!(f.query.global_where(), None);
    assert!(!f.query.is_grouping_enabled());
    assert_eq!(f.query.user_override_sql(), None);
    assert_eq!(f.query.zoom_level(), 0);
    assert_eq!(f.query.generate(), "");
    assert!(f.query.is_consistent());

    let events = events.lock().unwrap();
    assert_eq!(
        events.first(),
        Some(&QueryEvent::CompoundEditStarted {
            message: "Resetting query".into()
        })
    );
    assert_eq!(events.last(), Some(&QueryEvent::CanExecuteQuery));
}

#[test]
fn test_duplicate_fresh_identities() {
    let mut f = fixture();
    f.query.select_item(f.order_id).unwrap();
    f.query.select_item(f.customer_name).unwrap();
    f.query.set_sort_order(f.customer_name, SortOrder::Descending).unwrap();
    f.query.set_data_source(Some(Arc::new(StaticSource::new())));

    let copy = f.query.duplicate();
    assert_ne!(copy.id(), f.query.id());
    assert!(copy.item(f.order_id).is_none());
    assert!(copy.container(f.orders).is_none());
    assert_eq!(copy.selected_items().len(), 2);
    assert_eq!(copy.order_by_items().len(), 1);
    assert_eq!(copy.joins().len(), 1);
    assert!(copy.data_source().is_some());
    assert!(copy.is_consistent());
    assert_eq!(copy.generate(), f.query.generate());
}

#[test]
fn test_duplicate_does_not_copy_listeners() {
    let mut f = fixture();
    let events = recorder(&mut f.query);
    let mut copy = f.query.duplicate();
    copy.set_name("copy");
    assert!(events.lock().unwrap().is_empty());
}
