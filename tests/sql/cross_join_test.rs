// tests/sql/cross_join_test.rs
use quarry::model::{Container, ContainerId, Item, ItemId};
use quarry::query::Query;
use quarry::sql::{contains_cross_joins, finish_order, JoinGraph};

struct Table {
    id: ContainerId,
    key: ItemId,
}

fn add_table(query: &mut Query, name: &str) -> Table {
    let mut table = Container::table(name);
    let key = table.push_item(Item::column("id"));
    let id = query.add_table(table).unwrap();
    Table { id, key }
}

#[test]
fn test_single_table_never_cross_joined() {
    let mut query = Query::new("q");
    add_table(&mut query, "a");
    assert!(!query.contains_cross_joins());
}

#[test]
fn test_empty_query_has_no_cross_join() {
    let query = Query::new("q");
    assert!(!contains_cross_joins(&query));
}

#[test]
fn test_two_unjoined_tables() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    assert!(query.contains_cross_joins());

    query.select_item(a.key).unwrap();
    query.select_item(b.key).unwrap();
    assert_eq!(
        query.generate(),
        "SELECT a.id, b.id FROM a INNER JOIN b ON 0 = 0"
    );
}

#[test]
fn test_two_joined_tables() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    query.join_items(a.key, b.key).unwrap();
    assert!(!query.contains_cross_joins());
}

#[test]
fn test_removing_join_reintroduces_cross_join() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    let join = query.join_items(a.key, b.key).unwrap();
    query.remove_join(join).unwrap();
    assert!(query.contains_cross_joins());
}

#[test]
fn test_third_table_left_out() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    let c = add_table(&mut query, "c");
    query.join_items(a.key, b.key).unwrap();
    assert!(query.contains_cross_joins());

    query.select_item(c.key).unwrap();
    assert_eq!(
        query.generate(),
        "SELECT c.id FROM a INNER JOIN b ON a.id = b.id INNER JOIN c ON 0 = 0"
    );
}

#[test]
fn test_star_join_is_connected() {
    let mut query = Query::new("q");
    let hub = add_table(&mut query, "hub");
    let spokes: Vec<Table> = ["x", "y", "z"]
        .iter()
        .map(|name| add_table(&mut query, name))
        .collect();
    for spoke in &spokes {
        query.join_items(hub.key, spoke.key).unwrap();
    }
    assert!(!query.contains_cross_joins());

    let order = finish_order(query.from_table_ids(), query.joins());
    assert_eq!(order[0], hub.id);
    assert_eq!(order.len(), 4);
}

#[test]
fn test_finish_order_for_unjoined_tables_is_list_order() {
    let mut query = Query::new("q");
    let tables: Vec<ContainerId> = ["a", "b", "c"]
        .iter()
        .map(|name| add_table(&mut query, name).id)
        .collect();
    assert_eq!(finish_order(query.from_table_ids(), query.joins()), tables);
}

#[test]
fn test_graph_counts() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    query.join_items(a.key, b.key).unwrap();
    query.join_items(b.key, a.key).unwrap();

    let graph = JoinGraph::build(query.from_table_ids(), query.joins());
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.finish_order().len(), 2);
}

#[test]
fn test_cycle_renders_each_table_once() {
    let mut query = Query::new("q");
    let a = add_table(&mut query, "a");
    let b = add_table(&mut query, "b");
    let c = add_table(&mut query, "c");
    query.join_items(a.key, b.key).unwrap();
    query.join_items(b.key, c.key).unwrap();
    query.join_items(c.key, a.key).unwrap();
    query.select_item(a.key).unwrap();

    assert!(!query.contains_cross_joins());
    let sql = query.generate();
    assert_eq!(sql.matches("JOIN").count(), 2);
    assert_eq!(
        sql,
        "SELECT a.id FROM c INNER JOIN a ON c.id = a.id INNER JOIN b ON a.id = b.id AND b.id = c.id"
    );
}
