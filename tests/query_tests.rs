/// Query execution tests
///
/// SELECT semantics over registered tables: filtering, ordering, paging,
/// projection, DISTINCT and EXPLAIN.
mod common;

use common::{customers, orders};
use dfsql::{DataType, QueryResult, SqlContext, SqlError, Value};
use std::sync::Arc;

fn context() -> SqlContext {
    let ctx = SqlContext::new();
    ctx.create_table("orders", orders()).unwrap();
    ctx.create_table("customers", customers()).unwrap();
    ctx
}

async fn query(ctx: &SqlContext, sql: &str) -> Result<Arc<QueryResult>, SqlError> {
    ctx.sql(sql).await?.get().await
}

fn column(result: &QueryResult, idx: usize) -> Vec<Value> {
    result.rows.iter().map(|row| row[idx].clone()).collect()
}

#[tokio::test]
async fn test_select_star() {
    let ctx = context();
    let result = query(&ctx, "SELECT * FROM orders").await.unwrap();
    assert_eq!(result.row_count(), 5);
    assert_eq!(result.column_names(), vec!["id", "customer", "amount", "status"]);
}

#[tokio::test]
async fn test_run_query_with_explicit_tables() {
    let ctx = context();
    let result_set = ctx
        .run_query("SELECT name FROM customers WHERE city = 'Lisbon'", &["customers"])
        .await
        .unwrap();
    let result = result_set.get().await.unwrap();
    assert_eq!(
        column(&result, 0),
        vec![Value::Text("alice".into()), Value::Text("carol".into())]
    );
}

#[tokio::test]
async fn test_query_only_sees_requested_tables() {
    let ctx = context();
    let err = ctx
        .run_query("SELECT * FROM orders", &["customers"])
        .await
        .unwrap_err();
    assert_eq!(err, SqlError::TableNotFound("orders".into()));
}

#[tokio::test]
async fn test_unregistered_table_name() {
    let ctx = context();
    let err = ctx.run_query("SELECT * FROM orders", &["missing"]).await.unwrap_err();
    assert_eq!(err, SqlError::TableNotFound("missing".into()));
}

#[tokio::test]
async fn test_duplicate_table_names_collapse() {
    let ctx = context();
    let result_set = ctx
        .run_query("SELECT id FROM orders", &["orders", "orders"])
        .await
        .unwrap();
    assert_eq!(result_set.get().await.unwrap().row_count(), 5);
}

#[tokio::test]
async fn test_empty_table_list() {
    let ctx = context();
    let err = ctx.run_query("SELECT id FROM orders", &[]).await.unwrap_err();
    assert_eq!(err, SqlError::TableNotFound("orders".into()));
}

#[tokio::test]
async fn test_where_with_null_semantics() {
    let ctx = context();
    // carol's amount is NULL and is neither > 50 nor <= 50
    let over = query(&ctx, "SELECT id FROM orders WHERE amount > 50").await.unwrap();
    let under = query(&ctx, "SELECT id FROM orders WHERE amount <= 50").await.unwrap();
    assert_eq!(over.row_count() + under.row_count(), 4);

    let missing = query(&ctx, "SELECT id FROM orders WHERE amount IS NULL").await.unwrap();
    assert_eq!(column(&missing, 0), vec![Value::Integer(4)]);
}

#[tokio::test]
async fn test_order_by_limit_offset() {
    let ctx = context();
    let result = query(
        &ctx,
        "SELECT id FROM orders WHERE amount IS NOT NULL ORDER BY amount DESC LIMIT 2 OFFSET 1",
    )
    .await
    .unwrap();
    assert_eq!(column(&result, 0), vec![Value::Integer(1), Value::Integer(3)]);
}

#[tokio::test]
async fn test_offset_without_limit() {
    let ctx = context();
    let result = query(&ctx, "SELECT id FROM orders ORDER BY id OFFSET 3").await.unwrap();
    assert_eq!(column(&result, 0), vec![Value::Integer(4), Value::Integer(5)]);
}

#[tokio::test]
async fn test_nulls_sort_last_ascending() {
    let ctx = context();
    let result = query(&ctx, "SELECT id FROM orders ORDER BY amount").await.unwrap();
    assert_eq!(
        column(&result, 0),
        vec![
            Value::Integer(2),
            Value::Integer(3),
            Value::Integer(1),
            Value::Integer(5),
            Value::Integer(4),
        ]
    );
}

#[tokio::test]
async fn test_explicit_null_placement() {
    let ctx = context();
    for (order_by, expected) in [
        ("amount ASC NULLS FIRST", [4, 2, 3, 1, 5]),
        ("amount NULLS LAST", [2, 3, 1, 5, 4]),
        ("amount DESC", [4, 5, 1, 3, 2]),
        ("amount DESC NULLS LAST", [5, 1, 3, 2, 4]),
    ] {
        let sql = format!("SELECT id FROM orders ORDER BY {}", order_by);
        let result = query(&ctx, &sql).await.unwrap();
        let expected: Vec<Value> = expected.into_iter().map(Value::Integer).collect();
        assert_eq!(column(&result, 0), expected, "ORDER BY {}", order_by);
    }

    let plan = query(&ctx, "EXPLAIN SELECT id FROM orders ORDER BY amount NULLS FIRST")
        .await
        .unwrap();
    assert_eq!(plan.rows[1][0].to_string(), "  Sort: amount ASC NULLS FIRST");
}

#[tokio::test]
async fn test_unsupported_clauses_are_rejected_not_ignored() {
    let ctx = context();
    for sql in [
        "SELECT id FROM main.orders",
        "SELECT id FROM orders ORDER BY id FETCH FIRST 2 ROWS ONLY",
        "SELECT TOP 2 id FROM orders",
        "SELECT id INTO archive FROM orders",
        "SELECT id FROM orders FOR UPDATE",
        "SELECT id FROM orders QUALIFY id > 1",
        "SELECT id FROM orders TABLESAMPLE BERNOULLI (50)",
    ] {
        let err = query(&ctx, sql).await.unwrap_err();
        assert!(
            matches!(err, SqlError::UnsupportedOperation(_)),
            "{}: got {:?}",
            sql,
            err
        );
    }
}

#[tokio::test]
async fn test_order_by_alias() {
    let ctx = context();
    let result = query(
        &ctx,
        "SELECT id, amount * 2 AS doubled FROM orders WHERE amount IS NOT NULL ORDER BY doubled LIMIT 1",
    )
    .await
    .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Integer(2), Value::Float(71.0)]]);
    assert_eq!(result.columns[1].data_type, DataType::Float);
}

#[tokio::test]
async fn test_distinct() {
    let ctx = context();
    let result = query(&ctx, "SELECT DISTINCT customer FROM orders ORDER BY customer")
        .await
        .unwrap();
    assert_eq!(
        column(&result, 0),
        vec![
            Value::Text("alice".into()),
            Value::Text("bob".into()),
            Value::Text("carol".into()),
            Value::Text("dave".into()),
        ]
    );
}

#[tokio::test]
async fn test_in_between_like() {
    let ctx = context();
    let in_list = query(&ctx, "SELECT id FROM orders WHERE status IN ('pending', 'cancelled')")
        .await
        .unwrap();
    assert_eq!(in_list.row_count(), 3);

    let between = query(&ctx, "SELECT id FROM orders WHERE id BETWEEN 2 AND 4")
        .await
        .unwrap();
    assert_eq!(between.row_count(), 3);

    let like = query(&ctx, "SELECT id FROM orders WHERE customer LIKE 'a%'")
        .await
        .unwrap();
    assert_eq!(column(&like, 0), vec![Value::Integer(1), Value::Integer(3)]);

    let ilike = query(&ctx, "SELECT name FROM customers WHERE city ILIKE 'lis%'")
        .await
        .unwrap();
    assert_eq!(ilike.row_count(), 2);
}

#[tokio::test]
async fn test_qualified_columns_and_alias() {
    let ctx = context();
    let result = query(&ctx, "SELECT o.id, orders.status FROM orders o WHERE o.id = 2")
        .await
        .unwrap();
    assert_eq!(result.column_names(), vec!["id", "status"]);
    assert_eq!(
        result.rows,
        vec![vec![Value::Integer(2), Value::Text("pending".into())]]
    );
}

#[tokio::test]
async fn test_unknown_column_fails_at_get() {
    let ctx = context();
    let result_set = ctx.sql("SELECT nope FROM orders").await.unwrap();
    let err = result_set.get().await.unwrap_err();
    assert!(matches!(err, SqlError::ColumnNotFound(ref c, _) if c == "nope"));
}

#[tokio::test]
async fn test_parse_error_fails_at_submit() {
    let ctx = context();
    assert!(matches!(
        ctx.run_query("SELEC * FROM orders", &["orders"]).await,
        Err(SqlError::ParseError(_))
    ));
    assert!(matches!(
        ctx.sql("SELECT * FROM orders JOIN customers ON true").await,
        Err(SqlError::UnsupportedOperation(_))
    ));
}

#[tokio::test]
async fn test_division_by_zero() {
    let ctx = context();
    let err = query(&ctx, "SELECT id / 0 FROM orders").await.unwrap_err();
    assert!(matches!(err, SqlError::ExecutionError(_)));
}

#[tokio::test]
async fn test_explain() {
    let ctx = context();
    let result = query(
        &ctx,
        "EXPLAIN SELECT DISTINCT customer FROM orders WHERE amount > 10 ORDER BY customer LIMIT 3",
    )
    .await
    .unwrap();

    assert_eq!(result.column_names(), vec!["QUERY PLAN"]);
    let lines: Vec<String> = result.rows.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "Limit: limit=3 offset=0",
            "  Distinct",
            "    Projection: customer",
            "      Sort: customer ASC",
            "        Filter: (amount > 10)",
            "          TableScan: orders [id, customer, amount, status]",
        ]
    );
}

#[tokio::test]
async fn test_query_over_view() {
    let ctx = context();
    ctx.create_view(
        "big_orders",
        "SELECT id, customer, amount FROM orders WHERE amount > 100",
    )
    .await
    .unwrap();

    let result = query(&ctx, "SELECT customer FROM big_orders ORDER BY amount")
        .await
        .unwrap();
    assert_eq!(
        column(&result, 0),
        vec![Value::Text("alice".into()), Value::Text("dave".into())]
    );
}

#[tokio::test]
async fn test_view_is_a_snapshot() {
    let ctx = context();
    ctx.create_view("all_orders", "SELECT id FROM orders").await.unwrap();
    ctx.drop_table("orders").unwrap();

    let result = query(&ctx, "SELECT * FROM all_orders").await.unwrap();
    assert_eq!(result.row_count(), 5);
}

#[tokio::test]
async fn test_result_json() {
    let ctx = context();
    let result = query(&ctx, "SELECT id, customer FROM orders WHERE id = 1").await.unwrap();
    assert_eq!(
        result.to_json(),
        serde_json::json!([{"id": 1, "customer": "alice"}])
    );
}
