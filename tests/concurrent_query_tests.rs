/// Concurrency tests
///
/// Many outstanding queries, admission limits, result retention and
/// per-query timeouts on the local engine.
mod common;

use common::{orders, SlowSource};
use dfsql::{ContextConfig, LocalEngine, QueryEngine, SqlContext, SqlError, Value};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn context_with(config: ContextConfig) -> (SqlContext, Arc<LocalEngine>) {
    let engine = Arc::new(LocalEngine::new(&config));
    let ctx = SqlContext::with_engine(config, Arc::clone(&engine) as Arc<dyn QueryEngine>).unwrap();
    ctx.create_table("orders", orders()).unwrap();
    (ctx, engine)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_outstanding_queries() {
    let (ctx, engine) = context_with(ContextConfig::new().max_concurrent_queries(3));

    let sqls: Vec<String> = (1..=20)
        .map(|i| format!("SELECT id FROM orders WHERE id <= {} ORDER BY id", (i % 5) + 1))
        .collect();
    let submitted = join_all(sqls.iter().map(|sql| ctx.sql(sql))).await;
    let result_sets: Vec<_> = submitted.into_iter().map(Result::unwrap).collect();

    let tokens: HashSet<_> = result_sets.iter().map(|rs| rs.token()).collect();
    assert_eq!(tokens.len(), 20);

    let results = join_all(result_sets.iter().map(|rs| rs.get())).await;
    for (i, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        assert_eq!(result.row_count(), (i + 1) % 5 + 1);
        assert_eq!(result.rows[0], vec![Value::Integer(1)]);
    }

    assert_eq!(engine.in_flight().unwrap(), 0);
    assert_eq!(engine.retained().unwrap(), 20);
}

#[tokio::test]
async fn test_admission_limit_queues_queries() {
    let (ctx, engine) = context_with(ContextConfig::new().max_concurrent_queries(1));
    ctx.create_table("slow", SlowSource::new(Duration::from_millis(200))).unwrap();

    let first = ctx.sql("SELECT n FROM slow").await.unwrap();
    let second = ctx.sql("SELECT n FROM slow").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(first.status().await.unwrap().state, "running");
    assert_eq!(second.status().await.unwrap().state, "queued");
    assert_eq!(engine.in_flight().unwrap(), 2);

    assert_eq!(second.get().await.unwrap().row_count(), 3);
    assert_eq!(first.get().await.unwrap().row_count(), 3);

    let first_done = first.status().await.unwrap().finished_at.unwrap();
    let second_started = second.status().await.unwrap().started_at.unwrap();
    assert!(second_started >= first_done);
    assert_eq!(engine.in_flight().unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_queued_query() {
    let (ctx, _engine) = context_with(ContextConfig::new().max_concurrent_queries(1));
    ctx.create_table("slow", SlowSource::new(Duration::from_millis(150))).unwrap();

    let running = ctx.sql("SELECT n FROM slow").await.unwrap();
    let queued = ctx.sql("SELECT n FROM slow").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    queued.cancel().await.unwrap();
    assert_eq!(
        queued.get().await.unwrap_err(),
        SqlError::Cancelled(queued.token().id())
    );
    assert!(queued.status().await.unwrap().started_at.is_none());

    assert_eq!(running.get().await.unwrap().row_count(), 3);
}

#[tokio::test]
async fn test_engine_busy_when_no_slot_can_be_evicted() {
    let (ctx, engine) = context_with(ContextConfig::new().max_retained_results(2));
    ctx.create_table("slow", SlowSource::new(Duration::from_millis(200))).unwrap();

    let first = ctx.sql("SELECT n FROM slow").await.unwrap();
    let second = ctx.sql("SELECT n FROM slow").await.unwrap();

    let err = ctx.sql("SELECT id FROM orders").await.unwrap_err();
    assert!(matches!(err, SqlError::EngineBusy(_)));
    assert_eq!(engine.retained().unwrap(), 2);

    first.get().await.unwrap();
    second.get().await.unwrap();

    // A finished slot can now make room
    let third = ctx.sql("SELECT id FROM orders").await.unwrap();
    assert_eq!(third.get().await.unwrap().row_count(), 5);
    assert_eq!(engine.retained().unwrap(), 2);
}

#[tokio::test]
async fn test_least_recently_used_result_is_evicted() {
    let (ctx, _engine) = context_with(ContextConfig::new().max_retained_results(2));

    let first = ctx.sql("SELECT id FROM orders").await.unwrap();
    first.get().await.unwrap();
    let second = ctx.sql("SELECT id FROM orders").await.unwrap();
    second.get().await.unwrap();

    // Touching the first result makes the second the eviction candidate
    first.status().await.unwrap();
    let third = ctx.sql("SELECT id FROM orders").await.unwrap();
    third.get().await.unwrap();

    assert!(first.get().await.is_ok());
    assert_eq!(
        second.get().await.unwrap_err(),
        SqlError::UnknownToken(second.token().id())
    );
}

#[tokio::test]
async fn test_query_timeout_fails_the_query() {
    let (ctx, engine) = context_with(
        ContextConfig::new().query_timeout(Duration::from_millis(50)),
    );
    ctx.create_table("slow", SlowSource::new(Duration::from_millis(300))).unwrap();

    let result_set = ctx.sql("SELECT n FROM slow").await.unwrap();
    assert!(matches!(result_set.get().await, Err(SqlError::Timeout(_))));

    let status = result_set.status().await.unwrap();
    assert_eq!(status.state, "failed");
    assert!(status.error.unwrap().contains("exceeded 50 ms"));
    assert_eq!(engine.in_flight().unwrap(), 0);

    // Fast queries are unaffected
    let fast = ctx.sql("SELECT id FROM orders").await.unwrap();
    assert_eq!(fast.get().await.unwrap().row_count(), 5);
}

#[tokio::test]
async fn test_registry_changes_do_not_affect_submitted_queries() {
    let (ctx, _engine) = context_with(ContextConfig::new());
    ctx.create_table("slow", SlowSource::new(Duration::from_millis(100))).unwrap();

    let result_set = ctx.sql("SELECT n FROM slow").await.unwrap();
    ctx.drop_table("slow").unwrap();

    assert_eq!(result_set.get().await.unwrap().row_count(), 3);
    assert!(matches!(
        ctx.sql("SELECT n FROM slow").await,
        Err(SqlError::TableNotFound(_))
    ));
}
