use super::{MetaToken, QueryEngine, QueryRequest, QueryState, QueryStatus, TableBinding};
use crate::config::ContextConfig;
use crate::core::{Result, SqlError};
use crate::executor::{ExecutionContext, ExecutorPipeline};
use crate::parser::SqlParserAdapter;
use crate::parser::ast::Statement;
use crate::result::QueryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Lifecycle of one query as seen through its watch channel
#[derive(Debug, Clone)]
struct Progress {
    state: QueryState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Move to `next` unless the query already reached a terminal state.
/// Returns whether the transition happened.
fn transition(progress: &watch::Sender<Progress>, next: QueryState) -> bool {
    progress.send_if_modified(|current| {
        if current.state.is_terminal() {
            return false;
        }
        let now = Utc::now();
        match next {
            QueryState::Running => current.started_at = Some(now),
            ref state if state.is_terminal() => current.finished_at = Some(now),
            _ => {}
        }
        current.state = next;
        true
    })
}

struct Slot {
    sql: String,
    submitted_at: DateTime<Utc>,
    progress: Arc<watch::Sender<Progress>>,
    task: Option<AbortHandle>,
}

impl Slot {
    fn is_terminal(&self) -> bool {
        self.progress.borrow().state.is_terminal()
    }

    fn status(&self, token: MetaToken) -> QueryStatus {
        let progress = self.progress.borrow();
        let (row_count, error) = match &progress.state {
            QueryState::Finished(result) => (Some(result.row_count()), None),
            QueryState::Failed(e) => (None, Some(e.to_string())),
            _ => (None, None),
        };
        QueryStatus {
            token,
            sql: self.sql.clone(),
            state: progress.state.name(),
            submitted_at: self.submitted_at,
            started_at: progress.started_at,
            finished_at: progress.finished_at,
            row_count,
            error,
        }
    }
}

/// In-process engine running each query on its own tokio task.
///
/// At most `max_concurrent_queries` queries execute at once; the rest wait
/// for a permit in `Queued` state. Results stay addressable by token until
/// released or evicted. Eviction only ever removes queries that have reached
/// a terminal state, least recently used first.
pub struct LocalEngine {
    parser: SqlParserAdapter,
    pipeline: Arc<ExecutorPipeline>,
    slots: Mutex<LruCache<MetaToken, Slot>>,
    next_token: AtomicU64,
    permits: Arc<Semaphore>,
    query_timeout: Option<Duration>,
}

impl LocalEngine {
    pub fn new(config: &ContextConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_retained_results).unwrap_or(NonZeroUsize::MIN);
        let pipeline = ExecutorPipeline::with_default_executors();
        debug!(
            executors = ?pipeline.executor_names(),
            max_concurrent = config.max_concurrent_queries,
            retained = config.max_retained_results,
            "local engine ready"
        );
        Self {
            parser: SqlParserAdapter::new(),
            pipeline: Arc::new(pipeline),
            slots: Mutex::new(LruCache::new(capacity)),
            next_token: AtomicU64::new(1),
            permits: Arc::new(Semaphore::new(config.max_concurrent_queries.max(1))),
            query_timeout: config.query_timeout,
        }
    }

    /// Number of queries not yet in a terminal state
    pub fn in_flight(&self) -> Result<usize> {
        let slots = self.slots.lock()?;
        Ok(slots.iter().filter(|(_, slot)| !slot.is_terminal()).count())
    }

    /// Number of queries the engine currently holds
    pub fn retained(&self) -> Result<usize> {
        Ok(self.slots.lock()?.len())
    }

    /// Reject requests that reference tables outside their subset before queuing
    fn check_tables(statement: &Statement, request: &QueryRequest) -> Result<()> {
        for table in statement.referenced_tables() {
            if !request.tables.iter().any(|binding| binding.name == table) {
                return Err(SqlError::TableNotFound(table.to_string()));
            }
        }
        Ok(())
    }

    fn make_room(slots: &mut LruCache<MetaToken, Slot>) -> Result<()> {
        if slots.len() < slots.cap().get() {
            return Ok(());
        }

        let victim = slots
            .iter()
            .rev()
            .find(|(_, slot)| slot.is_terminal())
            .map(|(token, _)| *token);

        match victim {
            Some(token) => {
                slots.pop(&token);
                debug!(%token, "evicted finished query");
                Ok(())
            }
            None => Err(SqlError::EngineBusy(format!(
                "all {} result slots hold running queries",
                slots.cap()
            ))),
        }
    }

    fn subscribe(&self, token: MetaToken) -> Result<watch::Receiver<Progress>> {
        let mut slots = self.slots.lock()?;
        let slot = slots.get(&token).ok_or(SqlError::UnknownToken(token.id()))?;
        Ok(slot.progress.subscribe())
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

struct QueryTask {
    token: MetaToken,
    statement: Statement,
    tables: Vec<TableBinding>,
    pipeline: Arc<ExecutorPipeline>,
    permits: Arc<Semaphore>,
    progress: Arc<watch::Sender<Progress>>,
    timeout: Option<Duration>,
}

impl QueryTask {
    async fn run(self) {
        let Ok(_permit) = Arc::clone(&self.permits).acquire_owned().await else {
            transition(
                &self.progress,
                QueryState::Failed(SqlError::ExecutionError("engine is shut down".into())),
            );
            return;
        };

        // Cancelled while waiting for a permit
        if !transition(&self.progress, QueryState::Running) {
            return;
        }
        debug!(token = %self.token, "query started");

        let ctx = ExecutionContext::new(&self.tables);
        let work = self.pipeline.execute(&self.statement, &ctx);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SqlError::Timeout(format!(
                    "query {} exceeded {} ms",
                    self.token,
                    limit.as_millis()
                ))),
            },
            None => work.await,
        };

        let next = match outcome {
            Ok(result) => {
                debug!(token = %self.token, rows = result.row_count(), "query finished");
                QueryState::Finished(Arc::new(result))
            }
            Err(e) => {
                warn!(token = %self.token, error = %e, "query failed");
                QueryState::Failed(e)
            }
        };
        transition(&self.progress, next);
    }
}

#[async_trait]
impl QueryEngine for LocalEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn submit(&self, request: QueryRequest) -> Result<MetaToken> {
        let statement = self.parser.parse(&request.sql)?;
        Self::check_tables(&statement, &request)?;

        let token = MetaToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (sender, _) = watch::channel(Progress {
            state: QueryState::Queued,
            started_at: None,
            finished_at: None,
        });
        let progress = Arc::new(sender);

        {
            let mut slots = self.slots.lock()?;
            Self::make_room(&mut slots)?;
            slots.put(
                token,
                Slot {
                    sql: request.sql.clone(),
                    submitted_at: Utc::now(),
                    progress: Arc::clone(&progress),
                    task: None,
                },
            );
        }

        let task = QueryTask {
            token,
            statement,
            tables: request.tables,
            pipeline: Arc::clone(&self.pipeline),
            permits: Arc::clone(&self.permits),
            progress,
            timeout: self.query_timeout,
        };
        let handle = tokio::spawn(task.run());

        if let Some(slot) = self.slots.lock()?.peek_mut(&token) {
            slot.task = Some(handle.abort_handle());
        }

        debug!(%token, sql = %request.sql, "query submitted");
        Ok(token)
    }

    async fn status(&self, token: MetaToken) -> Result<QueryStatus> {
        let mut slots = self.slots.lock()?;
        let slot = slots.get(&token).ok_or(SqlError::UnknownToken(token.id()))?;
        Ok(slot.status(token))
    }

    async fn fetch(&self, token: MetaToken) -> Result<Arc<QueryResult>> {
        let mut progress = self.subscribe(token)?;
        debug!(%token, "waiting for result");

        // The sender goes away when the slot is released or evicted mid-wait
        let state = progress
            .wait_for(|p| p.state.is_terminal())
            .await
            .map_err(|_| SqlError::UnknownToken(token.id()))?
            .state
            .clone();

        match state {
            QueryState::Finished(result) => Ok(result),
            QueryState::Failed(e) => Err(e),
            QueryState::Cancelled => Err(SqlError::Cancelled(token.id())),
            other => Err(SqlError::ExecutionError(format!(
                "query {} ended in non-terminal state {}",
                token,
                other.name()
            ))),
        }
    }

    async fn cancel(&self, token: MetaToken) -> Result<()> {
        let mut slots = self.slots.lock()?;
        let slot = slots.get(&token).ok_or(SqlError::UnknownToken(token.id()))?;

        if transition(&slot.progress, QueryState::Cancelled) {
            if let Some(task) = &slot.task {
                task.abort();
            }
            debug!(%token, "query cancelled");
        }
        Ok(())
    }

    async fn release(&self, token: MetaToken) -> Result<()> {
        let slot = self
            .slots
            .lock()?
            .pop(&token)
            .ok_or(SqlError::UnknownToken(token.id()))?;

        if transition(&slot.progress, QueryState::Cancelled) {
            if let Some(task) = &slot.task {
                task.abort();
            }
        }
        debug!(%token, "query released");
        Ok(())
    }
}
