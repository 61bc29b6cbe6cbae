use crate::core::{Result, SqlError};
use crate::engine::{MetaToken, QueryEngine, QueryStatus};
use crate::result::QueryResult;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a submitted query.
///
/// Holds only the engine's token; the rows live in the engine until they are
/// fetched with [`get`](ResultSet::get) and the handle is released.
#[derive(Clone)]
pub struct ResultSet {
    token: MetaToken,
    sql: String,
    engine: Arc<dyn QueryEngine>,
    fetch_timeout: Option<Duration>,
}

impl ResultSet {
    pub(crate) fn new(
        token: MetaToken,
        sql: &str,
        engine: Arc<dyn QueryEngine>,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            token,
            sql: sql.to_string(),
            engine,
            fetch_timeout,
        }
    }

    pub fn token(&self) -> MetaToken {
        self.token
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn status(&self) -> Result<QueryStatus> {
        self.engine.status(self.token).await
    }

    /// Wait for the query and return its rows.
    /// Bounded by the context's `fetch_timeout` when one is set.
    pub async fn get(&self) -> Result<Arc<QueryResult>> {
        match self.fetch_timeout {
            Some(limit) => self.get_timeout(limit).await,
            None => self.engine.fetch(self.token).await,
        }
    }

    pub async fn get_timeout(&self, limit: Duration) -> Result<Arc<QueryResult>> {
        tokio::time::timeout(limit, self.engine.fetch(self.token))
            .await
            .map_err(|_| {
                SqlError::Timeout(format!(
                    "result {} not ready after {} ms",
                    self.token,
                    limit.as_millis()
                ))
            })?
    }

    pub async fn cancel(&self) -> Result<()> {
        self.engine.cancel(self.token).await
    }

    /// Free the engine's copy of the result; later fetches fail with `UnknownToken`
    pub async fn release(&self) -> Result<()> {
        self.engine.release(self.token).await
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("token", &self.token)
            .field("sql", &self.sql)
            .field("engine", &self.engine.name())
            .finish()
    }
}
