use std::time::Duration;

/// Settings for a [`SqlContext`](crate::facade::SqlContext) and its local engine
#[derive(Debug, Clone, PartialEq)]
pub struct ContextConfig {
    /// Database created on startup and selected as current
    pub default_database: String,

    /// Queries allowed to execute at the same time
    pub max_concurrent_queries: usize,

    /// Upper bound on a single query's execution, measured from when it starts running
    pub query_timeout: Option<Duration>,

    /// Upper bound on how long `ResultSet::get` waits for completion
    pub fetch_timeout: Option<Duration>,

    /// Result slots the engine keeps before evicting finished ones
    pub max_retained_results: usize,
}

impl ContextConfig {
    pub fn new() -> Self {
        Self {
            default_database: "main".to_string(),
            max_concurrent_queries: 4,
            query_timeout: None,
            fetch_timeout: None,
            max_retained_results: 64,
        }
    }

    /// Set the default database name
    pub fn default_database(mut self, database: &str) -> Self {
        self.default_database = database.to_string();
        self
    }

    pub fn max_concurrent_queries(mut self, max: usize) -> Self {
        self.max_concurrent_queries = max;
        self
    }

    /// Set query timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn max_retained_results(mut self, max: usize) -> Self {
        self.max_retained_results = max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_database.trim().is_empty() {
            return Err("default_database cannot be empty".to_string());
        }

        if self.default_database.trim() != self.default_database {
            return Err("default_database cannot have surrounding whitespace".to_string());
        }

        if self.max_concurrent_queries == 0 {
            return Err("max_concurrent_queries must be > 0".to_string());
        }

        if self.max_retained_results == 0 {
            return Err("max_retained_results must be > 0".to_string());
        }

        if self.query_timeout == Some(Duration::ZERO) {
            return Err("query_timeout must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}
