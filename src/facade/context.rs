use super::ResultSet;
use crate::catalog::Catalog;
use crate::config::ContextConfig;
use crate::core::{ObjectKind, Result, SqlError};
use crate::datasource::{DataSource, JsonSource, MaterializedView, MemoryFrame};
use crate::engine::{LocalEngine, QueryEngine, QueryRequest};
use crate::parser::SqlParserAdapter;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

struct Registry {
    catalog: Catalog,
    current_database: String,
}

/// Front-end of the query system: a registry of named tables grouped in
/// databases, and the entry point for submitting SQL over them.
///
/// Registry operations are synchronous. Queries are handed to a
/// [`QueryEngine`] and return a [`ResultSet`] right away; the result is
/// collected later through the handle.
pub struct SqlContext {
    config: ContextConfig,
    registry: RwLock<Registry>,
    engine: Arc<dyn QueryEngine>,
    parser: SqlParserAdapter,
}

impl SqlContext {
    /// Context with default settings and an in-process engine
    pub fn new() -> Self {
        let config = ContextConfig::default();
        let engine = Arc::new(LocalEngine::new(&config));
        Self::build(config, engine)
    }

    pub fn with_config(config: ContextConfig) -> Result<Self> {
        config.validate().map_err(SqlError::ConfigError)?;
        let engine = Arc::new(LocalEngine::new(&config));
        Ok(Self::build(config, engine))
    }

    /// Context submitting its queries to a caller-provided engine
    pub fn with_engine(config: ContextConfig, engine: Arc<dyn QueryEngine>) -> Result<Self> {
        config.validate().map_err(SqlError::ConfigError)?;
        Ok(Self::build(config, engine))
    }

    fn build(config: ContextConfig, engine: Arc<dyn QueryEngine>) -> Self {
        let current_database = config.default_database.clone();
        let catalog = Catalog::new()
            .with_database(&current_database)
            .unwrap_or_default();

        debug!(database = %current_database, engine = engine.name(), "context created");

        Self {
            config,
            registry: RwLock::new(Registry {
                catalog,
                current_database,
            }),
            engine,
            parser: SqlParserAdapter::new(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Consistent view of the registry, unaffected by later changes
    pub fn catalog(&self) -> Result<Catalog> {
        Ok(self.registry.read()?.catalog.clone())
    }

    // ------------------------------------------------------------------
    // Databases
    // ------------------------------------------------------------------

    pub fn create_database(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write()?;
        registry.catalog = registry.catalog.with_database(name)?;
        info!(database = name, "database created");
        Ok(())
    }

    /// Drop a database and everything registered in it.
    /// The current database cannot be dropped.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write()?;
        if registry.current_database == name {
            return Err(SqlError::ExecutionError(format!(
                "Cannot drop the current database '{}'",
                name
            )));
        }
        registry.catalog = registry.catalog.without_database(name)?;
        info!(database = name, "database dropped");
        Ok(())
    }

    pub fn use_database(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write()?;
        registry.catalog.database(name)?;
        registry.current_database = name.to_string();
        debug!(database = name, "switched database");
        Ok(())
    }

    pub fn current_database(&self) -> Result<String> {
        Ok(self.registry.read()?.current_database.clone())
    }

    pub fn list_databases(&self) -> Result<Vec<String>> {
        let registry = self.registry.read()?;
        Ok(registry
            .catalog
            .list_databases()
            .into_iter()
            .map(String::from)
            .collect())
    }

    // ------------------------------------------------------------------
    // Tables and views
    // ------------------------------------------------------------------

    /// Bind `source` under `name` in the current database.
    ///
    /// Fails with [`SqlError::DuplicateName`] when the name is already used
    /// by a table or view; the error describes what currently owns it.
    pub fn create_table(&self, name: &str, source: Arc<dyn DataSource>) -> Result<()> {
        let mut registry = self.registry.write()?;
        let kind = source.kind();
        registry.catalog = registry
            .catalog
            .with_table(&registry.current_database, name, source)?;
        info!(
            database = %registry.current_database,
            table = name,
            source = %kind,
            "table registered"
        );
        Ok(())
    }

    /// Register a JSON array file as a table
    pub fn register_json<P: AsRef<Path>>(&self, name: &str, path: P) -> Result<()> {
        let source = JsonSource::open(path)?;
        self.create_table(name, Arc::new(source))
    }

    /// Source registered under `name`, table or view
    pub fn table(&self, name: &str) -> Result<Arc<dyn DataSource>> {
        let registry = self.registry.read()?;
        Ok(registry
            .catalog
            .resolve(&registry.current_database, name)?
            .source())
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        let registry = self.registry.read()?;
        let database = registry.catalog.database(&registry.current_database)?;
        Ok(database.list_tables().into_iter().map(String::from).collect())
    }

    pub fn list_views(&self) -> Result<Vec<String>> {
        let registry = self.registry.read()?;
        let database = registry.catalog.database(&registry.current_database)?;
        Ok(database.list_views().into_iter().map(String::from).collect())
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write()?;
        registry.catalog = registry
            .catalog
            .without_table(&registry.current_database, name)?;
        info!(database = %registry.current_database, table = name, "table dropped");
        Ok(())
    }

    /// Run `sql` and keep its result under `name`.
    ///
    /// The view is a snapshot: later changes to the tables it read from are
    /// not reflected.
    pub async fn create_view(&self, name: &str, sql: &str) -> Result<()> {
        {
            let registry = self.registry.read()?;
            let database = registry.catalog.database(&registry.current_database)?;
            if let Some(existing) = database.get(name) {
                return Err(SqlError::DuplicateName {
                    kind: ObjectKind::View,
                    name: name.to_string(),
                    existing: existing.describe(),
                });
            }
        }

        let result_set = self.sql(sql).await?;
        let outcome = result_set.get().await;
        if let Err(e) = result_set.release().await {
            warn!(token = %result_set.token(), error = %e, "failed to release view query");
        }
        let result = outcome?;
        let frame = MemoryFrame::from_result(&result)?;

        let mut registry = self.registry.write()?;
        registry.catalog = registry.catalog.with_view(
            &registry.current_database,
            name,
            MaterializedView::new(sql, frame),
        )?;
        info!(database = %registry.current_database, view = name, "view created");
        Ok(())
    }

    pub fn drop_view(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write()?;
        registry.catalog = registry
            .catalog
            .without_view(&registry.current_database, name)?;
        info!(database = %registry.current_database, view = name, "view dropped");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Submit `sql` over the named tables of the current database.
    ///
    /// Only the listed tables are passed to the engine. Repeated names are
    /// bound once. Returns as soon as the engine accepted the query.
    pub async fn run_query(&self, sql: &str, table_names: &[&str]) -> Result<ResultSet> {
        let request = {
            let registry = self.registry.read()?;
            let mut request = QueryRequest::new(sql);
            for name in table_names {
                let relation = registry.catalog.resolve(&registry.current_database, name)?;
                request = request.with_table(*name, relation.source());
            }
            request
        };

        let token = self.engine.submit(request).await?;
        debug!(%token, sql, tables = ?table_names, "query submitted");

        Ok(ResultSet::new(
            token,
            sql,
            Arc::clone(&self.engine),
            self.config.fetch_timeout,
        ))
    }

    /// Submit `sql` over the tables it names in FROM
    pub async fn sql(&self, sql: &str) -> Result<ResultSet> {
        let statement = self.parser.parse(sql)?;
        let tables = statement.referenced_tables();
        self.run_query(sql, &tables).await
    }
}

impl Default for SqlContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Schema, Value};

    fn frame(values: &[i64]) -> Arc<dyn DataSource> {
        let schema = Schema::new(vec![Column::new("v", DataType::Integer)]);
        let rows = values.iter().map(|v| vec![Value::Integer(*v)]).collect();
        Arc::new(MemoryFrame::new(schema, rows).unwrap())
    }

    #[test]
    fn test_starts_in_default_database() {
        let ctx = SqlContext::new();
        assert_eq!(ctx.current_database().unwrap(), "main");
        assert_eq!(ctx.list_databases().unwrap(), vec!["main"]);
        assert!(ctx.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_create_table_then_duplicate() {
        let ctx = SqlContext::new();
        ctx.create_table("t", frame(&[1])).unwrap();

        let err = ctx.create_table("t", frame(&[2])).unwrap_err();
        assert!(matches!(
            err,
            SqlError::DuplicateName { kind: ObjectKind::Table, ref name, .. } if name == "t"
        ));
        // The original binding is untouched
        assert_eq!(ctx.table("t").unwrap().row_count(), Some(1));
    }

    #[test]
    fn test_drop_current_database_is_rejected() {
        let ctx = SqlContext::new();
        let err = ctx.drop_database("main").unwrap_err();
        assert!(matches!(err, SqlError::ExecutionError(_)));
    }

    #[test]
    fn test_tables_are_scoped_by_database() {
        let ctx = SqlContext::new();
        ctx.create_table("t", frame(&[1])).unwrap();
        ctx.create_database("other").unwrap();
        ctx.use_database("other").unwrap();

        assert!(ctx.list_tables().unwrap().is_empty());
        ctx.create_table("t", frame(&[2])).unwrap();

        ctx.use_database("main").unwrap();
        ctx.drop_database("other").unwrap();
        assert_eq!(ctx.list_databases().unwrap(), vec!["main"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = SqlContext::with_config(ContextConfig::new().max_concurrent_queries(0));
        assert!(matches!(result, Err(SqlError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_create_view_materializes() {
        let ctx = SqlContext::new();
        ctx.create_table("t", frame(&[1, 2, 3])).unwrap();
        ctx.create_view("big", "SELECT v FROM t WHERE v > 1").await.unwrap();

        assert_eq!(ctx.list_views().unwrap(), vec!["big"]);
        assert_eq!(ctx.table("big").unwrap().row_count(), Some(2));

        let err = ctx.create_view("t", "SELECT v FROM t").await.unwrap_err();
        assert!(matches!(err, SqlError::DuplicateName { kind: ObjectKind::View, .. }));
    }
}
