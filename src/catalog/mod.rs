use crate::core::{ObjectKind, Result, SqlError};
use crate::datasource::{DataSource, MaterializedView};
use std::sync::Arc;

/// A table or view bound under a name
#[derive(Debug, Clone)]
pub enum Relation {
    Table(Arc<dyn DataSource>),
    View(Arc<MaterializedView>),
}

impl Relation {
    pub fn source(&self) -> Arc<dyn DataSource> {
        match self {
            Relation::Table(source) => source.clone(),
            Relation::View(view) => view.clone() as Arc<dyn DataSource>,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Relation::Table(_) => ObjectKind::Table,
            Relation::View(_) => ObjectKind::View,
        }
    }

    /// Human-readable owner description used in duplicate-name errors
    pub fn describe(&self) -> String {
        match self {
            Relation::Table(source) => format!("table backed by {}", source.kind()),
            Relation::View(view) => format!("view defined as '{}'", view.sql()),
        }
    }
}

/// One database: tables and views share a namespace and keep insertion order
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    relations: Arc<Vec<(String, Relation)>>,
}

impl Database {
    fn new(name: String) -> Self {
        Self {
            name,
            relations: Arc::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, relation)| relation)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.list(ObjectKind::Table)
    }

    pub fn list_views(&self) -> Vec<&str> {
        self.list(ObjectKind::View)
    }

    fn list(&self, kind: ObjectKind) -> Vec<&str> {
        self.relations
            .iter()
            .filter(|(_, relation)| relation.kind() == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn with_relation(&self, name: &str, relation: Relation) -> Result<Self> {
        validate_name(name)?;

        if let Some(existing) = self.get(name) {
            return Err(SqlError::DuplicateName {
                kind: relation.kind(),
                name: name.to_string(),
                existing: existing.describe(),
            });
        }

        let mut relations = (*self.relations).clone();
        relations.push((name.to_string(), relation));

        Ok(Self {
            name: self.name.clone(),
            relations: Arc::new(relations),
        })
    }

    fn without_relation(&self, name: &str, kind: ObjectKind) -> Result<Self> {
        let found = self
            .relations
            .iter()
            .any(|(n, relation)| n == name && relation.kind() == kind);

        if !found {
            return Err(match kind {
                ObjectKind::View => SqlError::ViewNotFound(name.to_string()),
                _ => SqlError::TableNotFound(name.to_string()),
            });
        }

        let relations = self
            .relations
            .iter()
            .filter(|(n, _)| n != name)
            .cloned()
            .collect();

        Ok(Self {
            name: self.name.clone(),
            relations: Arc::new(relations),
        })
    }
}

/// Registry of databases and their relations.
///
/// Immutable once built: every mutation returns a new catalog, so a snapshot
/// handed to a running query never changes underneath it. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    databases: Arc<Vec<Database>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(&self, name: &str) -> Result<&Database> {
        self.databases
            .iter()
            .find(|db| db.name == name)
            .ok_or_else(|| SqlError::DatabaseNotFound(name.to_string()))
    }

    pub fn database_exists(&self, name: &str) -> bool {
        self.database(name).is_ok()
    }

    pub fn list_databases(&self) -> Vec<&str> {
        self.databases.iter().map(|db| db.name.as_str()).collect()
    }

    pub fn with_database(&self, name: &str) -> Result<Self> {
        validate_name(name)?;

        if self.database_exists(name) {
            return Err(SqlError::DuplicateName {
                kind: ObjectKind::Database,
                name: name.to_string(),
                existing: "database".to_string(),
            });
        }

        let mut databases = (*self.databases).clone();
        databases.push(Database::new(name.to_string()));

        Ok(Self {
            databases: Arc::new(databases),
        })
    }

    /// Drop a database together with every relation bound in it.
    pub fn without_database(&self, name: &str) -> Result<Self> {
        self.database(name)?;

        let databases = self
            .databases
            .iter()
            .filter(|db| db.name != name)
            .cloned()
            .collect();

        Ok(Self {
            databases: Arc::new(databases),
        })
    }

    pub fn with_table(&self, database: &str, name: &str, source: Arc<dyn DataSource>) -> Result<Self> {
        self.replace_database(database, |db| db.with_relation(name, Relation::Table(source)))
    }

    pub fn without_table(&self, database: &str, name: &str) -> Result<Self> {
        self.replace_database(database, |db| db.without_relation(name, ObjectKind::Table))
    }

    pub fn with_view(&self, database: &str, name: &str, view: MaterializedView) -> Result<Self> {
        self.replace_database(database, |db| {
            db.with_relation(name, Relation::View(Arc::new(view)))
        })
    }

    pub fn without_view(&self, database: &str, name: &str) -> Result<Self> {
        self.replace_database(database, |db| db.without_relation(name, ObjectKind::View))
    }

    /// Look up a table or view
    pub fn resolve(&self, database: &str, name: &str) -> Result<&Relation> {
        self.database(database)?
            .get(name)
            .ok_or_else(|| SqlError::TableNotFound(name.to_string()))
    }

    fn replace_database<F>(&self, database: &str, update: F) -> Result<Self>
    where
        F: FnOnce(&Database) -> Result<Database>,
    {
        let idx = self
            .databases
            .iter()
            .position(|db| db.name == database)
            .ok_or_else(|| SqlError::DatabaseNotFound(database.to_string()))?;

        let updated = update(&self.databases[idx])?;
        let mut databases = (*self.databases).clone();
        databases[idx] = updated;

        Ok(Self {
            databases: Arc::new(databases),
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SqlError::InvalidName("name cannot be empty".into()));
    }
    if name.trim() != name {
        return Err(SqlError::InvalidName(format!(
            "'{}' has leading or trailing whitespace",
            name
        )));
    }
    Ok(())
}
